#[macro_export]
macro_rules! service {
    () => {
        compile_error!("empty service is not allowed");
    };
    (
        $(#[$service_attr:meta])*
        service $svc_name:ident {
            $(
                $(#[$method_attr:meta])*
                fn $method_name:ident($($arg_id:ident: $arg_ty:ty),*) -> $output:ty;
            )*
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$service_attr])*
        pub mod $svc_name {
            use super::*;

            use std::time::Duration;

            use $crate::client::{self, Channel};
            use $crate::network::NetworkPackage;
            use $crate::server;

            use $crate::tokio::sync::mpsc::{self, Sender, Receiver};
            use $crate::serde_json;
            use $crate::serde::{Serialize, Deserialize};
            use $crate::anyhow::{Result, anyhow};
            use $crate::async_trait;
            use $crate::log::{error, trace};


            #[derive(Debug, Deserialize, Serialize)]
            pub enum Request {
                $(
                    #[allow(non_camel_case_types)]
                    $method_name {  $($arg_id : $arg_ty),* }
                ),*
            }

            impl Request {
                /// Fully qualified procedure name, e.g. `lock_svc.lock`.
                pub fn procedure(&self) -> &'static str {
                    match self {
                        $(
                            Request::$method_name { .. } => {
                                concat!(stringify!($svc_name), ".", stringify!($method_name))
                            }
                        )*
                    }
                }
            }

            pub mod response {
                use super::*;
                $(
                    #[derive(Deserialize, Serialize)]
                    #[allow(non_camel_case_types)]
                    pub struct $method_name {
                        pub data: $output
                    }
                )*
            }

            #[async_trait]
            pub trait Service: Send + 'static {
                $(
                    $(#[$method_attr])*
                    async fn $method_name(&mut self, $($arg_id : $arg_ty),* ) -> Result<$output>;
                )*
            }

            #[derive(Debug, Clone)]
            pub struct Client {
                channel: Channel,
                timeout: Duration,
            }

            impl Client {

                $(
                    pub async fn $method_name(&self, $($arg_id : $arg_ty),* ) -> Result<$output> {
                        let req = Request::$method_name {
                            $($arg_id),*
                        };
                        let resp = self.call(serde_json::to_string(&req)?).await?;
                        let resp: response::$method_name = serde_json::from_str(&resp)?;
                        Ok(resp.data)
                    }
                )*

                pub async fn call(&self, req: String) -> Result<String> {
                    client::call(&self.channel, req, self.timeout).await
                }

                pub fn endpoint(&self) -> String {
                    self.channel.to_string()
                }
            }

            impl client::Client for Client {
                fn from_channel(channel: Channel, timeout: Duration) -> Self {
                    Self { channel, timeout }
                }
            }

            #[derive(Debug)]
            pub struct Server<T: Service + Send> {
                svc: T,
                tx: Sender<NetworkPackage>,
                rx: Receiver<NetworkPackage>,
            }

            impl<T: Service + Send> Server<T> {
                async fn dispatch(&mut self, data: &str) -> Result<String> {
                    let req: Request = serde_json::from_str(data)?;
                    trace!("dispatch {}", req.procedure());
                    match req {
                        $(
                            Request::$method_name { $($arg_id),* } => {
                                let data = self.svc.$method_name($($arg_id),* ).await?;
                                let resp = response::$method_name {
                                    data
                                };
                                Ok(serde_json::to_string(&resp)?)
                            }
                        )*
                    }
                }
            }

            #[async_trait]
            impl<T: Service + Send> server::Server for Server<T> {
                type Service = T;

                fn from_service(svc: Self::Service) -> Self {
                    let (tx, rx) = mpsc::channel(100);
                    Self {svc, tx, rx}
                }

                fn client_chan(&self) -> Sender<NetworkPackage> {
                    self.tx.clone()
                }

                async fn handle(&mut self) -> Result<()> {
                    match self.rx.recv().await {
                        Some(NetworkPackage{to, reply, data}) => {
                            trace!("{} handle recv: {}", &to, &data);
                            match self.dispatch(&data).await {
                                Ok(resp) => {
                                    trace!("{} handle send: {}", &to, &resp);
                                    if reply.send(resp).await.is_err() {
                                        trace!("{}: caller went away", &to);
                                    }
                                }
                                // Dropping `reply` tells the caller nothing is coming.
                                Err(e) => error!("{} failed to serve request: {}", &to, e),
                            }
                            Ok(())
                        }
                        None => {Err(anyhow!("expected sender"))}
                    }
                }
            }
        }
    };
}
