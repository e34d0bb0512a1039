use crate::network::NetworkPackage;
use anyhow::Result;
use tokio::sync::mpsc::Sender;

#[async_trait::async_trait]
pub trait Server: Send {
    type Service;
    fn from_service(svc: Self::Service) -> Self;
    /// Sender feeding this server's request loop.
    fn client_chan(&self) -> Sender<NetworkPackage>;
    /// Serve one request. Only fails once the request channel is gone.
    async fn handle(&mut self) -> Result<()>;
    async fn run(&mut self) -> Result<()> {
        loop {
            self.handle().await?;
        }
    }
}
