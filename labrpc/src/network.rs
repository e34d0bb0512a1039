use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures::Future;
use log::{debug, info, warn};
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::{
    client::{Channel, Client},
    server::Server,
    DEFAULT_TIMEOUT,
};

#[derive(Debug)]
pub struct NetworkPackage {
    pub to: String,
    pub reply: Sender<String>,
    pub data: String,
}

/// Faults currently applied to the link of one node.
#[derive(Debug, Clone, Default)]
struct Link {
    disconnected: bool,
    drop_replies: bool,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Node {
    chan: Option<Sender<NetworkPackage>>,
    link: Link,
    routed: u64,
}

type Nodes = Arc<Mutex<HashMap<String, Node>>>;

/// Simulated network routing packages between in-process servers.
pub struct Network {
    tx: Sender<NetworkPackage>,
    rx: Receiver<NetworkPackage>,
    nodes: Nodes,
    timeout: Duration,
}

/// Cloneable control surface of a [`Network`], usable after `run` took it.
#[derive(Debug, Clone)]
pub struct Handle {
    tx: Sender<NetworkPackage>,
    nodes: Nodes,
    timeout: Duration,
}

fn lock(nodes: &Nodes) -> MutexGuard<'_, HashMap<String, Node>> {
    nodes.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Network {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// A network whose clients give up on a call after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            tx,
            rx,
            nodes: Arc::new(Mutex::new(HashMap::default())),
            timeout,
        }
    }

    pub fn handle(&self) -> Handle {
        Handle {
            tx: self.tx.clone(),
            nodes: self.nodes.clone(),
            timeout: self.timeout,
        }
    }

    /// Attach `svc` as node `id`. The node is routable as soon as this
    /// returns; the returned routine must be spawned for it to answer.
    pub fn register_service<S, C>(
        &self,
        id: impl Into<String>,
        svc: S::Service,
    ) -> (C, impl Future<Output = ()>)
    where
        S: Server + 'static,
        C: Client,
    {
        let id = id.into();
        let mut server = S::from_service(svc);
        lock(&self.nodes).entry(id.clone()).or_default().chan = Some(server.client_chan());
        let client = self.handle().client(id.clone());
        (client, async move {
            if let Err(e) = server.run().await {
                info!("server {} stopped: {}", id, e);
            }
        })
    }

    pub async fn run(&mut self) {
        while let Some(p) = self.rx.recv().await {
            self.route(p);
        }
    }

    fn route(&self, p: NetworkPackage) {
        let (chan, link) = {
            let mut nodes = lock(&self.nodes);
            match nodes.get_mut(&p.to) {
                Some(Node {
                    chan: Some(chan),
                    link,
                    routed,
                }) if !link.disconnected => {
                    *routed += 1;
                    (chan.clone(), link.clone())
                }
                Some(_) => {
                    debug!("{} unreachable, dropped", p.to);
                    return;
                }
                None => {
                    warn!("node {} not found", p.to);
                    return;
                }
            }
        };

        tokio::spawn(async move {
            let NetworkPackage { to, reply, data } = p;
            if let Some(delay) = link.delay {
                tokio::time::sleep(delay).await;
            }
            let (tx, mut rx) = mpsc::channel(1);
            let p = NetworkPackage {
                to: to.clone(),
                reply: tx,
                data,
            };
            if chan.send(p).await.is_err() {
                warn!("send to node {} failed, dropped", to);
                return;
            }
            if let Some(resp) = rx.recv().await {
                if link.drop_replies {
                    debug!("reply from {} dropped", to);
                } else if reply.send(resp).await.is_err() {
                    debug!("caller of {} went away", to);
                }
            }
        });
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Handle {
    /// A client for node `id`. Nothing is dialed until a call is made.
    pub fn client<C: Client>(&self, id: impl Into<String>) -> C {
        C::from_channel(
            Channel::Network {
                to: id.into(),
                tx: self.tx.clone(),
            },
            self.timeout,
        )
    }

    /// Drop every package addressed to `id` until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self, id: &str) {
        self.update(id, |l| l.disconnected = true);
    }

    pub fn reconnect(&self, id: &str) {
        self.update(id, |l| l.disconnected = false);
    }

    /// Let `id` process requests but throw its replies away.
    pub fn set_drop_replies(&self, id: &str, drop: bool) {
        self.update(id, |l| l.drop_replies = drop);
    }

    /// Hold each package for `id` for `delay` before handing it over.
    pub fn set_delay(&self, id: &str, delay: Option<Duration>) {
        self.update(id, |l| l.delay = delay);
    }

    /// Packages routed to `id` so far, counting those whose reply was dropped.
    pub fn rpc_count(&self, id: &str) -> u64 {
        lock(&self.nodes).get(id).map_or(0, |n| n.routed)
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut Link)) {
        f(&mut lock(&self.nodes).entry(id.to_owned()).or_default().link);
    }
}
