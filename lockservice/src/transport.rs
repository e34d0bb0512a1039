use std::path::PathBuf;

use labrpc::{
    client::{Channel, Client},
    network::Handle,
    DEFAULT_TIMEOUT,
};
use log::debug;

use crate::{LockArgs, LockReply, LockRpcClient, Op};

/// Delivers one request to one endpoint.
///
/// `None` means nothing came back in time, whatever the reason: refused
/// dial, dropped connection, timeout or a server-side failure. An
/// implementation opens whatever connection it needs per call and never
/// retries.
#[labrpc::async_trait]
pub trait Transport: Send + Sync {
    /// Send `args` to `endpoint` as procedure `op` and wait for the reply.
    async fn send(&self, endpoint: &str, op: Op, args: &LockArgs) -> Option<LockReply>;
}

/// Transport over an in-process [`labrpc::Network`].
#[derive(Debug, Clone)]
pub struct NetTransport {
    net: Handle,
}

impl NetTransport {
    /// Send through the network behind `net`.
    pub fn new(net: Handle) -> Self {
        Self { net }
    }
}

#[labrpc::async_trait]
impl Transport for NetTransport {
    async fn send(&self, endpoint: &str, op: Op, args: &LockArgs) -> Option<LockReply> {
        deliver(&self.net.client::<LockRpcClient>(endpoint), op, args).await
    }
}

/// Transport over Unix sockets; endpoints are socket paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixTransport;

#[labrpc::async_trait]
impl Transport for UnixTransport {
    async fn send(&self, endpoint: &str, op: Op, args: &LockArgs) -> Option<LockReply> {
        let c = LockRpcClient::from_channel(Channel::Unix(PathBuf::from(endpoint)), DEFAULT_TIMEOUT);
        deliver(&c, op, args).await
    }
}

async fn deliver(c: &LockRpcClient, op: Op, args: &LockArgs) -> Option<LockReply> {
    let resp = match op {
        Op::Lock => c.lock(args.clone()).await,
        Op::Unlock => c.unlock(args.clone()).await,
    };
    match resp {
        Ok(reply) => Some(reply),
        Err(e) => {
            debug!("{} #{} to {}: {}", op, args.req_id, c.endpoint(), e);
            None
        }
    }
}
