use std::{fmt, path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use log::trace;
use tokio::sync::mpsc::{self, Sender};

use crate::network::NetworkPackage;

/// Where a call is delivered.
#[derive(Debug, Clone)]
pub enum Channel {
    /// A node on an in-process [`Network`](crate::Network).
    Network {
        to: String,
        tx: Sender<NetworkPackage>,
    },
    /// A server listening on a Unix socket.
    Unix(PathBuf),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Network { to, .. } => write!(f, "{}", to),
            Channel::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

pub trait Client {
    fn from_channel(channel: Channel, timeout: Duration) -> Self;
}

/// Deliver one request and wait for its reply, giving up after `timeout`.
///
/// There is no retry here. Whatever connection the call opened is dropped
/// before this returns, on every path.
pub async fn call(channel: &Channel, req: String, timeout: Duration) -> Result<String> {
    match tokio::time::timeout(timeout, deliver(channel, &req)).await {
        Ok(resp) => {
            let resp = resp?;
            trace!("{} req: {}, resp: {}", channel, req, &resp);
            Ok(resp)
        }
        Err(_) => Err(anyhow!("call to {} timed out after {:?}", channel, timeout)),
    }
}

async fn deliver(channel: &Channel, req: &str) -> Result<String> {
    match channel {
        Channel::Network { to, tx } => {
            let (reply, mut rx) = mpsc::channel(1);
            tx.send(NetworkPackage {
                to: to.clone(),
                reply,
                data: req.to_owned(),
            })
            .await?;
            rx.recv()
                .await
                .ok_or_else(|| anyhow!("unable to receive from {}", to))
        }
        Channel::Unix(path) => crate::unix::call(path, req).await,
    }
}
