//! A small RPC substrate: typed services generated by [`service!`], an
//! in-process [`Network`] with fault injection, and a Unix-socket transport.

use std::time::Duration;

pub mod client;
mod macros;
pub mod network;
pub mod server;
pub mod unix;

#[cfg(test)]
mod echo;

pub use anyhow;
pub use async_trait::async_trait;
pub use futures;
pub use log;
pub use serde;
pub use serde_json;
pub use tokio;

pub use client::Channel;
pub use network::Network;

/// Upper bound on a single call, from dial to reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
