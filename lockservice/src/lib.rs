#![deny(missing_docs)]
#![deny(clippy::all)]
//! Client of a primary/backup lock service.
//!
//! A [`LockClient`] numbers every logical operation with its own random id
//! and a strictly increasing request number, then tries the primary and,
//! failing that, the backup with the very same request. Servers deduplicate
//! on `(client_id, req_id)`, so a request that reached the primary before its
//! reply was lost is not applied a second time by the backup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arguments of both `lock` and `unlock`.
///
/// Built once per logical operation and resent unchanged on failover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockArgs {
    /// Random id of the issuing client.
    pub client_id: i64,
    /// Per-client request number, unique per logical operation.
    pub req_id: i64,
    /// Name of the lock.
    pub lockname: String,
}

/// Reply of both `lock` and `unlock`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockReply {
    /// Lock: granted. Unlock: was held and is now released.
    pub ok: bool,
}

/// Kind of a logical operation, i.e. which procedure carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// Acquire a lock.
    Lock,
    /// Release a lock.
    Unlock,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Lock => f.write_str("lock"),
            Op::Unlock => f.write_str("unlock"),
        }
    }
}

labrpc::service! {
    service lock_svc {
        fn lock(args: LockArgs) -> LockReply;
        fn unlock(args: LockArgs) -> LockReply;
    }
}

pub use lock_svc::{
    Client as LockRpcClient, Server as LockRpcServer, Service as LockService,
};

/// Lock service client with primary/backup failover.
pub mod client;
mod error;
/// Reference lock server.
pub mod server;
/// How requests reach a server.
pub mod transport;


pub use client::LockClient;
pub use error::{Error, Result};
pub use server::{LockServer, LockTable};
pub use transport::{NetTransport, Transport, UnixTransport};
