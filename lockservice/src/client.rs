use log::{debug, warn};
use rand::{rngs::OsRng, Rng};

use crate::{Error, LockArgs, Op, Result, Transport, UnixTransport};

/// Ids are drawn from `[0, 2^62)`.
const ID_BITS: u32 = 62;

/// Random id with negligible chance of colliding with any other live client.
fn nrand() -> i64 {
    OsRng.gen_range(0..1i64 << ID_BITS)
}

/// Client of a primary/backup lock service pair.
///
/// Every `lock`/`unlock` takes a fresh request number and sends the same
/// request to the primary and, only if that went unanswered, to the backup.
/// Operations take `&mut self`: numbering one request and sending it is a
/// single step that must not interleave with another.
#[derive(Debug)]
pub struct LockClient<T = UnixTransport> {
    id: i64,
    // Primary first, backup second.
    servers: [String; 2],
    req_id: i64,
    transport: T,
}

impl LockClient<UnixTransport> {
    /// Client of the servers listening on Unix sockets `primary` and `backup`.
    ///
    /// Nothing is dialed here; unreachable servers only show up as
    /// [`Error::Unavailable`] from later operations.
    pub fn new(primary: impl Into<String>, backup: impl Into<String>) -> Self {
        Self::with_transport(primary, backup, UnixTransport)
    }
}

impl<T: Transport> LockClient<T> {
    /// Client reaching `primary` and `backup` through `transport`.
    pub fn with_transport(
        primary: impl Into<String>,
        backup: impl Into<String>,
        transport: T,
    ) -> Self {
        Self {
            id: nrand(),
            servers: [primary.into(), backup.into()],
            req_id: 0,
            transport,
        }
    }

    /// Random id this client tags its requests with.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Ask for lock `name`. `Ok(true)` if it was granted, `Ok(false)` if the
    /// service says it is held.
    pub async fn lock(&mut self, name: &str) -> Result<bool> {
        self.call(Op::Lock, name).await
    }

    /// Release lock `name`. `Ok(true)` if it was held, `Ok(false)` otherwise.
    pub async fn unlock(&mut self, name: &str) -> Result<bool> {
        self.call(Op::Unlock, name).await
    }

    async fn call(&mut self, op: Op, lockname: &str) -> Result<bool> {
        self.req_id += 1;
        let args = LockArgs {
            client_id: self.id,
            req_id: self.req_id,
            lockname: lockname.to_owned(),
        };

        for server in self.servers.iter() {
            if let Some(reply) = self.transport.send(server, op, &args).await {
                debug!(
                    "{} {:?} #{} answered by {}: {}",
                    op, lockname, args.req_id, server, reply.ok
                );
                return Ok(reply.ok);
            }
            warn!("{} {:?} #{} not delivered to {}", op, lockname, args.req_id, server);
        }

        Err(Error::Unavailable {
            op,
            lockname: args.lockname,
            req_id: args.req_id,
        })
    }
}
