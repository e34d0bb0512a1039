use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use labrpc::anyhow::Result;
use log::{debug, warn};

use crate::{LockArgs, LockReply, LockRpcClient, LockService, Op};

/// Lock state of one server plus the last reply given to each client.
///
/// A client has at most one operation outstanding, so only its latest
/// request can still be waiting for an answer.
#[derive(Debug, Default)]
pub struct LockTable {
    held: HashSet<String>,
    // client_id -> (req_id, ok)
    replies: HashMap<i64, (i64, bool)>,
    applied: u64,
}

impl LockTable {
    /// Whether `name` is currently held.
    pub fn is_locked(&self, name: &str) -> bool {
        self.held.contains(name)
    }

    /// Number of requests that actually touched the lock state.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Reply for a request already handled. Copies older than the client's
    /// latest request are stale; nobody waits on them, so they get `false`.
    fn seen(&self, args: &LockArgs) -> Option<bool> {
        match self.replies.get(&args.client_id) {
            Some(&(req_id, ok)) if req_id == args.req_id => Some(ok),
            Some(&(req_id, _)) if args.req_id < req_id => Some(false),
            _ => None,
        }
    }

    /// Apply `args` once; later copies get the first answer back.
    fn apply(&mut self, op: Op, args: &LockArgs) -> bool {
        if let Some(ok) = self.seen(args) {
            debug!("duplicate {} #{} from {}", op, args.req_id, args.client_id);
            return ok;
        }
        let ok = match op {
            Op::Lock => self.held.insert(args.lockname.clone()),
            Op::Unlock => self.held.remove(&args.lockname),
        };
        self.applied += 1;
        self.replies.insert(args.client_id, (args.req_id, ok));
        ok
    }
}

/// Minimal server honoring the lock service contract: non-reentrant locks,
/// deduplication on `(client_id, req_id)`, and, on a primary, forwarding of
/// every new request to the backup before applying it.
///
/// There are no view changes and no state transfer.
#[derive(Debug, Clone)]
pub struct LockServer {
    table: Arc<Mutex<LockTable>>,
    backup: Option<LockRpcClient>,
}

impl LockServer {
    /// A server on its own, or a backup.
    pub fn new() -> Self {
        Self {
            table: Arc::default(),
            backup: None,
        }
    }

    /// A primary mirroring its requests to `backup`.
    pub fn with_backup(backup: LockRpcClient) -> Self {
        Self {
            backup: Some(backup),
            ..Self::new()
        }
    }

    /// Shared view of this server's lock table.
    pub fn table(&self) -> Arc<Mutex<LockTable>> {
        self.table.clone()
    }

    fn lock_table(&self) -> MutexGuard<'_, LockTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn serve(&mut self, op: Op, args: LockArgs) -> Result<LockReply> {
        let seen = self.lock_table().seen(&args);
        if let Some(ok) = seen {
            return Ok(LockReply { ok });
        }
        if let Some(backup) = &self.backup {
            let forwarded = match op {
                Op::Lock => backup.lock(args.clone()).await,
                Op::Unlock => backup.unlock(args.clone()).await,
            };
            if let Err(e) = forwarded {
                warn!("forward {} #{} to backup failed: {}", op, args.req_id, e);
            }
        }
        let ok = self.lock_table().apply(op, &args);
        Ok(LockReply { ok })
    }
}

impl Default for LockServer {
    fn default() -> Self {
        Self::new()
    }
}

#[labrpc::async_trait]
impl LockService for LockServer {
    async fn lock(&mut self, args: LockArgs) -> Result<LockReply> {
        self.serve(Op::Lock, args).await
    }
    async fn unlock(&mut self, args: LockArgs) -> Result<LockReply> {
        self.serve(Op::Unlock, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(client_id: i64, req_id: i64, name: &str) -> LockArgs {
        LockArgs {
            client_id,
            req_id,
            lockname: name.to_string(),
        }
    }

    #[test]
    fn test_lock_unlock() {
        let mut t = LockTable::default();
        assert!(t.apply(Op::Lock, &args(1, 1, "a")));
        assert!(t.is_locked("a"));
        assert!(!t.apply(Op::Lock, &args(1, 2, "a")));
        assert!(!t.apply(Op::Lock, &args(2, 1, "a")));
        assert!(t.apply(Op::Unlock, &args(1, 3, "a")));
        assert!(!t.apply(Op::Unlock, &args(1, 4, "a")));
        assert!(!t.is_locked("a"));
    }

    #[test]
    fn test_duplicate_not_reapplied() {
        let mut t = LockTable::default();
        assert!(t.apply(Op::Lock, &args(1, 1, "a")));
        assert!(t.apply(Op::Unlock, &args(1, 2, "a")));
        // The latest request is answered again as before.
        assert!(t.apply(Op::Unlock, &args(1, 2, "a")));
        // A late copy of the lock must not take the lock again.
        assert!(!t.apply(Op::Lock, &args(1, 1, "a")));
        assert!(!t.is_locked("a"));
        assert_eq!(t.applied(), 2);
    }

    #[test]
    fn test_one_reply_kept_per_client() {
        let mut t = LockTable::default();
        for req_id in 1..=100 {
            let op = if req_id % 2 == 1 { Op::Lock } else { Op::Unlock };
            assert!(t.apply(op, &args(1, req_id, "a")));
            assert!(t.apply(Op::Lock, &args(req_id + 1, 1, "other")) == (req_id == 1));
        }
        assert_eq!(t.replies.len(), 101);
        assert_eq!(t.replies.get(&1), Some(&(100, true)));
        assert_eq!(t.applied(), 200);
    }

    #[tokio::test]
    async fn test_serve_without_backup() {
        let mut s = LockServer::new();
        assert_eq!(s.lock(args(9, 1, "x")).await.unwrap(), LockReply { ok: true });
        assert_eq!(s.lock(args(9, 1, "x")).await.unwrap(), LockReply { ok: true });
        assert_eq!(s.table().lock().unwrap().applied(), 1);
    }
}
