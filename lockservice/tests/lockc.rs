use std::path::Path;

use labrpc::{server::Server, unix};
use lockservice::{LockRpcServer, LockServer};
use tokio::process::Command;

const LOCKC: &str = env!("CARGO_BIN_EXE_lockc");

fn lockc(primary: &Path, backup: &Path) -> Command {
    let mut cmd = Command::new(LOCKC);
    cmd.arg("--primary").arg(primary).arg("--backup").arg(backup);
    cmd
}

#[tokio::test]
async fn test_unavailable_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let (primary, backup) = (dir.path().join("p.sock"), dir.path().join("b.sock"));

    let out = lockc(&primary, &backup)
        .args(&["lock", "A"])
        .output()
        .await
        .expect("run lockc");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unavailable"), "{}", stderr);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lock_then_unlock() {
    let dir = tempfile::tempdir().unwrap();
    let (primary, backup) = (dir.path().join("p.sock"), dir.path().join("b.sock"));

    // Only the backup is up; lockc fails over to it.
    let mut server = LockRpcServer::from_service(LockServer::new());
    let routine = unix::listen(&backup, server.client_chan()).unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::spawn(routine);

    let out = lockc(&primary, &backup)
        .args(&["lock", "A", "A"])
        .output()
        .await
        .expect("run lockc");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "A true\nA false\n");

    let out = lockc(&primary, &backup)
        .args(&["unlock", "A", "A"])
        .output()
        .await
        .expect("run lockc");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "A true\nA false\n");
}
