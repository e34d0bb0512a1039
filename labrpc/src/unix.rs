//! Unix-socket transport. Every call dials a fresh connection that carries
//! one request line and one reply line, then is closed.

use std::{io::ErrorKind, path::Path, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use futures::Future;
use log::{info, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    sync::mpsc::{self, Sender},
};

use crate::network::NetworkPackage;

/// Pause after a failed `accept`, so a persistent error such as EMFILE does
/// not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn call(path: &Path, req: &str) -> Result<String> {
    let stream = UnixStream::connect(path)
        .await
        .with_context(|| format!("dial {}", path.display()))?;
    let (rd, mut wr) = stream.into_split();
    wr.write_all(req.as_bytes()).await?;
    wr.write_all(b"\n").await?;

    let mut resp = String::new();
    if BufReader::new(rd).read_line(&mut resp).await? == 0 {
        bail!("{} closed the connection without a reply", path.display());
    }
    Ok(resp.trim_end().to_owned())
}

/// Bind `path` and return a routine feeding accepted requests into `chan`,
/// typically a [`Server::client_chan`](crate::server::Server::client_chan).
///
/// Binding happens before this returns, so callers may dial right away.
pub fn listen(path: &Path, chan: Sender<NetworkPackage>) -> Result<impl Future<Output = ()>> {
    let listener =
        UnixListener::bind(path).with_context(|| format!("bind {}", path.display()))?;
    let name = path.display().to_string();
    info!("listening on {}", name);

    Ok(async move {
        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("{} accept failed: {}", name, e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let chan = chan.clone();
            let name = name.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_conn(stream, &name, chan).await {
                    warn!("{}: {}", name, e);
                }
            });
        }
    })
}

/// Remove a socket file nobody is listening on any more, as left behind by a
/// server that exited. A live socket is left alone.
pub fn remove_stale(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    match std::os::unix::net::UnixStream::connect(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
            info!("removing stale socket {}", path.display());
            std::fs::remove_file(path).with_context(|| format!("remove {}", path.display()))
        }
        Err(e) => Err(e).with_context(|| format!("connect {}", path.display())),
    }
}

async fn serve_conn(stream: UnixStream, name: &str, chan: Sender<NetworkPackage>) -> Result<()> {
    let (rd, mut wr) = stream.into_split();
    let mut data = String::new();
    if BufReader::new(rd).read_line(&mut data).await? == 0 {
        return Ok(());
    }

    let (reply, mut rx) = mpsc::channel(1);
    chan.send(NetworkPackage {
        to: name.to_owned(),
        reply,
        data: data.trim_end().to_owned(),
    })
    .await
    .map_err(|_| anyhow!("server is gone"))?;

    // No reply means the server refused; closing the socket says so.
    if let Some(resp) = rx.recv().await {
        wr.write_all(resp.as_bytes()).await?;
        wr.write_all(b"\n").await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{Channel, Client},
        echo::{echo_svc, Echo},
        server::Server,
        DEFAULT_TIMEOUT,
    };

    #[tokio::test]
    async fn test_call_over_socket() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.sock");

        let mut server = echo_svc::Server::from_service(Echo);
        let routine = listen(&path, server.client_chan()).unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::spawn(routine);

        let c = echo_svc::Client::from_channel(Channel::Unix(path.clone()), DEFAULT_TIMEOUT);
        assert_eq!(c.echo("a\nb".to_string()).await.unwrap(), "a\nb");
        assert_eq!(c.echo("again".to_string()).await.unwrap(), "again");
        assert!(c.fail().await.is_err());
        assert_eq!(c.endpoint(), path.display().to_string());
    }

    #[tokio::test]
    async fn test_listen_over_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let server = echo_svc::Server::from_service(Echo);
        assert!(listen(&path, server.client_chan()).is_err());

        remove_stale(&path).unwrap();
        assert!(!path.exists());
        let routine = listen(&path, server.client_chan()).unwrap();
        tokio::spawn(routine);

        // A live socket survives.
        remove_stale(&path).unwrap();
        assert!(path.exists());
        remove_stale(&dir.path().join("absent.sock")).unwrap();
    }

    #[tokio::test]
    async fn test_dial_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let c = echo_svc::Client::from_channel(
            Channel::Unix(dir.path().join("nothing.sock")),
            DEFAULT_TIMEOUT,
        );
        let err = c.echo("x".to_string()).await.unwrap_err();
        assert!(err.to_string().contains("dial"), "{}", err);
    }
}
