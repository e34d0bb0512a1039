use std::path::PathBuf;

use labrpc::{
    client::{Channel, Client},
    server::Server,
    unix, DEFAULT_TIMEOUT,
};
use log::{error, info};
use structopt::StructOpt;

use lockservice::{LockRpcClient, LockRpcServer, LockServer};

#[derive(StructOpt, Debug)]
#[structopt(name = "lockd", about = "Serve a lock table on a Unix socket")]
struct Opt {
    /// Socket to listen on.
    #[structopt(short, long, parse(from_os_str))]
    socket: PathBuf,

    /// Backup to mirror every request to; makes this server a primary.
    #[structopt(short, long, parse(from_os_str))]
    backup: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let svc = match opt.backup {
        Some(backup) => {
            info!("mirroring to {}", backup.display());
            LockServer::with_backup(LockRpcClient::from_channel(
                Channel::Unix(backup),
                DEFAULT_TIMEOUT,
            ))
        }
        None => LockServer::new(),
    };

    let mut server = LockRpcServer::from_service(svc);
    unix::remove_stale(&opt.socket)?;
    tokio::spawn(unix::listen(&opt.socket, server.client_chan())?);
    if let Err(e) = server.run().await {
        error!("server stopped: {}", e);
    }
    Ok(())
}
