use std::process;

use structopt::StructOpt;

use lockservice::LockClient;

#[derive(StructOpt, Debug)]
enum Command {
    /// Acquire each named lock in turn.
    Lock { names: Vec<String> },
    /// Release each named lock in turn.
    Unlock { names: Vec<String> },
}

#[derive(StructOpt, Debug)]
#[structopt(name = "lockc", about = "Acquire and release locks of a primary/backup lock service")]
struct Opt {
    /// Socket of the primary.
    #[structopt(short, long)]
    primary: String,

    /// Socket of the backup.
    #[structopt(short, long)]
    backup: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let mut client = LockClient::new(opt.primary, opt.backup);

    let mut unavailable = false;
    let (lock, names) = match opt.cmd {
        Command::Lock { names } => (true, names),
        Command::Unlock { names } => (false, names),
    };
    for name in names.iter() {
        let res = if lock {
            client.lock(name).await
        } else {
            client.unlock(name).await
        };
        match res {
            Ok(ok) => println!("{} {}", name, ok),
            Err(e) => {
                eprintln!("{}", e);
                unavailable = true;
            }
        }
    }
    if unavailable {
        process::exit(1);
    }
}
