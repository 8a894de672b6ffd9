//! Standalone TCP server over a burrow store.

use burrow::server::Server;
use burrow::{Options, Store};
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "burrow-server", about = "Append-only log key-value server")]
struct Args {
    /// Directory holding the data file
    #[arg(long, default_value = "./burrow_data")]
    data_dir: String,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:6380")]
    listen: String,

    /// Fsync after every write
    #[arg(long)]
    sync_writes: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options = Options::new().sync_writes(args.sync_writes);

    let store = match Store::open(&args.data_dir, options) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("failed to open store at {}: {}", args.data_dir, e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(&args.listen, store) {
        Ok(server) => server,
        Err(e) => {
            log::error!("failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        log::error!("server terminated: {}", e);
        std::process::exit(1);
    }
}
