//! TCP tic-tac-toe lobby server.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ttt_server::auth::AuthStore;
use ttt_server::config::Config;
use ttt_server::server;

#[derive(Parser, Debug)]
#[command(name = "ttt-server")]
#[command(about = "Multi-client TCP server for the tic-tac-toe lobby")]
struct Args {
    /// Path to the JSON server config file.
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Both loads are fatal on any problem: refuse to start rather than
    // accept connections against a broken config or record store.
    let config = Config::load(&args.config)?;
    let auth = AuthStore::load(&config.user_database)?;

    info!(
        port = config.port,
        users = auth.len(),
        user_database = %config.user_database.display(),
        "starting ttt-server"
    );

    server::run(config, auth).await
}
