mod config;
mod executor;
mod protocol;
mod request;
mod server;
mod tools;

use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use server::CommandExecutorServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let server = CommandExecutorServer::new(ServerConfig::for_current_process())?;
    Arc::new(server)
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    Ok(())
}
