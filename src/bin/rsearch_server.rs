//!
//! rsearch server binary
//! ----------------------
//! Command-line entry point for starting the rsearch HTTP server.
//! Configuration is read from environment variables (see `rsearch::config`);
//! no CLI flag parser is introduced since the on-disk config loader/CLI
//! surface is an external-collaborator concern (spec.md §1).

use anyhow::Result;
use rsearch::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let config = ServerConfig::from_env();
    println!("rsearch starting on port {}", config.http_port);
    rsearch::server::run(config).await
}
