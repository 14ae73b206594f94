use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use wavy_server::{config, server};

#[derive(Parser, Debug)]
#[command(name = "wavy-server", version, about = "Secure HLS ingest and serving node")]
struct Cli {
    /// Path to a TOML config file overriding the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "wavy_server=trace,tower_http=debug".to_string()
        } else {
            "wavy_server=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let mut config = config::load_config_or_default(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(server::start_server(config))?;

    Ok(())
}
