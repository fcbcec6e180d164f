//! vi-token: fetch a scoped access token for the configured account

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use video_indexer_client::config::Config;
use video_indexer_client::token::{PermissionLevel, TokenScope};
use video_indexer_client::VideoIndexerClient;

/// Print usage information
fn print_usage() {
    eprintln!("Usage: vi-token <config.yaml> [permission] [scope]");
    eprintln!();
    eprintln!("vi-token - fetch a scoped access token for a video-indexing account");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.yaml    Path to configuration file");
    eprintln!("  permission     Reader | Contributor | AccessAdministrator | Owner");
    eprintln!("                 (default: Contributor)");
    eprintln!("  scope          Account | Project | Video (default: Account)");
    eprintln!();
    eprintln!("The token is printed to stdout for use as a bearer credential.");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  vi-token config.yaml Reader Account");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        print_usage();
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);

    let permission = match args.get(2) {
        Some(value) => match PermissionLevel::parse(value) {
            Ok(permission) => permission,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => PermissionLevel::default(),
    };

    let scope = match args.get(3) {
        Some(value) => match TokenScope::parse(value) {
            Ok(scope) => scope,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => TokenScope::default(),
    };

    // Load configuration
    let config = match Config::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging on stderr so the token stays alone on stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("vi-token starting");
    debug!("Loaded configuration from {:?}", config_path);

    // Cancel the in-flight request on Ctrl+C
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_cancel.cancel();
        }
    });

    let client = VideoIndexerClient::new(config)?;
    let token = client.generate_access_token(permission, scope, &cancel).await?;

    println!("{}", token);
    Ok(())
}
