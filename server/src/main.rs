use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::{Server, ServerMessage};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Players per game before it is rotated out
    #[arg(short, long, default_value_t = shared::GAME_CAPACITY)]
    capacity: usize,

    /// Maximum concurrent subscribers
    #[arg(short, long, default_value = "256")]
    max_subscribers: usize,

    /// Seconds of silence before a subscriber is dropped
    #[arg(short, long, default_value = "10")]
    timeout_secs: u64,

    /// Seed for avatar/color assignment
    #[arg(short, long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        capacity: args.capacity,
        max_subscribers: args.max_subscribers,
        subscriber_timeout: Duration::from_secs(args.timeout_secs),
        seed: args.seed,
    };

    let mut server = Server::new(&config).await?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            if let Err(e) = shutdown.send(ServerMessage::Shutdown) {
                error!("Failed to signal shutdown: {}", e);
            }
        }
    });

    server.run().await?;

    Ok(())
}
