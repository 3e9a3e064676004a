use clap::Parser;
use client::bot::DemoBot;
use client::config::ClientConfig;
use client::network::NetworkClient;
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{Action, MessageBody, SystemMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Device id to subscribe with; random when omitted
    #[arg(short = 'd', long)]
    device_id: Option<String>,

    /// Play area width used for spawn placement
    #[arg(long, default_value = "1920")]
    screen_width: f32,

    /// Play area height used for spawn placement
    #[arg(long, default_value = "1080")]
    screen_height: f32,

    /// Broadcast start_game after joining
    #[arg(long)]
    start: bool,

    /// Seed for the demo player's random moves
    #[arg(long)]
    seed: Option<u64>,
}

/// Consecutive rejections tolerated before the client exits
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Handler callbacks forwarded to the main loop
#[derive(Debug)]
enum SessionEvent {
    Connected(String),
    Received(SystemMessage),
    Disconnected(String),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let device_id = args
        .device_id
        .unwrap_or_else(|| format!("device-{:04}", rand::thread_rng().gen_range(0..10_000)));

    let config = ClientConfig {
        server_addr: args.server,
        device_id,
        screen_width: args.screen_width,
        screen_height: args.screen_height,
        start_game: args.start,
        ..ClientConfig::default()
    };

    info!("Starting client...");
    info!("Connecting to {} as {}", config.server_addr, config.device_id);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut network = NetworkClient::new(&config.server_addr).await?;

    let tx = event_tx.clone();
    network.proxy_mut().set_on_connected(move |identity| {
        if let Err(e) = tx.send(SessionEvent::Connected(identity.to_string())) {
            debug!("Session event dropped: {}", e);
        }
    });
    let tx = event_tx.clone();
    network.proxy_mut().set_on_received(move |message| {
        if let Err(e) = tx.send(SessionEvent::Received(message.clone())) {
            debug!("Session event dropped: {}", e);
        }
    });
    let tx = event_tx;
    network.proxy_mut().set_on_disconnected(move |reason| {
        if let Err(e) = tx.send(SessionEvent::Disconnected(reason.to_string())) {
            debug!("Session event dropped: {}", e);
        }
    });

    network.connect(&config.device_id).await?;

    let mut game = config.build_game_state();
    let mut bot = DemoBot::new(&config.device_id, args.seed);
    let mut tick_interval = interval(config.tick_interval());
    let mut heartbeat_interval = interval(config.heartbeat_interval);
    let mut last_saved = game.time_remaining();
    let mut finish_sent = false;
    let mut start_sent = false;
    let mut reconnect_attempts = 0;

    'session: loop {
        tokio::select! {
            result = network.receive() => {
                if let Err(e) = result {
                    error!("Error receiving packet: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            },

            _ = tick_interval.tick() => {
                if let Some(event) = bot.play_turn(&mut game) {
                    debug!("Demo event: {:?}", event);
                }

                let expired = game.tick();
                let elapsed = last_saved.saturating_sub(game.time_remaining());
                if game.is_running() && elapsed >= config.save_every_secs {
                    last_saved = game.time_remaining();
                    let action = Action::SaveGame {
                        game_data: game.finish_data(&config.device_id),
                    };
                    network.perform(&action).await?;
                }

                if expired && !finish_sent {
                    info!("Time is up, submitting final state");
                    finish_sent = true;
                    let action = Action::FinishGame {
                        game_data: game.finish_data(&config.device_id),
                    };
                    network.perform(&action).await?;
                }
            },

            _ = heartbeat_interval.tick() => {
                network.heartbeat().await?;
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, disconnecting...");
                network.disconnect().await?;
                break 'session;
            },
        }

        network.flush().await?;

        while let Ok(event) = event_rx.try_recv() {
            match event {
                SessionEvent::Connected(identity) => {
                    network
                        .perform(&Action::CreatePlayer {
                            device_id: identity.clone(),
                        })
                        .await?;
                    network
                        .perform(&Action::FetchGame {
                            device_id: identity,
                        })
                        .await?;
                    reconnect_attempts = 0;
                    if config.start_game && !start_sent {
                        start_sent = true;
                        network.perform(&Action::StartGame).await?;
                    }
                }
                SessionEvent::Received(message) => {
                    let finished = matches!(message.body, MessageBody::GameFinished(_));
                    game.apply_message(&message);
                    last_saved = last_saved.max(game.time_remaining());

                    if finished {
                        for player in game.retire_roster() {
                            info!(
                                "{}: score {}, level {}",
                                player.display_name(),
                                player.score(),
                                player.level()
                            );
                        }
                        network.disconnect().await?;
                        break 'session;
                    }
                }
                SessionEvent::Disconnected(reason) => {
                    warn!("Disconnected: {}", reason);
                    if reconnect_attempts >= MAX_RECONNECT_ATTEMPTS {
                        error!("Giving up after {} reconnect attempts", reconnect_attempts);
                        break 'session;
                    }
                    reconnect_attempts += 1;
                    network.connect(&config.device_id).await?;
                }
            }
        }
    }

    Ok(())
}
