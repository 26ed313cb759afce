use clap::Parser;
use log::{error, info};
use server::game::{GameConfig, OrphanPolicy};
use server::network::{Server, ServerConfig, ServerMessage};
use shared::{DEFAULT_MAX_PLAYERS, DEFAULT_MIN_SPAWN_DISTANCE, DEFAULT_MOVE_COOLDOWN_MS};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Maximum number of simultaneously active players
    #[arg(short = 'm', long, default_value_t = DEFAULT_MAX_PLAYERS)]
    max_players: usize,

    /// Minimum distance between spawn anchors of active players
    #[arg(long, default_value_t = DEFAULT_MIN_SPAWN_DISTANCE)]
    min_spawn_distance: f64,

    /// Minimum time between two accepted moves of the same player
    #[arg(long, default_value_t = DEFAULT_MOVE_COOLDOWN_MS)]
    move_cooldown_ms: u64,

    /// Remove a departed player's pieces after this many seconds (kept forever if unset)
    #[arg(long)]
    orphan_ttl_secs: Option<u64>,

    /// Disconnect connections silent for this many seconds
    #[arg(long, default_value = "30")]
    idle_timeout_secs: u64,

    /// Maximum number of open connections, joined or not
    #[arg(long, default_value = "256")]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let orphan_policy = match args.orphan_ttl_secs {
        Some(secs) => OrphanPolicy::ExpireAfter(Duration::from_secs(secs)),
        None => OrphanPolicy::KeepForever,
    };
    let game_config = GameConfig {
        max_players: args.max_players,
        min_spawn_distance: args.min_spawn_distance,
        move_cooldown: Duration::from_millis(args.move_cooldown_ms),
        orphan_policy,
    };
    let server_config = ServerConfig {
        max_connections: args.max_connections,
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
        ..ServerConfig::default()
    };

    info!("Starting server...");
    info!(
        "Max players: {}, spawn distance: {}, move cooldown: {}ms, orphans: {:?}",
        game_config.max_players,
        game_config.min_spawn_distance,
        args.move_cooldown_ms,
        game_config.orphan_policy
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, game_config, server_config).await?;

    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = handle.send(ServerMessage::Shutdown);
        }
    });

    if let Err(e) = server.run().await {
        error!("Server stopped: {}", e);
        return Err(e.into());
    }

    Ok(())
}
