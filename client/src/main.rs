use clap::Parser;
use client::bot::pick_pawn_step;
use client::error::ClientError;
use client::game::ClientBoard;
use client::input::Command;
use client::network::{wire_size, Client, HEARTBEAT_INTERVAL};
use log::{debug, error, info, warn};
use shared::{get_timestamp, Packet, DEFAULT_MOVE_COOLDOWN_MS};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name to join with (the server picks one if omitted)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Join immediately and make random pawn steps instead of reading commands
    #[arg(long)]
    bot: bool,

    /// Delay between bot moves in milliseconds
    #[arg(long, default_value_t = DEFAULT_MOVE_COOLDOWN_MS + 100)]
    bot_interval_ms: u64,
}

fn report(board: &mut ClientBoard, packet: &Packet) -> bool {
    if let Packet::Joined { .. } = packet {
        debug!("Joined snapshot took {} bytes", wire_size(packet));
    }
    if let Some(event) = board.apply(packet) {
        println!("{}", event);
    }
    !matches!(packet, Packet::Full)
}

/// Reads commands from stdin while printing server events as they arrive
async fn run_interactive(client: &mut Client, name: Option<String>) -> Result<(), ClientError> {
    let mut board = ClientBoard::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut heartbeat = interval(HEARTBEAT_INTERVAL);

    if name.is_some() {
        client.send(&Packet::Join { name }).await?;
    }
    println!("Commands: join [name] | move fx fy tx ty | query minx maxx miny maxy | show minx maxx miny maxy | quit");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match Command::parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                if let Command::Show { bounds } = &command {
                    if board.is_empty() {
                        println!("No pieces seen yet");
                    } else {
                        print!("{}", board.render(bounds));
                    }
                    continue;
                }
                if let Some(packet) = command.to_packet() {
                    client.send(&packet).await?;
                }
                if command == Command::Quit {
                    return Ok(());
                }
            },
            packet = client.recv() => {
                if !report(&mut board, &packet?) {
                    return Ok(());
                }
            },
            _ = heartbeat.tick() => {
                client.send(&Packet::Heartbeat { timestamp: get_timestamp() }).await?;
            },
        }
    }

    client.send(&Packet::Leave).await
}

/// Joins and keeps stepping random pawns until the connection ends
async fn run_bot(client: &mut Client, name: Option<String>, step: Duration) -> Result<(), ClientError> {
    let mut board = ClientBoard::new();
    let mut rng = rand::thread_rng();

    client.send(&Packet::Join { name }).await?;
    loop {
        let packet = client.recv().await?;
        match &packet {
            Packet::Joined { .. } => {
                report(&mut board, &packet);
                break;
            }
            Packet::Full => return Err(ClientError::JoinRefused("server is full".to_string())),
            Packet::Rejected { reason } => return Err(ClientError::JoinRefused(reason.to_string())),
            _ => {}
        }
    }

    let mut ticker = interval(step);
    loop {
        tokio::select! {
            packet = client.recv() => {
                report(&mut board, &packet?);
            },
            _ = ticker.tick() => {
                match pick_pawn_step(&board, &mut rng) {
                    Some((from, to)) => client.send(&Packet::move_between(from, to)).await?,
                    // Nothing to move: still show the server we are here.
                    None => client.send(&Packet::Heartbeat { timestamp: get_timestamp() }).await?,
                }
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let mut client = Client::connect(&args.server).await?;
    info!("Connected to {}", client.server_addr());

    let result = if args.bot {
        run_bot(
            &mut client,
            args.name,
            Duration::from_millis(args.bot_interval_ms),
        )
        .await
    } else {
        run_interactive(&mut client, args.name).await
    };

    match result {
        Ok(()) => Ok(()),
        Err(ClientError::ConnectionClosed) => {
            warn!("Server closed the connection");
            Ok(())
        }
        Err(e) => {
            error!("Client stopped: {}", e);
            Err(e.into())
        }
    }
}
