use clap::Parser;
use rand::seq::SliceRandom;
use shared::codec;
use shared::{ClientEvent, GameSnapshot, ServerEvent};
use tokio::net::TcpStream;

/// Headless client for smoke-testing the server: joins under a given name,
/// optionally starts a round, and presses random tiles whenever it is on
/// turn, printing every event it receives.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to connect to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to connect to
    #[clap(short, long, default_value = "3000")]
    port: u16,
    /// Display name to join with
    #[clap(short, long, default_value = "TESTER")]
    name: String,
    /// Start a round once joined
    #[clap(long)]
    start: bool,
}

async fn send(stream: &mut TcpStream, event: &ClientEvent) -> Result<(), Box<dyn std::error::Error>> {
    let payload = bincode::serialize(event)?;
    codec::write_frame(stream, &payload).await?;
    Ok(())
}

async fn recv(stream: &mut TcpStream) -> Result<ServerEvent, Box<dyn std::error::Error>> {
    let payload = codec::read_frame(stream).await?;
    Ok(bincode::deserialize(&payload)?)
}

/// Press a random unpressed tile if the state says it's our turn.
async fn press_if_on_turn(
    stream: &mut TcpStream,
    state: &GameSnapshot,
    my_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let on_turn = state
        .current_turn
        .and_then(|turn| state.players.get(turn))
        .is_some_and(|name| name == my_name);
    if !on_turn {
        return Ok(());
    }

    let candidates = state.board.unpressed_tiles();
    if let Some(tile) = candidates.choose(&mut rand::thread_rng()) {
        println!("My turn! Pressing ({}, {})", tile.x, tile.y);
        send(stream, &ClientEvent::Press { x: tile.x, y: tile.y }).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    println!("Connecting to {}", address);
    let mut stream = TcpStream::connect(&address).await?;

    let mut my_name = String::new();

    loop {
        let event = recv(&mut stream).await?;
        match event {
            ServerEvent::ConnectResult { state } => {
                println!(
                    "Connected. {} player(s) present, round in progress: {}",
                    state.players.len(),
                    state.in_progress
                );
                send(&mut stream, &ClientEvent::Join { name: args.name.clone() }).await?;
            }
            ServerEvent::JoinResult {
                success,
                message,
                name,
                waiting,
                ..
            } => {
                if !success {
                    println!("Join refused: {}", message.unwrap_or_default());
                    break;
                }
                my_name = name.unwrap_or_default();
                println!(
                    "Joined as {}{}",
                    my_name,
                    if waiting { " (waiting room)" } else { "" }
                );
                if args.start {
                    println!("Starting a round");
                    send(&mut stream, &ClientEvent::Start).await?;
                }
            }
            ServerEvent::PlayerListUpdate { state } => {
                println!(
                    "Players: {:?}, waiting: {:?}, wins: {:?}",
                    state.players, state.waiting, state.wins
                );
            }
            ServerEvent::GameStart { state } => {
                println!("Round started, turn order: {:?}", state.players);
                press_if_on_turn(&mut stream, &state, &my_name).await?;
            }
            ServerEvent::TilePress { state } => {
                println!(
                    "Tile pressed, {} left",
                    state.board.unpressed_count()
                );
                press_if_on_turn(&mut stream, &state, &my_name).await?;
            }
            ServerEvent::Victory { state } => {
                println!(
                    "Victory! Winning tile was {:?}, wins: {:?}",
                    state.winning_tile, state.wins
                );
                send(&mut stream, &ClientEvent::Exit).await?;
                break;
            }
            ServerEvent::GameReset { message, .. } => {
                println!("Round reset: {}", message);
                send(&mut stream, &ClientEvent::Exit).await?;
                break;
            }
        }
    }

    println!("Test client finished");
    Ok(())
}
