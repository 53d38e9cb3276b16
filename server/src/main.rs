use clap::Parser;
use log::info;
use server::network;
use server::session::{Session, Timings};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Main-method of the application.
/// Parses command-line arguments, binds the listener, then runs the accept
/// loop and the session loop until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "3000")]
        port: u16,
        /// Fixed RNG seed for reproducible turn order and tile placement
        #[clap(long)]
        seed: Option<u64>,
    }

    env_logger::init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {}", address);

    // Single queue for intents, connection events, and timer firings.
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let session = Session::with_options(events_tx.clone(), Timings::default(), args.seed);

    let accept_handle = tokio::spawn(network::serve(listener, events_tx));
    let session_handle = tokio::spawn(session.run(events_rx));

    // Handle shutdown gracefully
    tokio::select! {
        result = accept_handle => {
            if let Err(e) = result {
                eprintln!("Accept loop panicked: {}", e);
            }
        }
        result = session_handle => {
            if let Err(e) = result {
                eprintln!("Session loop panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
