use clap::Parser;
use client::app::App;
use client::console;
use client::network::{self, ConnectionConfig};
use client::session::{keys, SessionContext};
use client::transport::EventChannel;
use log::info;
use shared::{GameKind, PlayerProfile};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the game server
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:10996")]
    server: String,

    /// Where the session context is kept between runs
    #[arg(long, default_value = ".gridfall-session.bin")]
    session_file: PathBuf,

    /// Account id to store in the session (there is no login flow here)
    #[arg(short = 'a', long)]
    account_id: Option<String>,

    /// Display name for --account-id
    #[arg(short = 'n', long)]
    nickname: Option<String>,

    /// Session token sent with the connection
    #[arg(short = 't', long)]
    token: Option<String>,

    /// Start matching for this game kind right away (s4p2, s4p4, s4p8)
    #[arg(short = 'm', long)]
    match_kind: Option<GameKind>,

    /// Create a custom room of this kind right away (s4g9, s4g15, s4g21)
    #[arg(short = 'c', long)]
    custom_kind: Option<GameKind>,

    /// Open an invite to this room id
    #[arg(short = 'r', long)]
    room: Option<String>,

    /// Delay between reconnect attempts in milliseconds
    #[arg(long, default_value = "1000")]
    reconnect_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut session = SessionContext::open(&args.session_file)?;
    if let Some(id) = &args.account_id {
        let nickname = args.nickname.clone().unwrap_or_else(|| id.clone());
        session.set(keys::ACCOUNT, &PlayerProfile::new(id.as_str(), nickname));
    }
    if let Some(token) = &args.token {
        session.set(keys::TOKEN, token);
    }

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    let config = ConnectionConfig::new(
        &args.server,
        session.token().as_deref(),
        Duration::from_millis(args.reconnect_ms),
    )?;

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();

    let network = network::spawn(config, inbound_tx, outbound_rx);
    let reader = console::spawn_reader(intent_tx.clone());

    if let Some(kind) = args.match_kind {
        intent_tx.send(console::Intent::Match(kind))?;
    }
    if let Some(kind) = args.custom_kind {
        intent_tx.send(console::Intent::Custom(kind))?;
    }
    if let Some(room) = args.room {
        intent_tx.send(console::Intent::Door(room))?;
    }
    drop(intent_tx);

    println!("{}", console::HELP);
    let app = App::new(session, EventChannel::new(outbound_tx));
    app.run(inbound_rx, intent_rx).await;

    reader.abort();
    network.abort();
    Ok(())
}
