//! wumpbot: relay a console game into a chat channel
//!
//! Spawns the game, connects to the chat server, and lets everyone in the
//! channel play one shared session by addressing the bot:
//! `wump: m 12` moves, `wump: s 3` shoots.
//!
//! Usage: `wumpbot [config.json]`. Type `q` on stdin to quit.

use anyhow::{Context, Result, anyhow};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wumpbot_bridge::{OperatorExit, Session};
use wumpbot_core::SessionConfig;

const DEFAULT_CONFIG: &str = "config.json";

/// Time given to the bridge tasks to wind down once the game is gone
const TASK_GRACE: Duration = Duration::from_secs(2);

enum Outcome {
    Operator(OperatorExit),
    GameExited(std::process::ExitStatus),
}

fn spawn_game(config: &SessionConfig) -> Result<Child> {
    Command::new(&config.game)
        .args(&config.game_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Could not start {} command", config.game))
}

async fn connect(config: &SessionConfig) -> Result<TcpStream> {
    info!("Connecting to chat server at {}", config.host);

    let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(&config.host))
        .await
        .map_err(|_| anyhow!("Connection timeout to {}", config.host))?
        .with_context(|| format!("Could not connect to chat server: {}", config.host))?;

    stream
        .set_nodelay(true)
        .context("Failed to set TCP_NODELAY")?;

    Ok(stream)
}

async fn run(config: SessionConfig) -> Result<()> {
    let mut child = spawn_game(&config)?;
    let game_in = child.stdin.take().context("Game stdin not piped")?;
    let game_out = child.stdout.take().context("Game stdout not piped")?;

    let stream = connect(&config).await?;
    let (chat_in, chat_out) = stream.into_split();

    let shutdown_timeout = config.shutdown_timeout();
    let session = Session::start(config, game_in, game_out, chat_in, chat_out);

    let operator = BufReader::new(tokio::io::stdin());
    let outcome = tokio::select! {
        exit = session.operator_loop(operator) => Outcome::Operator(exit?),
        status = child.wait() => Outcome::GameExited(status?),
    };

    let status = match outcome {
        Outcome::GameExited(status) => Some(status),
        Outcome::Operator(OperatorExit::Closed) => {
            info!("Operator input closed, waiting for the game to exit");
            Some(child.wait().await?)
        }
        Outcome::Operator(OperatorExit::Quit) => {
            match tokio::time::timeout(shutdown_timeout, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => {
                    warn!("Game still running after {:?}, killing it", shutdown_timeout);
                    child.kill().await.context("Failed to kill game")?;
                    None
                }
            }
        }
    };

    if let Some(status) = status {
        info!("Game exited: {}", status);
    }

    session.shutdown(TASK_GRACE).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = SessionConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path))?;

    info!(
        "Starting wumpbot: {} as {} in {}",
        config.game,
        config.nick,
        config.channel_target()
    );

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    // The blocking stdin reader cannot be cancelled; exit instead of waiting
    // for the runtime to drain it.
    std::process::exit(0);
}
