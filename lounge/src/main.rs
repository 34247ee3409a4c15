//! lounge - terminal client for the lounge chat service
//!
//! Joins the lounge over a WebSocket, prints the transcript as it grows and
//! sends every non-blank line read from stdin as a chat message.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/lounge/lounge.log (~/.local/state/lounge/lounge.log)
//! - Config: $XDG_CONFIG_HOME/lounge/config.toml (~/.config/lounge/config.toml)

mod render;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use lounge_core::config::ConnectionConfig;
use lounge_core::{Config, Connector, Credentials, LoungeSession, Route};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "lounge")]
#[command(about = "Terminal client for the lounge chat service")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// WebSocket base URL, e.g. wss://chat.example.com
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Page origin the endpoint is derived from when no base URL is set
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Port override: a number, or `auto` for the development port
    #[arg(long, global = true)]
    port: Option<String>,

    /// Connection timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Join the lounge as an existing user
    Login {
        /// Name to join as
        username: String,
    },
    /// Register a new name and join the lounge
    Register {
        /// Name to register
        username: String,
    },
}

impl Command {
    fn route(&self) -> Route {
        match self {
            Command::Login { .. } => Route::Login,
            Command::Register { .. } => Route::Register,
        }
    }

    fn username(&self) -> &str {
        match self {
            Command::Login { username } | Command::Register { username } => username,
        }
    }
}

impl Args {
    /// Flags win over the config file and environment.
    fn apply_to(&self, config: &mut ConnectionConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(origin) = &self.origin {
            config.origin = origin.clone();
        }
        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
    }

    fn log_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration, then let flags override it
    let mut config = Config::load().context("failed to load configuration")?;
    args.apply_to(&mut config.connection);
    if let Some(level) = args.log_level() {
        config.logging.level = level.to_string();
    }

    // Initialize logging
    let _log_guard =
        lounge_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(route = %args.command.route(), "lounge starting");

    let connector =
        Connector::new(&config.connection).context("invalid connection settings")?;
    let route = args.command.route();
    let credentials = Credentials::new(args.command.username());
    let target = connector
        .target(route, &credentials)
        .context("failed to resolve lounge endpoint")?;
    println!("Connecting to {} ...", target.url());

    // Ctrl+C cancels a pending connect, or ends the session once connected
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        interrupt.cancel();
    })
    .context("failed to set Ctrl+C handler")?;

    let mut session = LoungeSession::new(connector);
    let connected = session
        .connect(route, &credentials, Some(cancel.clone()))
        .await;
    let mut shown = render::print_since(session.transcript(), 0);

    if let Err(e) = connected {
        if e.is_abort() {
            tracing::info!("Connect cancelled by user");
            return Ok(());
        }
        return Err(e).context("failed to connect to the lounge");
    }

    run_session(&mut session, &cancel, &mut shown).await;

    tracing::info!(state = %session.state(), "lounge exiting");
    Ok(())
}

/// Pump transport events and stdin until the connection ends or the user
/// interrupts.
async fn run_session(session: &mut LoungeSession, cancel: &CancellationToken, shown: &mut usize) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                session.disconnect();
                break;
            }
            update = session.next_update() => {
                if update.is_none() {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let body = line.trim();
                    if !body.is_empty() {
                        if let Err(e) = session.send(body) {
                            tracing::warn!(error = %e, "Failed to send message");
                            eprintln!("Failed to send: {}", e);
                        }
                    }
                }
                Ok(None) => {
                    tracing::debug!("stdin closed; still listening");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }

        *shown = render::print_since(session.transcript(), *shown);
    }

    *shown = render::print_since(session.transcript(), *shown);
}
