//! CLI for pubtrie
//!
//! Subcommands:
//! - `server`: run the broker
//! - `publish`: send one message to a topic
//! - `subscribe`: subscribe to a topic and print what arrives

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use pubtrie::broker::Broker;
use pubtrie::client::remote;
use pubtrie::config::{Settings, load_config};
use pubtrie::transport::{service_register, start_websocket_server};
use pubtrie::utils::{Error, Result, logging};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pubtrie", about = "Topic-based publish/subscribe broker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the broker
    Server,
    /// Publish a message to a topic
    Publish {
        /// Concrete topic to publish to (no wildcards)
        topic: String,
        /// Treat the message as JSON rather than plain text
        #[arg(short = 'j', long = "json")]
        json: bool,
        /// Message words, joined with spaces
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
        /// Broker URL (defaults to the configured server address)
        #[arg(long)]
        url: Option<String>,
    },
    /// Subscribe to a topic and print incoming messages
    Subscribe {
        /// Topic pattern; `*` matches exactly one segment
        topic: String,
        /// Broker URL (defaults to the configured server address)
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&settings.log.level);

    let outcome = match cli.command {
        Command::Server => run_server(settings).await,
        Command::Publish {
            topic,
            json,
            message,
            url,
        } => run_publish(&settings, url, &topic, &message, json).await,
        Command::Subscribe { topic, url } => run_subscribe(&settings, url, &topic).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Rejected(_)) => ExitCode::FAILURE,
        Err(e @ Error::AlreadyRunning(_)) => {
            println!("Broker service is already running.");
            error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(settings: Settings) -> Result<()> {
    let listener = service_register(&settings.server.addr()).await?;
    let broker = Arc::new(Mutex::new(
        Broker::new().with_prune_on_disconnect(settings.broker.prune_on_disconnect),
    ));

    tokio::select! {
        _ = start_websocket_server(listener, broker) => {
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_publish(
    settings: &Settings,
    url: Option<String>,
    topic: &str,
    words: &[String],
    as_json: bool,
) -> Result<()> {
    let message = match remote::build_payload(words, as_json) {
        Ok(message) => message,
        Err(e) => {
            println!("{e}");
            return Err(e);
        }
    };

    let url = url.unwrap_or_else(|| settings.server.url());
    match remote::publish(&url, topic, message).await {
        Ok(line) => {
            println!("{line}");
            Ok(())
        }
        Err(e) => {
            println!("Failed to open a channel to the broker at {url}. Is the broker running?");
            Err(e)
        }
    }
}

async fn run_subscribe(settings: &Settings, url: Option<String>, topic: &str) -> Result<()> {
    let url = url.unwrap_or_else(|| settings.server.url());

    tokio::select! {
        outcome = remote::subscribe(&url, topic, |line| println!("{line}")) => match outcome {
            Err(e @ (Error::WebSocket(_) | Error::Io(_))) => {
                println!("Failed to open a channel to the broker at {url}. Is the broker running?");
                Err(e)
            }
            other => other,
        },
        _ = tokio::signal::ctrl_c() => Ok(()),
    }
}
