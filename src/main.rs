//! Ratatosk - an IRC bot that carries messages people are not around to
//! receive.
//!
//! # Overview
//!
//! Ratatosk idles in a set of IRC channels and runs errands for their
//! inhabitants: it holds `tell` messages until the recipient next speaks,
//! delivers timed `alert` reminders, keeps per-channel memos and quotes, and
//! fans topic-addressed tells out to subscribers. All state is durable, so a
//! restart loses nothing.
//!
//! # Configuration
//!
//! Create a `config.yaml`:
//!
//! ```yaml
//! irc:
//!   server: "irc.libera.chat"
//!   port: 6667
//!   nick: "ratatosk"
//!   trigger: "."
//!   channels:
//!     - "#treetop"
//!
//! admin_channel: "#ratatosk-admin"
//!
//! privileges:
//!   "#treetop":
//!     alice: 5
//! ```
//!
//! Any value can be overridden from the environment with the `RATATOSK_`
//! prefix, for example `RATATOSK_IRC__NICK=squirrel`.
//!
//! # Usage
//!
//! ```bash
//! ratatosk --config config.yaml --data ./ratatosk-data
//! ```
//!
//! # Bot commands
//!
//! Lines starting with the trigger character are commands:
//!
//! - `.help [command]` - list commands or show one command's usage
//! - `.tell <nick|@topic> <text>` - leave a message
//! - `.alert <delay> <text>` - schedule a reminder (`10m`, `2h`, `1d`)
//! - `.seen <nick>` - report when a nick last spoke
//! - `.memo <add|get|append|delete> <nick> [text]` - per-channel memos
//! - `.quote <add|get|list|count|delete> <nick> [text|index]` - saved quotes
//! - `.subscribe <topic>` / `.unsubscribe <topic>` - tell topic membership
//! - `.restrict [-d] <topic>` - restrict a topic (level 4)
//! - `.set <key> <value>` - flip a channel setting (level 4)
//!
//! # Architecture
//!
//! - [`bot`] - wiring and the sequential dispatch loop
//! - [`commands`] - argument specs, registry, dispatcher and handlers
//! - [`config`] - YAML configuration with environment overrides
//! - [`irc`] - connection, registration and the wire format
//! - [`lexicon`] - response phrase resolution
//! - [`store`] - durable state with atomic fetch-then-delete delivery
//! - [`utils`] - path and time helpers
//!
//! # Environment variables
//!
//! - `RUST_LOG` - logging level (default: `info`)

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod commands;
mod config;
mod irc;
mod lexicon;
mod store;
mod utils;

/// Command-line arguments for the Ratatosk bot.
///
/// Most configuration lives in the YAML file (see [`config::Config`]); the
/// command line only locates that file and the data directory.
///
/// # Examples
///
/// ```bash
/// ratatosk --config config.yaml --data ./ratatosk-data
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,

    /// Path to the directory for persistent data.
    ///
    /// The store database `store.db` is created here on first start.
    #[arg(short, long)]
    data: String,
}

/// Main entry point.
///
/// Sets up logging (`info` by default, `RUST_LOG` to override), parses the
/// command line, loads the configuration and runs the bot until the IRC
/// connection closes. Configuration problems are logged and end the process
/// cleanly instead of panicking.
#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting ratatosk {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    let bot = match Bot::new(config, &args) {
        Ok(bot) => bot,
        Err(e) => {
            error!("Failed to initialize bot: {}", e);
            return;
        }
    };

    if let Err(e) = bot.start().await {
        error!("Bot stopped with an error: {}", e);
    }
}
