//! Binary entrypoint for the clovertap CLI.
//!
//! Commands:
//! - `start` - run the Telegram bot and the coin-update HTTP API
//! - `init` - create a starter `config.toml`
//! - `status` - print a brief summary of the user store
//!
//! See the library crate docs for module-level details: `clovertap::`.
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use teloxide::Bot;

// Use the published library crate modules instead of redefining them here.
use clovertap::bot::HandlerDeps;
use clovertap::config::Config;
use clovertap::http::{ApiAuth, ApiState};
use clovertap::storage::UserStore;
use clovertap::{bot, http, metrics};

#[derive(Parser)]
#[command(name = "clovertap")]
#[command(about = "Telegram tap-to-earn game backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot and the HTTP API
    Start,
    /// Initialize a new configuration file
    Init,
    /// Show user store status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start => {
            let mut config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            config.apply_env_overrides();
            info!("Starting clovertap v{}", env!("CARGO_PKG_VERSION"));
            run_server(config).await?;
        }
        Commands::Init => {
            info!("Initializing new configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let store = UserStore::open(&config.storage.data_dir)?;
            println!("data dir:      {}", config.storage.data_dir);
            println!("players:       {}", store.user_count()?);
            println!("api:           {}:{}", config.api.bind, config.api.port);
            println!(
                "api auth:      {}",
                if config.api.auth_secret.is_some() { "token required" } else { "open" }
            );
        }
    }

    Ok(())
}

/// Construct the service objects and run both frontends to completion.
///
/// Initialization order matters and is deliberate: credentials are verified
/// first, then the store opens, then the bot client is built, then the HTTP
/// routes go live. Teardown happens in reverse once the dispatcher stops.
async fn run_server(config: Config) -> Result<()> {
    if config.bot.token.trim().is_empty() {
        bail!("Telegram bot token not found (set TELEGRAM_BOT_TOKEN or bot.token in config)");
    }

    let store = Arc::new(
        UserStore::open(&config.storage.data_dir)
            .with_context(|| format!("Failed to open user store at {}", config.storage.data_dir))?,
    );
    let bot = Bot::new(config.bot.token.clone());

    let addr: SocketAddr = format!("{}:{}", config.api.bind, config.api.port)
        .parse()
        .with_context(|| "Invalid api.bind / api.port configuration")?;
    let api_state = ApiState {
        store: Arc::clone(&store),
        auth: config.api.auth_secret.as_deref().map(ApiAuth::new),
    };
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let http_task = tokio::spawn(http::serve(api_state, addr, async move {
        let _ = shutdown_rx.await;
    }));

    let deps = HandlerDeps::new(Arc::clone(&store), Arc::new(config));
    info!("Bot dispatcher starting...");
    bot::run(bot, deps).await;

    // Dispatcher has stopped (Ctrl-C); drain the HTTP server and flush.
    let _ = shutdown_tx.send(());
    match http_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("HTTP server exited with error: {}", e),
        Err(e) => warn!("HTTP server task failed: {}", e),
    }
    store.flush()?;
    info!("Shutdown complete; session stats: {:?}", metrics::snapshot());
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(file) = config.as_ref().and_then(|c| c.logging.file.clone()) {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

            // If stdout is not a terminal (service mode), skip console output
            // to avoid duplicate lines in redirected logs.
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        } else {
            builder.format(|fmt, record| {
                writeln!(
                    fmt,
                    "{} [{}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.args()
                )
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
