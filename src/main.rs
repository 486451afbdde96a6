//! Voice agent backend entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use voiceagent::api::{create_router, AppState};
use voiceagent::config::{Config, LogFormat};
use voiceagent::metrics;
use voiceagent::services::LogMailer;
use voiceagent::store::{MemoryStore, PgStore, Store};
use voiceagent::utils::shutdown_signal;

/// Multi-tenant backend for voice agents.
#[derive(Parser, Debug)]
#[command(name = "voiceagent")]
#[command(about = "Multi-tenant SaaS backend for voice agents")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// HTTP server port, overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep all data in memory instead of PostgreSQL.
        #[arg(long)]
        in_memory: bool,

        /// Apply pending migrations before serving.
        #[arg(long)]
        migrate: bool,
    },

    /// Apply pending database migrations and exit.
    Migrate,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Configuration also decides the log format, so load it first and report errors later
    let config = Config::load();
    let log_format = config.as_ref().map(|c| c.log_format).unwrap_or_default();
    init_logging(args.verbose, config.as_ref().ok(), log_format);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(config),
        Some(Command::Migrate) => cmd_migrate(load_valid(config)?).await,
        Some(Command::Serve {
            port,
            in_memory,
            migrate,
        }) => cmd_serve(load_valid(config)?, port, in_memory, migrate).await,
        None => cmd_serve(load_valid(config)?, None, false, false).await,
    }
}

fn init_logging(verbose: bool, config: Option<&Config>, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("voiceagent=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.map(|c| c.rust_log.as_str()).unwrap_or("info"))
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

fn load_valid(config: Result<Config, envy::Error>) -> anyhow::Result<Config> {
    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }
    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config(config: Result<Config, envy::Error>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("VOICE AGENT BACKEND - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match config {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Database: {}", config.database_url_redacted());
    println!("  Pool Size: {}", config.database_max_connections);
    println!("  Listen: {}:{}", config.host, config.port);
    println!("  JWT Algorithm: {}", config.algorithm);
    println!("  Access Token TTL: {} min", config.access_token_expire_minutes);
    println!("  Refresh Token TTL: {} days", config.refresh_token_expire_days);
    println!("  Invite TTL: {} days", config.invite_expire_days);
    println!("  Frontend URL: {}", config.frontend_url);
    println!(
        "  Webhook Signatures: {}",
        if config.twilio_auth_token.is_some() { "Enabled" } else { "Disabled" }
    );
    match config.cors_origins() {
        Some(origins) => println!("  CORS Origins: {}", origins.join(", ")),
        None => println!("  CORS Origins: any"),
    }
    println!("  Log Format: {}", config.log_format);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Apply pending database migrations.
async fn cmd_migrate(config: Config) -> anyhow::Result<()> {
    let store = PgStore::connect(&config)
        .await
        .context("connecting to the database")?;
    store.migrate().await.context("applying migrations")?;
    info!("Migrations applied");
    Ok(())
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(
    config: Config,
    port_override: Option<u16>,
    in_memory: bool,
    migrate: bool,
) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = if in_memory {
        warn!("Using the in-memory store, data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let store = PgStore::connect(&config)
            .await
            .context("connecting to the database")?;
        if migrate {
            store.migrate().await.context("applying migrations")?;
            info!("Migrations applied");
        }
        Arc::new(store)
    };

    let port = port_override.unwrap_or(config.port);
    let addr = format!("{}:{}", config.host, port);
    let config = Arc::new(config);

    let mut app_state = AppState::new(config, store, Arc::new(LogMailer));
    match metrics::install_recorder() {
        Ok(handle) => app_state = app_state.with_metrics(handle),
        Err(e) => warn!("Prometheus exporter unavailable: {}", e),
    }

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("HTTP server listening on {}", addr);
    info!("API docs at http://{}/api/v1/docs", addr);

    let router = create_router(app_state.clone());
    app_state.set_ready(true);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.set_ready(false);
    info!("Server stopped");
    Ok(())
}
