//! WeCom Relay - multi-tenant gateway in front of the WeCom messaging API
//!
//! Registers enterprises, issues their API key / secret key pairs and
//! authenticates every signed request before it reaches the relay.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    prelude::*,
    EnvFilter, Layer, Registry,
};

use wecom_relay::{
    api, build_secret_store,
    config::{LogFormat, LogTarget, LoggingConfig},
    db,
    services::MasterKey,
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("WeCom Relay {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--generate-master-key") {
        println!("{}", MasterKey::generate().to_base64());
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard flushes file logs on drop and must live until shutdown
    let _log_guard = init_logging(&config.logging);

    info!("WeCom Relay starting up");

    let secrets = Arc::new(build_secret_store(&config.secrets)?);

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(config.clone(), db, secrets);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("WeCom Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging from the `logging` section
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(log_config: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if matches!(log_config.target, LogTarget::Console | LogTarget::Both) {
        layers.push(fmt_layer(&log_config.format, std::io::stdout));
    }
    if matches!(log_config.target, LogTarget::File | LogTarget::Both) {
        let (writer, file_guard) = create_file_writer(log_config);
        layers.push(fmt_layer(&log_config.format, writer));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    guard
}

fn fmt_layer<W>(format: &LogFormat, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(writer)
            .boxed(),
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Ensure the directory of a file-backed SQLite database exists
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    if let Some(parent) = sqlite_data_dir(&config.database.url) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
            info!("Created data directory: {:?}", parent);
        }
    }
    Ok(())
}

fn sqlite_data_dir(url: &str) -> Option<&std::path::Path> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    std::path::Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
}

/// Wrap the API router with request tracing
fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    api::router(state).layer(trace_layer)
}

fn print_help() {
    println!(
        r#"WeCom Relay {}

USAGE:
    wecom-relay [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --generate-master-key   Print a fresh base64 master key and exit. Store it
                            as secrets.master_key or WECOM_RELAY_MASTER_KEY.

ENVIRONMENT:
    WECOM_RELAY_CONFIG              Path to configuration file
    WECOM_RELAY_HOST                Listen address
    WECOM_RELAY_PORT                Listen port
    DATABASE_URL                    SQLite database URL
    RUST_LOG                        Log filter
    WECOM_RELAY_LOG_FORMAT          pretty, compact or json
    WECOM_RELAY_MASTER_KEY          Base64 master key (32 bytes)
    WECOM_RELAY_MASTER_PASSPHRASE   Passphrase for Argon2id key derivation
    WECOM_RELAY_KDF_SALT            Base64 salt for the passphrase (>= 16 bytes)
    WECOM_RELAY_ADMIN_TOKEN         Bearer token for enterprise administration

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by WECOM_RELAY_CONFIG
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/wecom-relay/config.yaml
    5. <user config dir>/wecom-relay/config.yaml

    Changing the master key makes every stored enterprise secret unreadable."#,
        env!("CARGO_PKG_VERSION")
    );
}
