//! dispatch-engine server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ registry::Engine
//!                     (axum, layers)     │
//!                                        ├─ /rpc/...  → rpc::RpcRouter → dispatch (JSON)
//!                                        ├─ /ws/...   → socket::SocketHub + on_message
//!                                        └─ otherwise → routing::HttpRouter
//!                                                        → dispatch::Dispatcher
//!                                                          (binder → interceptors → handler → view)
//!     Client Response
//!     ◀────────────── engine Response ◀──┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use dispatch_engine::config::{load_config, EngineConfig};
use dispatch_engine::lifecycle::signals::spawn_signal_handler;
use dispatch_engine::lifecycle::Shutdown;
use dispatch_engine::observability::{logging, metrics};
use dispatch_engine::{demo, HttpServer, RegistryBuilder};

#[derive(Parser)]
#[command(name = "dispatch-engine")]
#[command(about = "Request-dispatch engine serving the sample application", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve requests (default)
    Serve,
    /// Print every registered route and exit
    Routes,
    /// Validate the configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("dispatch-engine v{} starting", env!("CARGO_PKG_VERSION"));

    let mut builder = RegistryBuilder::new();
    demo::register(&mut builder);
    let engine = Arc::new(builder.build(&config)?);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Check => {
            tracing::info!("Configuration and registry are valid");
            return Ok(());
        }
        Commands::Routes => {
            engine.log_routes();
            return Ok(());
        }
        Commands::Serve => {}
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        default_view = %config.http.default_view,
        static_cache = config.http.static_cache,
        request_timeout_secs = config.http.request_timeout_secs,
        "Configuration loaded"
    );
    engine.log_routes();

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    HttpServer::new(&config, engine)
        .with_shutdown(shutdown)
        .run(listener)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
