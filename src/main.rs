//! API backend server.
//!
//! Loads configuration, opens the database, builds the route tree from the
//! registered feature modules and serves it until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use api_backend::admin::AdminRoutes;
use api_backend::config::{read_config, validate_config, AppConfig, ConfigError};
use api_backend::database::SqliteDb;
use api_backend::lifecycle::{drain, shutdown_signal, BuiltRoutes, Shutdown};
use api_backend::observability::{init_logging, init_metrics};
use api_backend::{AppState, HttpServer, RoutingContext};

#[derive(Parser)]
#[command(name = "api-backend")]
#[command(about = "Versioned JSON API backend", long_about = None)]
struct Cli {
    /// TOML configuration file, overridden by the environment.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Env file to load (default: `.env` when present).
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Print the route listing and exit.
    #[arg(long)]
    print_routes: bool,
}

fn routing_context() -> RoutingContext<AppState> {
    RoutingContext::new().with_provider(AdminRoutes)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| ()),
        None => dotenvy::dotenv().map(|_| ()).or_else(|e| if e.not_found() { Ok(()) } else { Err(e) }),
    };

    let config = read_config(cli.config.as_deref());
    init_logging(&config.as_ref().map(|c| c.observability.clone()).unwrap_or_default());

    if let Err(e) = env_loaded {
        tracing::error!(error = %e, "Failed to load env file");
        return ExitCode::FAILURE;
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // Listing routes needs no database or API key.
    if cli.print_routes {
        return print_routes(&config);
    }

    if let Err(e) = validate_config(&config).map_err(ConfigError::Validation) {
        tracing::error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

fn print_routes(config: &AppConfig) -> ExitCode {
    let built = BuiltRoutes::build(&routing_context(), config);
    match built.write_routes(&mut std::io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Failed to print routes");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        database = %config.database.path,
        "api-backend starting"
    );

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?);
    }

    let db = SqliteDb::connect(&config.database).await?;
    let grace = config.server.shutdown_grace();
    let bind_address = config.bind_address();

    let server = HttpServer::new(AppState::new(config, db.clone()), routing_context())?;

    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();

    if drain(server_task, grace).await {
        tracing::info!("In-flight requests drained");
    }

    db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
