use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};

use shiptrack::config::load_effective_config;
use shiptrack::{init_logging, Services};

const ENV_CONFIG: &str = "SHIPTRACK_CONFIG";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("shiptrack-server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var_os(ENV_CONFIG)
        .map(PathBuf::from)
        .or_else(|| std::env::args_os().nth(1).map(PathBuf::from));

    let config = load_effective_config(config_path.as_deref())?;
    init_logging(&config.logging)?;

    match &config_path {
        Some(path) => tracing::info!(path = %path.display(), "Loaded configuration"),
        None => tracing::info!("No config file given, using defaults"),
    }

    let address = format!("{}:{}", config.server.host, config.server.port);
    let services = Services::open(config)?;
    services.bootstrap()?;

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server running on {address}");

    axum::serve(listener, shiptrack_server::app(services))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
