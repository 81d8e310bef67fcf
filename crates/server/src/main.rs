use clap::Parser;
use serverstat_common::logging::init_logging;
use serverstat_common::signal::shutdown_signal;
use serverstat_common::version::VERSION;
use serverstat_common::{PgStatusStore, StatusStore, StoreSettings};
use serverstat_server::templates::load_templates;
use serverstat_server::{create_router, AppState};
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about = "Serves recently recorded probe results", long_about = None)]
struct Args {
    /// Path to the settings file
    #[arg(short, long, default_value = "settings.yaml")]
    config: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Directory served under /assets/
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Directory for the rolling JSON log files
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    init_logging(&args.log_dir, "server.log");
    info!(version = VERSION, "Starting status server...");

    let store_settings = match StoreSettings::load(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            error!(path = ?args.config, error = %e, "Failed to load settings.");
            return Err(e.into());
        }
    };

    let store = match PgStatusStore::connect(&store_settings).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "Failed to connect to the status database.");
            return Err(e.into());
        }
    };

    let templates = load_templates()?;
    let app_state = Arc::new(AppState {
        store: store.clone(),
        templates: Arc::new(templates),
    });
    let app = create_router(app_state, &args.assets);

    let addr = args.listen;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    info!(address = %addr, assets = ?args.assets, "Server started OK");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Status server stopped.");
    Ok(())
}
