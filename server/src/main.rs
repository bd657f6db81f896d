//! API Server Binary Entry Point

use docform_server::{logging, start_server, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = docform::config::load_from_env()?;
    logging::init_logging(config.log_format)?;

    log::info!("Starting docform server v{}", env!("CARGO_PKG_VERSION"));
    log::info!(
        "Uploads in {}, outputs in {}",
        config.upload_root().display(),
        config.output_root().display()
    );

    let state = AppState::from_config(&config)?;

    match config.retention() {
        Some(retention) => {
            let removed = state.storage.cleanup_expired(retention);
            log::info!(
                "Startup cleanup removed {} job directories older than {} hours",
                removed,
                config.retention_hours
            );
        }
        None => log::info!("Startup cleanup disabled"),
    }

    start_server(&config.bind_address, state).await?;

    log::info!("Server stopped");
    Ok(())
}
