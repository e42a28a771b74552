//! Storefront theme service entry point.

mod app;
mod config;
mod routes;
mod server;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting shopfront theme service"
    );

    let config = config::Config::load()?;
    tracing::info!(
        upload_dir = %config.files_upload_path.display(),
        export_dir = %config.export_dir.display(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("service shut down cleanly");
    Ok(())
}
