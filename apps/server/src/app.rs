//! Wires the event bus, command runner, theme pipeline and HTTP server.

use std::sync::Arc;

use shopfront_events::EventBus;
use shopfront_runner::ProcessRunner;
use shopfront_theme::ThemeService;

use crate::config::Config;
use crate::server::ThemeServer;

/// Runs the service until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;

    let bus = EventBus::new(config.event_buffer.max(1));
    let theme = Arc::new(ThemeService::new(
        config.theme_settings(),
        Arc::new(ProcessRunner::new()),
        bus,
    ));

    let server = ThemeServer::new(addr, Arc::clone(&theme));
    let server_run = Arc::clone(&server);
    let mut server_task = tokio::spawn(async move { server_run.run().await });

    tokio::select! {
        result = &mut server_task => {
            // Server stopped on its own: bind failure or fatal I/O error.
            theme.shutdown().await;
            return Ok(result??);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
        }
    }

    server.shutdown();
    theme.shutdown().await;
    server_task.await??;
    Ok(())
}
