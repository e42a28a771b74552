//! HTTP server for the theme endpoints.
//!
//! Binds a TCP listener and serves the [`routes`](crate::routes) router
//! until [`ThemeServer::shutdown`] is called.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use shopfront_theme::ThemeService;

use crate::routes::{self, AppState};

/// Errors from running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The theme HTTP server.
pub struct ThemeServer {
    addr: SocketAddr,
    theme: Arc<ThemeService>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl ThemeServer {
    /// Creates a server that will listen on `addr` (port 0 = OS-assigned).
    pub fn new(addr: SocketAddr, theme: Arc<ThemeService>) -> Arc<Self> {
        Arc::new(Self {
            addr,
            theme,
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        })
    }

    /// Returns the local address the server is listening on.
    ///
    /// Only available after [`run`](Self::run) binds the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    /// Stops accepting requests and closes open event streams.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs the server until cancellation.
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr).await?;

        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        tracing::info!("theme server listening on {local_addr}");

        let app = routes::router(AppState {
            theme: Arc::clone(&self.theme),
            cancel: self.cancel.clone(),
        });

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.clone().cancelled_owned())
            .await?;

        tracing::info!("server shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;
    use shopfront_events::EventBus;
    use shopfront_protocol::{TaskId, ThemeInstalled};
    use shopfront_runner::ProcessRunner;
    use shopfront_theme::ThemeSettings;

    use super::*;

    fn test_server() -> Arc<ThemeServer> {
        let theme = ThemeService::new(
            ThemeSettings::default(),
            Arc::new(ProcessRunner),
            EventBus::new(8),
        );
        ThemeServer::new(([127, 0, 0, 1], 0).into(), Arc::new(theme))
    }

    async fn start(server: &Arc<ThemeServer>) -> (u16, tokio::task::JoinHandle<()>) {
        let server2 = Arc::clone(server);
        let handle = tokio::spawn(async move {
            server2.run().await.unwrap();
        });

        // Wait for the server to bind.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let port = server.port().await;
        assert!(port > 0, "should have bound to a dynamic port");
        (port, handle)
    }

    #[tokio::test]
    async fn server_binds_dynamic_port() {
        let server = test_server();
        assert!(server.local_addr().await.is_none());

        let (_port, handle) = start(&server).await;
        assert!(server.local_addr().await.is_some());

        server.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn events_stream_pushes_notifications() {
        let server = test_server();
        let (port, handle) = start(&server).await;

        let url = format!("ws://127.0.0.1:{port}/events");
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        let task_id = TaskId::new();
        server.theme.bus().publish(ThemeInstalled::succeeded(task_id));

        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        assert_eq!(json["type"], "THEME_INSTALLED");
        assert_eq!(json["success"], true);
        assert_eq!(json["taskId"], task_id.to_string());

        server.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn task_stream_skips_other_tasks() {
        let server = test_server();
        let (port, handle) = start(&server).await;

        let mine = TaskId::new();
        let url = format!("ws://127.0.0.1:{port}/events?task={mine}");
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        let bus = server.theme.bus();
        bus.publish(ThemeInstalled::failed(TaskId::new(), "someone else"));
        bus.publish(ThemeInstalled::failed(mine, "install script crashed"));

        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        assert_eq!(json["taskId"], mine.to_string());
        assert_eq!(json["message"], "install script crashed");

        server.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_task_filter_is_rejected() {
        let server = test_server();
        let (port, handle) = start(&server).await;

        let url = format!("ws://127.0.0.1:{port}/events?task=not-a-uuid");
        assert!(tokio_tungstenite::connect_async(&url).await.is_err());

        server.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_closes_event_streams() {
        let server = test_server();
        let (port, handle) = start(&server).await;

        let url = format!("ws://127.0.0.1:{port}/events");
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        server.shutdown();

        // The stream ends with a close frame (or just ends).
        let next = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap();
        match next {
            Some(Ok(msg)) => assert!(msg.is_close(), "unexpected frame: {msg:?}"),
            Some(Err(_)) | None => {}
        }

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
