//! HTTP handlers for the theme endpoints and the event stream.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use shopfront_events::Subscription;
use shopfront_protocol::{ArchiveName, ErrorBody, ExportResponse, TASK_ID_HEADER, TaskId};
use shopfront_theme::{ThemeService, UploadReceiver};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub theme: Arc<ThemeService>,
    pub cancel: CancellationToken,
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/theme/export", post(export_theme))
        .route("/theme/install", post(install_theme))
        .route("/events", get(events))
        .route("/{file}", get(download_archive))
        .with_state(state)
}

/// Failed request: status plus `{error: true, message}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn internal(err: &impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody::from_error(err),
        }
    }

    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::new(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// `POST /theme/export`
async fn export_theme(State(state): State<AppState>) -> Result<Json<ExportResponse>, ApiError> {
    let archive = state
        .theme
        .export_theme()
        .await
        .map_err(|e| ApiError::internal(&e))?;
    Ok(Json(ExportResponse::for_archive(archive.name())))
}

/// `POST /theme/install`
///
/// Answers 200 with an empty body once the upload is stored; the install
/// outcome only reaches `/events` subscribers.
async fn install_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let boundary = UploadReceiver::boundary(content_type).map_err(|e| ApiError::internal(&e))?;

    let ticket = state
        .theme
        .install_theme(body.into_data_stream(), boundary)
        .await
        .map_err(|e| ApiError::internal(&e))?;

    Ok((StatusCode::OK, [(TASK_ID_HEADER, ticket.task_id.to_string())]))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    task: Option<String>,
}

/// `GET /events[?task=<id>]` (WebSocket)
async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let subscription = match query.task.as_deref() {
        Some(raw) => {
            let task_id: TaskId = raw
                .parse()
                .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid task id: {e}")))?;
            state.theme.bus().subscribe_task(task_id)
        }
        None => state.theme.bus().subscribe(),
    };
    tracing::debug!(
        subscribers = state.theme.bus().subscriber_count(),
        "event stream requested"
    );

    let cancel = state.cancel.clone();
    Ok(ws.on_upgrade(move |socket| forward_events(socket, subscription, cancel)))
}

/// Pushes bus events to one WebSocket client until either side goes away.
async fn forward_events(mut socket: WebSocket, mut subscription: Subscription, cancel: CancellationToken) {
    tracing::debug!(task = ?subscription.task_filter(), "event subscriber connected");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = socket.send(WsMessage::Close(None)).await;
                break;
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("failed to encode event: {e}");
                        continue;
                    }
                };
                if socket.send(WsMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("event subscriber disconnected");
}

/// `GET /<name>.zip`: serves an exported archive.
async fn download_archive(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::new(StatusCode::NOT_FOUND, format!("no such archive: {file}"));
    let name = ArchiveName::parse(file.as_str()).map_err(|_| not_found())?;
    let path = state.theme.settings().export_dir.join(name.as_str());

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            tracing::error!(path = %path.display(), "failed to read archive: {e}");
            return Err(ApiError::internal(&e));
        }
    };

    Ok(([(header::CONTENT_TYPE, "application/zip")], bytes).into_response())
}
