// WebSocket server: one publish session per connected client, plus camera control endpoints

use super::{ChannelTransport, TransportEvent, TransportResult};
use crate::core::session::{spawn_session, SessionContext};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

/// Outbound messages buffered per client. A slow socket holds back the publish
/// loop after one frame, so stale frames are never queued behind it.
const OUTBOUND_QUEUE: usize = 1;

/// Shared state backing HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<SessionContext>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws/pose-stream/:visit_id", get(pose_stream))
        .route("/api/camera/status", get(camera_status))
        .route("/api/camera/start", post(start_camera))
        .route("/api/camera/stop", post(stop_camera))
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(address: &str, state: AppState, shutdown: F) -> TransportResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn pose_stream(
    ws: WebSocketUpgrade,
    Path(visit_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, visit_id, state))
}

/// Pump the session's channel into the socket until either side ends
async fn handle_socket(mut socket: WebSocket, visit_id: String, state: AppState) {
    tracing::info!("WebSocket connected for visit {}", visit_id);

    let (transport, mut outbound) = ChannelTransport::new(OUTBOUND_QUEUE);
    let handle = spawn_session(&state.ctx, visit_id.clone(), Box::new(transport));

    loop {
        tokio::select! {
            event = outbound.recv() => match event {
                Some(TransportEvent::Text(text)) => {
                    if let Err(e) = socket.send(Message::Text(text)).await {
                        tracing::debug!("Visit {}: socket send failed: {}", visit_id, e);
                        break;
                    }
                }
                Some(TransportEvent::Closed) | None => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!("Visit {}: socket receive failed: {}", visit_id, e);
                    break;
                }
                // Client messages carry no meaning for the stream
                Some(Ok(_)) => {}
            },
        }
    }

    handle.cancel();
    drop(outbound);
    match handle.join().await {
        Ok(report) => tracing::info!(
            "WebSocket disconnected for visit {} ({} frames published)",
            visit_id,
            report.frames_published
        ),
        Err(e) => tracing::error!("Session for visit {} ended abnormally: {}", visit_id, e),
    }
}

async fn camera_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "status": state.ctx.source.status() }))
}

async fn start_camera(State(state): State<AppState>) -> Response {
    match state.ctx.source.start().await {
        Ok(()) => Json(json!({ "success": true, "message": "Camera started" })).into_response(),
        Err(e) => {
            tracing::error!("Camera start failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn stop_camera(State(state): State<AppState>) -> Response {
    match state.ctx.source.stop().await {
        Ok(()) => Json(json!({ "success": true, "message": "Camera stopped" })).into_response(),
        Err(e) => {
            tracing::error!("Camera stop failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StreamConfig;
    use crate::platform::transport::StreamTransport;
    use crate::platform::capture::SyntheticFrameSource;
    use crate::platform::pose::{DefaultMediaPipe, InferenceBridge};

    fn state() -> AppState {
        let ctx = SessionContext::new(
            Arc::new(SyntheticFrameSource::new(64, 48, 30)),
            Arc::new(DefaultMediaPipe::new(&Default::default()).unwrap()),
            StreamConfig::default(),
        );
        AppState { ctx: Arc::new(ctx) }
    }

    #[tokio::test]
    async fn test_camera_endpoints_toggle_source() {
        let state = state();

        let Json(status) = camera_status(State(state.clone())).await;
        assert_eq!(status["success"], true);
        assert_eq!(status["status"]["is_streaming"], false);
        assert_eq!(status["status"]["width"], 64);

        let response = start_camera(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let Json(status) = camera_status(State(state.clone())).await;
        assert_eq!(status["status"]["is_streaming"], true);

        let response = stop_camera(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!state.ctx.source.status().is_streaming);
    }

    #[tokio::test]
    async fn test_slow_socket_holds_at_most_one_frame() {
        let (mut transport, mut outbound) = ChannelTransport::new(OUTBOUND_QUEUE);
        transport.send_text("first".to_string()).await.unwrap();

        let second = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            transport.send_text("second".to_string()),
        )
        .await;
        assert!(second.is_err(), "second frame should wait for the socket");

        assert_eq!(outbound.recv().await, Some(TransportEvent::Text("first".to_string())));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let result = serve("127.0.0.1:0", state(), async {}).await;
        assert!(result.is_ok());
    }
}
