//! HTTP handlers for the panel routes.

use crate::error::PanelError;
use crate::panel::{streamer::STREAM_CONTENT_TYPE, Panel, RelayOutcome};
use crate::web::config::WebConfig;
use crate::web::templates::{ConfigTemplate, HelpTemplate, IndexTemplate};
use askama::Template;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use futures_util::StreamExt;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub panel: Arc<Panel>,
    pub config: Arc<WebConfig>,
}

impl AppState {
    pub fn new(panel: Arc<Panel>, config: WebConfig) -> Self {
        Self {
            panel,
            config: Arc::new(config),
        }
    }
}

/// Status code for a failed panel operation.
fn status_for(err: &PanelError) -> StatusCode {
    match err {
        PanelError::SensorTimeout { .. }
        | PanelError::Camera(_)
        | PanelError::CameraStopped
        | PanelError::CameraNotActive => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn render<T: Template>(template: &T) -> Result<Html<String>, StatusCode> {
    template.render().map(Html).map_err(|e| {
        error!("Failed to render page: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Status page: current climate reading and light states.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let reading = state.panel.read_sensor().await.map_err(|e| {
        error!("Failed to read sensor: {}", e);
        status_for(&e)
    })?;

    render(&IndexTemplate::new(&reading))
}

/// Switch a light. Answers with an empty body.
pub async fn relay_action(
    State(state): State<AppState>,
    Path((box_name, action)): Path<(String, String)>,
) -> Result<&'static str, StatusCode> {
    let outcome = state
        .panel
        .set_relay(&box_name, &action)
        .await
        .map_err(|e| {
            error!("Failed to switch {}: {}", box_name, e);
            status_for(&e)
        })?;

    match outcome {
        RelayOutcome::Applied(name, action) => {
            info!("{} switched {}", name, action.as_str());
            Ok("")
        }
        RelayOutcome::UnknownBox if state.config.strict_routes => {
            warn!("Rejected action for unknown box '{}'", box_name);
            Err(StatusCode::NOT_FOUND)
        }
        RelayOutcome::UnknownAction if state.config.strict_routes => {
            warn!("Rejected unknown action '{}' for {}", action, box_name);
            Err(StatusCode::BAD_REQUEST)
        }
        RelayOutcome::UnknownBox | RelayOutcome::UnknownAction => {
            debug!("Ignored relay route /{}/{}", box_name, action);
            Ok("")
        }
    }
}

/// Static wiring overview.
pub async fn config_page(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    render(&ConfigTemplate::new(state.panel.camera().config()))
}

/// Static help page.
pub async fn help_page() -> Result<Html<String>, StatusCode> {
    render(&HelpTemplate)
}

/// Logs when a viewer's frame stream is dropped.
struct StreamLog(uuid::Uuid);

impl Drop for StreamLog {
    fn drop(&mut self) {
        info!("Video stream {} closed", self.0);
    }
}

/// Live camera feed as `multipart/x-mixed-replace`.
pub async fn video_feed(State(state): State<AppState>) -> Response {
    let stream_id = uuid::Uuid::new_v4();

    match state.panel.video_stream().await {
        Ok(frames) => {
            info!("Video stream {} opened", stream_id);
            let log = StreamLog(stream_id);
            let frames = frames.map(move |frame| {
                let _keep = &log;
                frame
            });
            let headers = [
                (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-cache, no-store"),
            ];
            (headers, Body::from_stream(frames)).into_response()
        }
        Err(e) => {
            error!("Video stream {} could not start: {}", stream_id, e);
            status_for(&e).into_response()
        }
    }
}

/// Current reading and camera state as JSON.
pub async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let reading = state.panel.read_sensor().await.map_err(|e| {
        error!("Failed to read sensor: {}", e);
        status_for(&e)
    })?;
    let camera = state.panel.camera().state().await;

    Ok(Json(json!({
        "reading": reading,
        "camera": camera,
    })))
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "boxpanel",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
