//! Web application router and middleware setup.

use crate::error::Result;
use crate::panel::Panel;
use crate::web::config::WebConfig;
use crate::web::handlers::{self, AppState};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the main axum application with all routes and middleware.
pub async fn create_app(config: WebConfig, panel: Arc<Panel>) -> Result<Router> {
    let mut app = Router::new()
        .route("/", get(handlers::index))
        .route("/config", get(handlers::config_page))
        .route("/help", get(handlers::help_page))
        .route("/video_feed", get(handlers::video_feed))
        // API routes
        .route("/api/status", get(handlers::get_status))
        .route("/api/health", get(handlers::health_check))
        .route("/:box_name/:action", get(handlers::relay_action));

    // Add static file serving if path is configured
    match (config.static_dir(), &config.static_path) {
        (Some(dir), _) => {
            info!("Serving static files from: {:?}", dir);
            app = app.nest_service("/static", ServeDir::new(dir));
        }
        (None, Some(missing)) => {
            warn!(
                "Static path {:?} does not exist, pages will render unstyled",
                missing
            );
        }
        (None, None) => {}
    }

    let cors_enabled = config.enable_cors;
    let mut app = app.with_state(AppState::new(panel, config));

    // Add CORS if enabled
    if cors_enabled {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    // Add middleware layers
    app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use futures_util::StreamExt;
    use tower::ServiceExt;

    async fn app(config: WebConfig) -> (Router, Arc<Panel>) {
        let panel = Arc::new(Panel::simulated().unwrap());
        let app = create_app(config.with_static_path(None), Arc::clone(&panel))
            .await
            .unwrap();
        (app, panel)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_create_app() {
        let panel = Arc::new(Panel::simulated().unwrap());
        let app = create_app(WebConfig::default(), panel).await;
        assert!(app.is_ok());
    }

    #[tokio::test]
    async fn test_switching_light_is_reflected_on_index() {
        let (app, _) = app(WebConfig::default()).await;

        let (status, body) = get(&app, "/lightleft/on").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, body) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"id="relay-lightleft" data-state="LOW""#));
        assert!(body.contains(r#"id="relay-lightright" data-state="HIGH""#));

        get(&app, "/lightleft/off").await;
        let (_, body) = get(&app, "/").await;
        assert!(body.contains(r#"id="relay-lightleft" data-state="HIGH""#));
    }

    #[tokio::test]
    async fn test_strict_routes_reject_unknown_parameters() {
        let (app, panel) = app(WebConfig::default().with_strict_routes(true)).await;
        let before = panel.relays().states().await.unwrap();

        let (status, _) = get(&app, "/lightmiddle/on").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(&app, "/lightleft/blink").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(panel.relays().states().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_unknown_parameters_are_ignored_by_default() {
        let (app, panel) = app(WebConfig::default()).await;
        let before = panel.relays().states().await.unwrap();

        let (status, body) = get(&app, "/lightmiddle/on").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, body) = get(&app, "/lightleft/blink").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        assert_eq!(panel.relays().states().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_static_pages() {
        let (app, _) = app(WebConfig::default()).await;

        let (status, body) = get(&app, "/config").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("GPIO 23"));

        let (status, body) = get(&app, "/help").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/video_feed"));
    }

    #[tokio::test]
    async fn test_status_api() {
        let (app, _) = app(WebConfig::default()).await;
        get(&app, "/lightright/on").await;

        let (status, body) = get(&app, "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["reading"]["relay1_state"], "HIGH");
        assert_eq!(json["reading"]["relay2_state"], "LOW");
        assert_eq!(json["camera"], "uninitialized");
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = app(WebConfig::default()).await;
        let (status, body) = get(&app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn test_video_feed_streams_jpeg_parts() {
        let (app, panel) = app(WebConfig::default()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/video_feed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "multipart/x-mixed-replace; boundary=frame"
        );

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert!(first.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));

        panel.begin_shutdown();
        while body.next().await.is_some() {}
        panel.shutdown().await;
        assert_eq!(
            panel.camera().state().await,
            crate::panel::CameraState::Stopped
        );
    }
}
