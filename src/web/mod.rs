//! Web server for the panel.
//!
//! Serves the status page, relay switch routes, the static pages and the
//! live camera feed, plus a small JSON API.

pub mod config;
pub mod handlers;
pub mod router;
pub mod templates;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::error::{PanelError, Result};
use crate::panel::Panel;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Start the web server and run until Ctrl-C or SIGTERM.
pub async fn start_web_server(config: WebConfig, panel: Arc<Panel>) -> Result<()> {
    serve_until(config, panel, shutdown_signal()).await
}

/// Run the web server until `signal` resolves.
///
/// On the way out open video streams are ended and the panel hardware is
/// released, whether the server stopped cleanly or never got to listen.
pub async fn serve_until<F>(config: WebConfig, panel: Arc<Panel>, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = serve(config, Arc::clone(&panel), signal).await;
    panel.shutdown().await;
    info!("Web server stopped");
    served
}

async fn serve<F>(config: WebConfig, panel: Arc<Panel>, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let app = create_app(config, Arc::clone(&panel)).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PanelError::web_server_error(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Starting panel web server on http://{}", addr);
    info!("Video feed available at http://{}/video_feed", addr);
    info!("API endpoint: http://{}/api/status", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            panel.begin_shutdown();
        })
        .await
        .map_err(|e| PanelError::web_server_error(format!("Server error: {}", e)))
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn panel() -> Arc<Panel> {
        Arc::new(Panel::simulated().unwrap())
    }

    #[tokio::test]
    async fn test_invalid_address_still_releases_hardware() {
        let panel = panel();

        let err = start_web_server(WebConfig::new("not-an-addr", 0), Arc::clone(&panel))
            .await
            .unwrap_err();

        assert!(matches!(err, PanelError::Config(_)));
        assert!(panel.is_shut_down());
    }

    #[tokio::test]
    async fn test_port_in_use_still_releases_hardware() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let panel = panel();

        let config = WebConfig::new("127.0.0.1", port).with_static_path(None);
        let err = start_web_server(config, Arc::clone(&panel)).await.unwrap_err();

        assert!(matches!(err, PanelError::WebServer(_)));
        assert!(panel.is_shut_down());
    }

    #[tokio::test]
    async fn test_signal_stops_server_and_releases_hardware() {
        let panel = panel();
        let (stop, stopped) = oneshot::channel::<()>();
        let config = WebConfig::new("127.0.0.1", 0).with_static_path(None);

        let server = tokio::spawn(serve_until(config, Arc::clone(&panel), async move {
            let _ = stopped.await;
        }));
        stop.send(()).unwrap();

        server.await.unwrap().unwrap();
        assert!(panel.is_shut_down());
        assert_eq!(
            panel.camera().state().await,
            crate::panel::CameraState::Stopped
        );
    }
}
