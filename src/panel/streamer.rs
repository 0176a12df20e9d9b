//! Live camera feed as a multipart JPEG stream.
//!
//! The camera moves through `Uninitialized -> Active -> Stopped` and never
//! goes back. It is opened by the first stream request and shared by every
//! later one; each capture holds the camera lock, so concurrent viewers
//! get whole frames in turn.

use crate::error::{PanelError, Result};
use crate::hardware::{CameraConfig, CameraDevice};
use axum::body::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Boundary token separating frames in the multipart response.
pub const FRAME_BOUNDARY: &str = "frame";

/// `Content-Type` of the video feed response.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Lifecycle of the shared camera.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    Uninitialized,
    Active,
    Stopped,
}

/// Creates a camera device; called at most once per successful start.
pub type CameraFactory = dyn Fn() -> Result<Box<dyn CameraDevice>> + Send + Sync;

struct CameraSlot {
    state: CameraState,
    device: Option<Box<dyn CameraDevice>>,
}

/// Owns the shared camera and produces frame streams from it.
pub struct CameraStreamer {
    open: Arc<CameraFactory>,
    config: CameraConfig,
    slot: Arc<Mutex<CameraSlot>>,
    closing: Arc<AtomicBool>,
}

/// Wrap one JPEG image as a multipart part.
pub fn frame_part(jpeg: &[u8]) -> Bytes {
    let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", FRAME_BOUNDARY);
    let mut part = Vec::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

impl CameraStreamer {
    pub fn new<F>(open: F, config: CameraConfig) -> Self
    where
        F: Fn() -> Result<Box<dyn CameraDevice>> + Send + Sync + 'static,
    {
        Self {
            open: Arc::new(open),
            config,
            slot: Arc::new(Mutex::new(CameraSlot {
                state: CameraState::Uninitialized,
                device: None,
            })),
            closing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub async fn state(&self) -> CameraState {
        self.slot.lock().await.state
    }

    /// Open, configure and start the camera unless that already happened.
    ///
    /// A failed start leaves the camera uninitialized so a later request
    /// tries again. Once stopped, the camera cannot be restarted.
    pub async fn initialize(&self) -> Result<()> {
        let slot = Arc::clone(&self.slot);
        let open = Arc::clone(&self.open);
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || {
            let mut slot = slot.blocking_lock();
            match slot.state {
                CameraState::Active => return Ok(()),
                CameraState::Stopped => return Err(PanelError::CameraStopped),
                CameraState::Uninitialized => {}
            }

            let mut device = open()?;
            let started = device
                .configure(&config)
                .and_then(|_| device.start());
            if let Err(e) = started {
                device.close();
                return Err(e);
            }

            slot.device = Some(device);
            slot.state = CameraState::Active;
            info!(
                "Camera started at {}x{}",
                config.resolution.width, config.resolution.height
            );
            Ok(())
        })
        .await
        .map_err(|e| PanelError::system_error(format!("Camera task failed: {}", e)))?
    }

    /// Endless stream of multipart frame parts.
    ///
    /// The stream ends after yielding the first capture error, when the
    /// panel begins shutting down, or when the consumer drops it.
    pub fn frames(&self) -> BoxStream<'static, Result<Bytes>> {
        let slot = Arc::clone(&self.slot);
        let closing = Arc::clone(&self.closing);

        stream::unfold(true, move |live| {
            let slot = Arc::clone(&slot);
            let closing = Arc::clone(&closing);
            async move {
                if !live || closing.load(Ordering::SeqCst) {
                    return None;
                }

                match capture(slot).await {
                    Ok(jpeg) => Some((Ok(frame_part(&jpeg)), true)),
                    Err(e) => {
                        warn!("Frame capture failed, ending stream: {}", e);
                        Some((Err(e), false))
                    }
                }
            }
        })
        .boxed()
    }

    /// Make every open frame stream finish at its next frame boundary.
    pub fn begin_shutdown(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// Stop and release the camera if it was started.
    ///
    /// Only the first call has any effect; the camera is stopped and
    /// closed at most once.
    pub async fn shutdown(&self) -> Result<()> {
        self.begin_shutdown();
        let slot = Arc::clone(&self.slot);

        tokio::task::spawn_blocking(move || {
            let mut slot = slot.blocking_lock();
            let previous = std::mem::replace(&mut slot.state, CameraState::Stopped);

            let Some(mut device) = slot.device.take() else {
                debug!("Camera shutdown with nothing to release ({:?})", previous);
                return Ok(());
            };

            let stopped = device.stop();
            device.close();
            info!("Camera stopped");
            stopped
        })
        .await
        .map_err(|e| PanelError::system_error(format!("Camera task failed: {}", e)))?
    }
}

async fn capture(slot: Arc<Mutex<CameraSlot>>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let mut guard = slot.blocking_lock();
        let slot = &mut *guard;
        match slot.device.as_mut() {
            Some(device) => device.capture_frame(),
            None if slot.state == CameraState::Stopped => Err(PanelError::CameraStopped),
            None => Err(PanelError::CameraNotActive),
        }
    })
    .await
    .map_err(|e| PanelError::system_error(format!("Camera task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{CameraProbe, MockCamera};

    fn streamer_with(probe: Arc<CameraProbe>) -> CameraStreamer {
        CameraStreamer::new(
            move || Ok(Box::new(MockCamera::with_probe(Arc::clone(&probe))) as Box<dyn CameraDevice>),
            CameraConfig::default(),
        )
    }

    #[test]
    fn test_frame_part_layout() {
        let part = frame_part(b"JPEG");
        assert_eq!(
            &part[..],
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n"
        );
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let probe = Arc::new(CameraProbe::default());
        let streamer = streamer_with(Arc::clone(&probe));
        assert_eq!(streamer.state().await, CameraState::Uninitialized);

        streamer.initialize().await.unwrap();
        streamer.initialize().await.unwrap();

        assert_eq!(streamer.state().await, CameraState::Active);
        assert_eq!(CameraProbe::count(&probe.configures), 1);
        assert_eq!(CameraProbe::count(&probe.starts), 1);
    }

    #[tokio::test]
    async fn test_frames_yield_multipart_parts() {
        let probe = Arc::new(CameraProbe::default());
        let streamer = streamer_with(Arc::clone(&probe));
        streamer.initialize().await.unwrap();

        let parts: Vec<_> = streamer.frames().take(3).collect().await;
        assert_eq!(parts.len(), 3);
        for part in parts {
            let part = part.unwrap();
            assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
            assert!(part.ends_with(b"\xff\xd9\r\n"));
        }
        assert_eq!(CameraProbe::count(&probe.captures), 3);
    }

    #[tokio::test]
    async fn test_capture_error_ends_stream_but_keeps_camera() {
        let probe = Arc::new(CameraProbe::default());
        let factory_probe = Arc::clone(&probe);
        let streamer = CameraStreamer::new(
            move || {
                Ok(Box::new(MockCamera::with_probe(Arc::clone(&factory_probe)).failing_after(2))
                    as Box<dyn CameraDevice>)
            },
            CameraConfig::default(),
        );
        streamer.initialize().await.unwrap();

        let parts: Vec<_> = streamer.frames().collect().await;
        assert_eq!(parts.len(), 3);
        assert!(parts[0].is_ok() && parts[1].is_ok());
        assert!(matches!(parts[2], Err(PanelError::Camera(_))));
        assert_eq!(streamer.state().await, CameraState::Active);
    }

    #[tokio::test]
    async fn test_frames_before_initialize_fail() {
        let streamer = streamer_with(Arc::new(CameraProbe::default()));
        let parts: Vec<_> = streamer.frames().collect().await;
        assert_eq!(parts.len(), 1);
        assert!(matches!(parts[0], Err(PanelError::CameraNotActive)));
    }

    #[tokio::test]
    async fn test_failed_start_can_be_retried() {
        let probe = Arc::new(CameraProbe::default());
        let factory_probe = Arc::clone(&probe);
        let attempts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let factory_attempts = Arc::clone(&attempts);
        let streamer = CameraStreamer::new(
            move || {
                let camera = MockCamera::with_probe(Arc::clone(&factory_probe));
                let camera = if factory_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    camera.failing_start()
                } else {
                    camera
                };
                Ok(Box::new(camera) as Box<dyn CameraDevice>)
            },
            CameraConfig::default(),
        );

        assert!(streamer.initialize().await.is_err());
        assert_eq!(streamer.state().await, CameraState::Uninitialized);
        assert_eq!(CameraProbe::count(&probe.closes), 1);

        streamer.initialize().await.unwrap();
        assert_eq!(streamer.state().await, CameraState::Active);
    }

    #[tokio::test]
    async fn test_shutdown_without_camera_is_noop() {
        let probe = Arc::new(CameraProbe::default());
        let streamer = streamer_with(Arc::clone(&probe));

        streamer.shutdown().await.unwrap();
        assert_eq!(streamer.state().await, CameraState::Stopped);
        assert_eq!(CameraProbe::count(&probe.stops), 0);
        assert_eq!(CameraProbe::count(&probe.closes), 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_camera_once() {
        let probe = Arc::new(CameraProbe::default());
        let streamer = streamer_with(Arc::clone(&probe));
        streamer.initialize().await.unwrap();

        streamer.shutdown().await.unwrap();
        streamer.shutdown().await.unwrap();

        assert_eq!(CameraProbe::count(&probe.stops), 1);
        assert_eq!(CameraProbe::count(&probe.closes), 1);
        assert!(!probe.is_running());
        assert!(matches!(
            streamer.initialize().await,
            Err(PanelError::CameraStopped)
        ));
    }

    #[tokio::test]
    async fn test_begin_shutdown_ends_open_streams() {
        let streamer = streamer_with(Arc::new(CameraProbe::default()));
        streamer.initialize().await.unwrap();

        let mut frames = streamer.frames();
        assert!(frames.next().await.unwrap().is_ok());
        streamer.begin_shutdown();
        assert!(frames.next().await.is_none());
    }
}
