//! Camera capability and the `rpicam-vid` backend.

use crate::error::Result;
use serde::{Deserialize, Serialize};

const SOI: [u8; 2] = [0xff, 0xd8];
const EOI: [u8; 2] = [0xff, 0xd9];

/// Drop buffered data past this size when no frame boundary shows up.
const MAX_BUFFERED_BYTES: usize = 8 * 1024 * 1024;

/// Capture resolution in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Image orientation applied by the camera pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transform {
    pub hflip: bool,
    pub vflip: bool,
}

/// Video configuration handed to [`CameraDevice::configure`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraConfig {
    pub resolution: Resolution,
    pub transform: Transform,
}

impl Default for CameraConfig {
    /// The camera is mounted upside down, so both flips are on.
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: crate::CAMERA_WIDTH,
                height: crate::CAMERA_HEIGHT,
            },
            transform: Transform {
                hflip: true,
                vflip: true,
            },
        }
    }
}

/// Trait for video capture devices.
///
/// All calls block; async callers run them on the blocking pool.
pub trait CameraDevice: Send {
    fn configure(&mut self, config: &CameraConfig) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Release the device. Must be safe after `stop` or without `start`.
    fn close(&mut self);

    /// Capture one frame, JPEG encoded.
    fn capture_frame(&mut self) -> Result<Vec<u8>>;
}

/// Splits a concatenated MJPEG byte stream into single JPEG images.
#[derive(Debug, Default)]
pub struct MjpegSplitter {
    buffer: Vec<u8>,
}

impl MjpegSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_BUFFERED_BYTES {
            tracing::warn!(
                "Discarding {} buffered camera bytes without a frame boundary",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    /// Take the next complete JPEG out of the buffer, if there is one.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let start = find_marker(&self.buffer, SOI, 0)?;
        if start > 0 {
            self.buffer.drain(..start);
        }

        let end = find_marker(&self.buffer, EOI, SOI.len())? + EOI.len();
        Some(self.buffer.drain(..end).collect())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(2)
        .position(|window| window == marker)
        .map(|pos| pos + from)
}

#[cfg(feature = "rpicam")]
mod rpicam {
    use super::*;
    use crate::error::PanelError;
    use std::io::Read;
    use std::process::{Child, ChildStdout, Command, Stdio};
    use tracing::{debug, warn};

    const READ_CHUNK: usize = 64 * 1024;

    /// Raspberry Pi camera driven through an `rpicam-vid` MJPEG pipe.
    pub struct RpiCamera {
        program: String,
        config: Option<CameraConfig>,
        child: Option<Child>,
        stdout: Option<ChildStdout>,
        splitter: MjpegSplitter,
    }

    impl RpiCamera {
        pub fn new() -> Self {
            Self::with_program(crate::RPICAM_PROGRAM)
        }

        pub fn with_program(program: impl Into<String>) -> Self {
            Self {
                program: program.into(),
                config: None,
                child: None,
                stdout: None,
                splitter: MjpegSplitter::new(),
            }
        }

        fn build_command(&self, config: &CameraConfig) -> Command {
            let mut command = Command::new(&self.program);
            command
                .args(["--timeout", "0", "--nopreview", "--codec", "mjpeg"])
                .arg("--width")
                .arg(config.resolution.width.to_string())
                .arg("--height")
                .arg(config.resolution.height.to_string());
            if config.transform.hflip {
                command.arg("--hflip");
            }
            if config.transform.vflip {
                command.arg("--vflip");
            }
            command
                .args(["--output", "-"])
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null());
            command
        }
    }

    impl Default for RpiCamera {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CameraDevice for RpiCamera {
        fn configure(&mut self, config: &CameraConfig) -> Result<()> {
            if self.child.is_some() {
                return Err(PanelError::camera_error(
                    "Cannot reconfigure a running camera",
                ));
            }
            self.config = Some(config.clone());
            Ok(())
        }

        fn start(&mut self) -> Result<()> {
            if self.child.is_some() {
                return Ok(());
            }
            let config = self
                .config
                .clone()
                .ok_or_else(|| PanelError::camera_error("Camera started before configure"))?;

            let mut child = self.build_command(&config).spawn().map_err(|e| {
                PanelError::camera_error(format!("Failed to launch {}: {}", self.program, e))
            })?;
            self.stdout = child.stdout.take();
            self.child = Some(child);
            debug!("{} started", self.program);
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.stdout = None;
            if let Some(mut child) = self.child.take() {
                if let Err(e) = child.kill() {
                    warn!("Failed to signal {}: {}", self.program, e);
                }
                child.wait()?;
                debug!("{} stopped", self.program);
            }
            Ok(())
        }

        fn close(&mut self) {
            if let Err(e) = self.stop() {
                warn!("Camera stop during close failed: {}", e);
            }
            self.config = None;
            self.splitter = MjpegSplitter::new();
        }

        fn capture_frame(&mut self) -> Result<Vec<u8>> {
            let stdout = self
                .stdout
                .as_mut()
                .ok_or_else(|| PanelError::camera_error("Camera is not running"))?;

            let mut chunk = vec![0u8; READ_CHUNK];
            loop {
                if let Some(frame) = self.splitter.next_frame() {
                    return Ok(frame);
                }
                let read = stdout.read(&mut chunk)?;
                if read == 0 {
                    return Err(PanelError::camera_error("Camera stream ended"));
                }
                self.splitter.push(&chunk[..read]);
            }
        }
    }

    impl Drop for RpiCamera {
        fn drop(&mut self) {
            self.close();
        }
    }
}

#[cfg(feature = "rpicam")]
pub use rpicam::RpiCamera;
