//! Settings for the panel's HTTP listener.

use crate::error::{PanelError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// How the panel is exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Interface to listen on; `0.0.0.0` makes the panel reachable on the LAN
    pub host: String,
    /// Listening port
    pub port: u16,
    /// Send permissive CORS headers
    pub enable_cors: bool,
    /// Directory mounted under `/static`
    pub static_path: Option<String>,
    /// Reject unknown relay names and actions instead of ignoring them
    pub strict_routes: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: false,
            static_path: Some("static".to_string()),
            strict_routes: false,
        }
    }
}

impl WebConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// `None` disables the `/static` mount.
    pub fn with_static_path(mut self, path: Option<String>) -> Self {
        self.static_path = path;
        self
    }

    /// Strict routes answer 404/400 for unknown boxes/actions; lenient
    /// routes answer an empty 200 and change nothing.
    pub fn with_strict_routes(mut self, strict: bool) -> Self {
        self.strict_routes = strict;
        self
    }

    /// `host:port` as given.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The parsed listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address().parse().map_err(|e| {
            PanelError::config_error(format!(
                "Invalid bind address '{}': {}",
                self.bind_address(),
                e
            ))
        })
    }

    /// The static directory, if one is configured and present on disk.
    pub fn static_dir(&self) -> Option<&Path> {
        self.static_path
            .as_deref()
            .map(Path::new)
            .filter(|path| path.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_listen_on_all_interfaces() {
        let config = WebConfig::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:5000");
        assert!(!config.strict_routes);
        assert!(!config.enable_cors);
    }

    #[test]
    fn test_hostname_is_rejected() {
        let err = WebConfig::new("raspberrypi.local", 5000)
            .socket_addr()
            .unwrap_err();
        assert!(matches!(err, PanelError::Config(_)));
    }

    #[test]
    fn test_missing_static_dir_is_skipped() {
        let config = WebConfig::default().with_static_path(Some("/nonexistent/boxpanel".into()));
        assert!(config.static_dir().is_none());
        assert!(WebConfig::default().with_static_path(None).static_dir().is_none());
    }
}
