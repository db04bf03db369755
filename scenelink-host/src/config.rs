//! Configuration for the reference host.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::viewport::ViewportRenderer;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Viewport render settings.
    pub viewport: ViewportConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface to bind the command listener on.
    pub bind_host: String,
    /// TCP port for the command channel.
    pub command_port: u16,
}

/// Viewport render configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Default capture width in pixels.
    pub width: u32,
    /// Default capture height in pixels.
    pub height: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Optional log file path. If empty, logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            viewport: ViewportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_host: scenelink_core::DEFAULT_HOST.into(),
            command_port: scenelink_core::DEFAULT_COMMAND_PORT,
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: crate::viewport::DEFAULT_WIDTH,
            height: crate::viewport::DEFAULT_HEIGHT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let cfg = Self::default();
        let text = toml::to_string_pretty(&cfg)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, text)
    }

    /// Build the renderer the viewport settings describe.
    pub fn to_renderer(&self) -> ViewportRenderer {
        ViewportRenderer::new(self.viewport.width, self.viewport.height)
    }
}

// ── Tests ────────────────────────────────────────────────────────
