use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::color;
use crate::persistence::DrawingId;
use crate::renderer::Surface;
use crate::tools::{ToolKind, ToolState};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SKETCH_CANVAS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "sketch_canvas.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid color in config: {0}")]
    Color(String),
}

/// Startup settings for the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing fields fall back to their defaults
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub brush_color: String,
    pub brush_width: u32,
    pub store_dir: PathBuf,
    /// Drawing to load on startup and save to
    pub drawing_id: Option<DrawingId>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: "#ffffff".to_owned(),
            brush_color: "#000000".to_owned(),
            brush_width: 2,
            store_dir: PathBuf::from("drawings"),
            drawing_id: None,
        }
    }
}

impl CanvasConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file named by `SKETCH_CANVAS_CONFIG`, else `sketch_canvas.json`.
    /// A missing default file means defaults; any other problem is logged and
    /// also falls back to defaults.
    pub fn load() -> Self {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = explicit.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if explicit.is_none() && !path.exists() {
            log::debug!("No config file, using defaults");
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::error!("Ignoring config {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for text in [&self.background, &self.brush_color] {
            if color::parse_hex(text).is_none() {
                return Err(ConfigError::Color(text.clone()));
            }
        }
        Ok(())
    }

    pub fn surface(&self) -> Surface {
        let background = color::parse_hex(&self.background).unwrap_or(color::WHITE);
        Surface::new(self.width.max(1), self.height.max(1), background)
    }

    pub fn tool_state(&self) -> ToolState {
        let brush_color = color::parse_hex(&self.brush_color).unwrap_or(color::BLACK);
        ToolState::new(ToolKind::Brush, brush_color, self.brush_width)
    }
}
