//! Settings management for Immersive Layers
//!
//! Handles loading/saving of the JSON settings file: where environments are
//! fetched from, how the UI panel and its buttons are laid out, the layer
//! eviction policy and logging.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::{EnvironmentSource, FacePaths};
use crate::layers::Placement;
use crate::telemetry::LogConfig;

/// What happens to an environment's compositor layer when another
/// environment takes its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    /// Keep the evicted layer allocated so reselecting it is instant
    #[default]
    RetainOnEvict,
    /// Destroy the evicted layer; it is recreated on reselect
    DestroyOnEvict,
}

impl EvictionPolicy {
    /// Get display name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            EvictionPolicy::RetainOnEvict => "retain-on-evict",
            EvictionPolicy::DestroyOnEvict => "destroy-on-evict",
        }
    }
}

/// Layout of the UI panel canvas and its quad layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelSettings {
    /// Canvas width in pixels
    pub canvas_width: u32,
    /// Canvas height in pixels, both eyes of a top-bottom image
    pub canvas_height: u32,
    /// Button width in pixels
    pub button_width: u32,
    /// Button height in pixels
    pub button_height: u32,
    /// Quad layer width in meters
    pub scale_width: f32,
    /// Quad layer height in meters
    pub scale_height: f32,
    pub position_x: f32,
    pub position_y: f32,
    /// Distance of the panel along -Z
    pub depth: f32,
    /// Whether the canvas packs both eyes top-bottom
    pub stereo: bool,
    /// Image drawn on the panel; a blank canvas when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitmap: Option<PathBuf>,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            canvas_width: 4000,
            canvas_height: 4000,
            button_width: 1000,
            button_height: 500,
            scale_width: 0.75,
            scale_height: 0.75,
            position_x: 0.125,
            position_y: 0.8,
            depth: -1.0,
            stereo: true,
            bitmap: None,
        }
    }
}

impl PanelSettings {
    /// World placement of the UI quad layer
    pub fn placement(&self) -> Placement {
        Placement {
            position: Vec3::new(self.position_x, self.position_y, self.depth),
            width: self.scale_width,
            height: self.scale_height,
        }
    }
}

/// One selectable button on the UI panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonSettings {
    /// Environment id activated by the button
    pub environment: String,
    /// Left edge in canvas pixels
    pub x: f32,
    /// Top edge in canvas pixels
    pub y: f32,
    /// How long the hover outline outlives the last hover event
    pub hover_timeout_ms: u64,
}

impl ButtonSettings {
    pub fn new(environment: &str, x: f32, y: f32, hover_timeout_ms: u64) -> Self {
        Self {
            environment: environment.to_string(),
            x,
            y,
            hover_timeout_ms,
        }
    }
}

/// Logging section of the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogSettings {
    /// Default filter when no environment override is set
    pub level: String,
    pub json: bool,
    /// Also write logs to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LogSettings {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            console_enabled: true,
            file_enabled: self.file.is_some(),
            file_path: self.file.clone(),
            json_format: self.json,
            default_level: self.level.clone(),
        }
    }
}

/// Application settings stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Base URL every environment folder lives under
    pub cdn_base: String,
    /// Per-request timeout in seconds
    pub fetch_timeout_secs: u64,
    pub environments: Vec<EnvironmentSource>,
    pub face_paths: FacePaths,
    pub panel: PanelSettings,
    pub buttons: Vec<ButtonSettings>,
    pub eviction_policy: EvictionPolicy,
    pub log: LogSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            cdn_base: "https://d368ik34cg55zg.cloudfront.net/textures".to_string(),
            fetch_timeout_secs: 30,
            environments: vec![
                EnvironmentSource::stereo_cube("dream", "dream", 1536),
                EnvironmentSource::stereo_cube("forest", "forest", 1536),
                EnvironmentSource::stereo_cube("battlefield", "battle", 2048),
            ],
            face_paths: FacePaths::default(),
            panel: PanelSettings::default(),
            buttons: vec![
                ButtonSettings::new("battlefield", 0.0, 700.0, 400),
                ButtonSettings::new("forest", 1150.0, 700.0, 100),
                ButtonSettings::new("dream", 2225.0, 700.0, 400),
            ],
            eviction_policy: EvictionPolicy::default(),
            log: LogSettings::default(),
        }
    }
}

impl AppSettings {
    /// Default settings file location in the user config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("ImmersiveLayers");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from a JSON file; missing fields take their defaults
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `path` if it exists, otherwise start from defaults
    ///
    /// A file that exists but fails to read, parse or validate is an error.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::load_or_default(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load settings from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings as pretty-printed JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to_file(&path)
    }

    /// Look up an environment source by id
    pub fn environment(&self, id: &str) -> Option<&EnvironmentSource> {
        self.environments.iter().find(|e| e.id == id)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut seen = std::collections::HashSet::new();
        for source in &self.environments {
            if source.id == crate::layers::UI_LAYER_ID {
                return Err(SettingsError::Invalid(format!(
                    "environment id '{}' is reserved for the UI panel",
                    source.id
                )));
            }
            if source.kind.is_cube() && source.width != source.height {
                return Err(SettingsError::Invalid(format!(
                    "cube environment '{}' has {}x{} faces; cube faces must be square",
                    source.id, source.width, source.height
                )));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(SettingsError::Invalid(format!("duplicate environment id '{}'", source.id)));
            }
        }
        if self.face_paths.stereo.len() != 12 || self.face_paths.mono.len() != 6 {
            return Err(SettingsError::Invalid(format!(
                "face path lists need 12 stereo and 6 mono entries, got {} and {}",
                self.face_paths.stereo.len(),
                self.face_paths.mono.len()
            )));
        }
        if let Some(button) = self.buttons.iter().find(|b| self.environment(&b.environment).is_none()) {
            tracing::warn!(environment = %button.environment, "Button targets an unknown environment");
        }
        Ok(())
    }
}

/// Settings-related errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
    #[error("Could not find config directory")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::SourceKind;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.environments.len(), 3);
        let battlefield = settings.environment("battlefield").unwrap();
        assert_eq!(battlefield.folder, "battle");
        assert_eq!(battlefield.width, 2048);
        assert_eq!(battlefield.kind, SourceKind::StereoCubeMap);
        assert_eq!(settings.eviction_policy, EvictionPolicy::RetainOnEvict);
        assert_eq!(settings.buttons[1].hover_timeout_ms, 100);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_panel_placement() {
        let placement = PanelSettings::default().placement();
        assert_eq!(placement.position, Vec3::new(0.125, 0.8, -1.0));
        assert_eq!((placement.width, placement.height), (0.75, 0.75));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"evictionPolicy":"destroy-on-evict","panel":{"depth":-2.0}}"#).unwrap();
        assert_eq!(settings.eviction_policy, EvictionPolicy::DestroyOnEvict);
        assert_eq!(settings.panel.depth, -2.0);
        assert_eq!(settings.panel.canvas_width, 4000);
        assert_eq!(settings.environments.len(), 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = AppSettings::default();
        settings.cdn_base = "http://127.0.0.1:9000".to_string();
        settings.log.json = true;
        settings.save_to_file(&path).unwrap();

        let loaded = AppSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("settings.json");
        assert_eq!(AppSettings::load_or_default(&missing).unwrap(), AppSettings::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(AppSettings::load_or_default(&broken), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_rejects_duplicate_and_reserved_ids() {
        let mut settings = AppSettings::default();
        settings.environments.push(EnvironmentSource::stereo_cube("forest", "forest2", 1536));
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));

        let mut settings = AppSettings::default();
        settings.environments.push(EnvironmentSource::stereo_cube("canvasQuad", "ui", 16));
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_rejects_non_square_cube() {
        let mut settings = AppSettings::default();
        let mut wide = EnvironmentSource::stereo_cube("wide", "wide", 2048);
        wide.height = 1024;
        settings.environments.push(wide);
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(msg)) if msg.contains("wide")));

        // Flat sources may be any shape
        let mut settings = AppSettings::default();
        let mut poster = EnvironmentSource::stereo_cube("poster", "poster", 2048);
        poster.kind = SourceKind::Quad;
        poster.height = 1024;
        settings.environments.push(poster);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_log_settings_to_config() {
        let log = LogSettings {
            level: "debug".to_string(),
            json: false,
            file: Some(PathBuf::from("layers.log")),
        };
        let config = log.to_config();
        assert!(config.file_enabled);
        assert_eq!(config.default_level, "debug");
    }
}
