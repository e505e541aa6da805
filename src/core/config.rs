use crate::models::pose::PoseConfig;
use crate::platform::capture::FrameSourceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the settings file location
pub const CONFIG_PATH_ENV: &str = "POSTURE_STREAM_CONFIG";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub pose: PoseConfig,
    pub stream: StreamConfig,
    /// Default log level when RUST_LOG is not set
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Which frame source feeds the sessions
    pub source: FrameSourceKind,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Start streaming at launch instead of waiting for /api/camera/start
    pub auto_start: bool,
}

/// Publish loop settings, shared by every session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Publish cadence in frames per second
    pub target_fps: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Upper bound on a single pose or face inference call
    pub inference_timeout_ms: u64,
    /// Publish frames that carry no pose, with the analysis omitted
    pub publish_frames_without_pose: bool,
    /// Log a warning after this many consecutive ticks without a camera frame (0 disables)
    pub frame_wait_warn_ticks: u32,
}

impl StreamConfig {
    /// Duration of one publish tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.target_fps.max(1) as u64)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            camera: CameraConfig::default(),
            pose: PoseConfig::default(),
            stream: StreamConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: FrameSourceKind::Synthetic,
            width: 1280,
            height: 720,
            fps: 30,
            auto_start: true,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            jpeg_quality: 80,
            inference_timeout_ms: 200,
            publish_frames_without_pose: true,
            frame_wait_warn_ticks: 90, // ~3 seconds at 30 fps
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it with defaults if it doesn't exist
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("Server host cannot be empty".to_string()));
        }

        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Invalid camera resolution: {}x{}. Both dimensions must be non-zero",
                self.camera.width, self.camera.height
            )));
        }

        if self.camera.fps == 0 || self.camera.fps > 60 {
            return Err(ConfigError::Invalid(format!(
                "Invalid camera FPS: {}. Must be between 1 and 60",
                self.camera.fps
            )));
        }

        let thresholds = [
            ("pose min detection confidence", self.pose.min_detection_confidence),
            ("pose min tracking confidence", self.pose.min_tracking_confidence),
            ("face min detection confidence", self.pose.face_min_detection_confidence),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "Invalid {}: {}. Must be between 0.0 and 1.0",
                    name, value
                )));
            }
        }

        if self.stream.target_fps == 0 || self.stream.target_fps > 60 {
            return Err(ConfigError::Invalid(format!(
                "Invalid target FPS: {}. Must be between 1 and 60",
                self.stream.target_fps
            )));
        }

        if self.stream.jpeg_quality == 0 || self.stream.jpeg_quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "Invalid JPEG quality: {}. Must be between 1 and 100",
                self.stream.jpeg_quality
            )));
        }

        if self.stream.inference_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Inference timeout must be greater than zero".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the configuration file path
    pub fn config_path() -> ConfigResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| ConfigError::HomeDirNotFound)?;

        let mut path = PathBuf::from(home);
        path.push(".posture_stream");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    HomeDirNotFound,

    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn test_config_dir(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("posture_stream_test_{}_{}", name, uuid::Uuid::new_v4()));
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!((config.camera.width, config.camera.height, config.camera.fps), (1280, 720, 30));
        assert_eq!(config.stream.target_fps, 30);
        assert_eq!(config.stream.jpeg_quality, 80);
        assert_eq!(config.stream.inference_timeout_ms, 200);
        assert!(config.stream.publish_frames_without_pose);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.stream.tick_interval(), Duration::from_millis(33));
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // Valid config should pass
        assert!(config.validate().is_ok());

        config.stream.target_fps = 0;
        assert!(config.validate().is_err());
        config.stream.target_fps = 100;
        assert!(config.validate().is_err());
        config.stream.target_fps = 30;

        config.pose.min_detection_confidence = 1.5;
        assert!(config.validate().is_err());
        config.pose.min_detection_confidence = 0.5;

        config.stream.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.stream.jpeg_quality = 80;

        config.stream.inference_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.stream.inference_timeout_ms = 200;

        config.camera.width = 0;
        assert!(config.validate().is_err());
        config.camera.width = 1280;

        config.log_level = "loud".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"server": {"port": 9000}, "stream": {"target_fps": 15}}"#).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.stream.target_fps, 15);
        assert_eq!(config.stream.jpeg_quality, 80);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = test_config_dir("create");
        let path = dir.join("settings.json");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = test_config_dir("invalid");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");

        fs::write(&path, r#"{"stream": {"jpeg_quality": 0}}"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_save_refuses_invalid_config() {
        let dir = test_config_dir("save");
        let path = dir.join("settings.json");
        let mut config = Config::default();
        config.camera.fps = 0;

        assert!(config.save_to(&path).is_err());
        assert!(!path.exists());
    }
}
