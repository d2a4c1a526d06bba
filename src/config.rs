// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub output: Option<PathBuf>,
    /// Flip frames horizontally before detection (footage shot with hands facing down).
    pub mirror: bool,
    pub overlay_dir: Option<PathBuf>,
    pub detector_program: String,
    pub detector_args: Vec<String>,
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output: None,
            mirror: true,
            overlay_dir: None,
            detector_program: "python3".to_string(),
            detector_args: vec!["scripts/hand_detect.py".to_string()],
            min_detection_confidence: 0.8,
            min_tracking_confidence: 0.5,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"mirror": false, "min_detection_confidence": 0.6}"#).unwrap();

        let cfg = PipelineConfig::load(&path).unwrap();
        assert!(!cfg.mirror);
        assert_eq!(cfg.min_detection_confidence, 0.6);
        assert_eq!(cfg.min_tracking_confidence, 0.5);
        assert_eq!(cfg.detector_program, "python3");
    }

    #[test]
    fn unreadable_config_errors() {
        assert!(PipelineConfig::load("/nope/config.json").is_err());
    }
}
