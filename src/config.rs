use crate::types::Config;
use anyhow::Result;
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = Config::default();
        assert_eq!(config.smoothing.history_window, 10);
        assert_eq!(config.fusion.input_size, 224);
        assert_eq!(config.fusion.min_region_size, 20);
        assert!((config.fusion.conf_cls - 0.5).abs() < f32::EPSILON);
        assert!((config.detection.conf_det - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "smoothing:\n  history_window: 5\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.smoothing.history_window, 5);
        assert_eq!(config.smoothing.staleness_window, 90);
        assert_eq!(config.fusion.region_padding_px, 10);
    }
}
