//! Configuration options for cadview.

use serde::{Deserialize, Serialize};

use crate::color_map::ColorMap;
use crate::error::Result;

/// Viewer configuration, loadable from JSON. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Search radius in pixels for click picking.
    pub pick_radius: u32,

    /// Search radius in pixels for hover picking.
    pub hover_radius: u32,

    /// Whether mouse motion updates the hover target.
    pub hover_enabled: bool,

    /// Surface alpha in x-ray mode.
    pub xray_alpha: f32,

    /// Base and highlight colors.
    pub colors: ColorMap,

    /// Default `env_logger` filter, overridden by `RUST_LOG`.
    pub log_filter: String,

    /// Initial viewport size in pixels.
    pub viewport_size: (u32, u32),
}

impl Default for Options {
    fn default() -> Self {
        Self {
            pick_radius: 3,
            hover_radius: 2,
            hover_enabled: true,
            xray_alpha: 0.25,
            colors: ColorMap::default(),
            log_filter: "info".to_string(),
            viewport_size: (1280, 720),
        }
    }
}

impl Options {
    /// Parses options from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes options to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = Options::from_json_str(r#"{ "pick_radius": 5, "xray_alpha": 0.3 }"#).unwrap();
        assert_eq!(options.pick_radius, 5);
        assert!((options.xray_alpha - 0.3).abs() < 1e-6);
        assert_eq!(options.hover_radius, Options::default().hover_radius);
        assert_eq!(options.colors, ColorMap::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut options = Options::default();
        options.log_filter = "cadview_render=debug".to_string();
        options.viewport_size = (640, 480);
        let json = options.to_json_string().unwrap();
        assert_eq!(Options::from_json_str(&json).unwrap(), options);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(Options::from_json_str("{ pick_radius: }").is_err());
        assert!(Options::from_json_str(r#"{ "pick_radius": "three" }"#).is_err());
    }
}
