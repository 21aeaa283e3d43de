//! Fixed visual constants and the per-scene style.

use cadview_core::{ColorMap, Options};

/// Diameter of point sprites in pixels. Lines are always one pixel wide.
pub const POINT_SIZE_PX: f32 = 7.0;

/// Surface opacity in x-ray mode.
pub const DEFAULT_XRAY_ALPHA: f32 = 0.25;

/// Background clear color.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.93,
    g: 0.94,
    b: 0.96,
    a: 1.0,
};

/// Colors and sizes a scene renders with.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneStyle {
    pub colors: ColorMap,
    pub xray_alpha: f32,
    pub point_size: f32,
    pub clear_color: wgpu::Color,
    /// Search radius used by hover picking.
    pub hover_radius: u32,
    /// When false, hover picking is skipped and any hover is cleared.
    pub hover_enabled: bool,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            colors: ColorMap::default(),
            xray_alpha: DEFAULT_XRAY_ALPHA,
            point_size: POINT_SIZE_PX,
            clear_color: CLEAR_COLOR,
            hover_radius: 0,
            hover_enabled: true,
        }
    }
}

impl From<&Options> for SceneStyle {
    fn from(options: &Options) -> Self {
        Self {
            colors: options.colors,
            xray_alpha: options.xray_alpha.clamp(0.0, 1.0),
            hover_radius: options.hover_radius,
            hover_enabled: options.hover_enabled,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_from_options() {
        let options = Options {
            xray_alpha: 1.5,
            hover_radius: 4,
            hover_enabled: false,
            ..Options::default()
        };
        let style = SceneStyle::from(&options);
        assert!(!style.hover_enabled);
        assert!(SceneStyle::default().hover_enabled);
        assert!((style.xray_alpha - 1.0).abs() < f32::EPSILON);
        assert_eq!(style.hover_radius, 4);
        assert!((SceneStyle::default().xray_alpha - 0.25).abs() < f32::EPSILON);
    }
}
