//! Shader management.
//!
//! Every pass shader is the shared prelude (`common.wgsl`: vertex input,
//! frame uniforms, lighting and sprite helpers) followed by a pass body.

use crate::error::{RenderError, RenderResult};

/// WGSL shared by every pass.
pub const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
/// Lit surfaces for the opaque and transparent passes.
pub const SURFACE_WGSL: &str = include_str!("shaders/surface.wgsl");
/// Unlit lines and point sprites for the wireframe pass.
pub const FLAT_WGSL: &str = include_str!("shaders/flat.wgsl");
/// Flat highlight colors for geometry ranges.
pub const HIGHLIGHT_WGSL: &str = include_str!("shaders/highlight.wgsl");
/// Id-matched highlight for FEM meshes.
pub const MESH_HIGHLIGHT_WGSL: &str = include_str!("shaders/mesh_highlight.wgsl");
/// Pick id output.
pub const PICK_WGSL: &str = include_str!("shaders/pick.wgsl");

/// Builder for creating shader modules.
pub struct ShaderBuilder {
    prelude: Option<String>,
    body: Option<String>,
    label: Option<String>,
}

impl ShaderBuilder {
    /// Creates a new shader builder with the common prelude.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prelude: Some(COMMON_WGSL.to_string()),
            body: None,
            label: None,
        }
    }

    /// Sets the pass body (WGSL).
    #[must_use]
    pub fn with_body(mut self, source: impl Into<String>) -> Self {
        self.body = Some(source.into());
        self
    }

    /// Drops the common prelude, for self-contained sources.
    #[must_use]
    pub fn without_prelude(mut self) -> Self {
        self.prelude = None;
        self
    }

    /// Sets the shader label for debugging.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Compiles the module, surfacing WGSL validation errors as [`RenderError`].
    pub fn build_module(self, device: &wgpu::Device) -> RenderResult<wgpu::ShaderModule> {
        let source = self.combined_source()?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: self.label.as_deref(),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompilationFailed(format!(
                "{}: {error}",
                self.label.as_deref().unwrap_or("shader")
            )));
        }

        Ok(module)
    }

    fn combined_source(&self) -> RenderResult<String> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| RenderError::ShaderCompilationFailed("missing shader body".into()))?;

        Ok(match &self.prelude {
            Some(prelude) => format!("{prelude}\n\n{body}"),
            None => body.clone(),
        })
    }
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_body_is_an_error() {
        assert!(ShaderBuilder::new().combined_source().is_err());
    }

    #[test]
    fn test_prelude_precedes_body() {
        let source = ShaderBuilder::new()
            .with_body("// body")
            .combined_source()
            .unwrap();
        assert!(source.starts_with(COMMON_WGSL));
        assert!(source.ends_with("// body"));

        let bare = ShaderBuilder::new()
            .without_prelude()
            .with_body("// body")
            .combined_source()
            .unwrap();
        assert_eq!(bare, "// body");
    }

    #[test]
    fn test_pass_bodies_declare_entry_points() {
        for body in [SURFACE_WGSL, FLAT_WGSL, HIGHLIGHT_WGSL, MESH_HIGHLIGHT_WGSL, PICK_WGSL] {
            assert!(body.contains("fn fs_main"));
        }
        for body in [FLAT_WGSL, HIGHLIGHT_WGSL, MESH_HIGHLIGHT_WGSL, PICK_WGSL] {
            assert!(body.contains("fn vs_sprite"));
        }
    }
}
