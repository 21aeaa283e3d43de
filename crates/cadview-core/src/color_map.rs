//! Default entity colors and the highlight palette.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::entity::RenderEntityType;
use crate::selection::HighlightKind;

/// Base and highlight colors, in linear RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMap {
    pub face: Vec4,
    pub edge: Vec4,
    pub vertex: Vec4,
    pub mesh_surface: Vec4,
    pub mesh_line: Vec4,
    pub mesh_node: Vec4,
    /// Face color while hovered.
    pub face_hover: Vec4,
    /// Face color while selected.
    pub face_selection: Vec4,
    /// Edge and vertex color while hovered.
    pub edge_hover: Vec4,
    /// Edge and vertex color while selected.
    pub edge_selection: Vec4,
}

impl Default for ColorMap {
    fn default() -> Self {
        Self {
            face: Vec4::new(0.72, 0.74, 0.78, 1.0),
            edge: Vec4::new(0.08, 0.08, 0.1, 1.0),
            vertex: Vec4::new(0.15, 0.15, 0.2, 1.0),
            mesh_surface: Vec4::new(0.55, 0.7, 0.85, 1.0),
            mesh_line: Vec4::new(0.1, 0.1, 0.1, 1.0),
            mesh_node: Vec4::new(0.9, 0.4, 0.1, 1.0),
            face_hover: Vec4::new(0.4, 0.75, 1.0, 1.0),
            face_selection: Vec4::new(1.0, 0.6, 0.1, 1.0),
            edge_hover: Vec4::new(0.0, 0.55, 1.0, 1.0),
            edge_selection: Vec4::new(1.0, 0.35, 0.0, 1.0),
        }
    }
}

impl ColorMap {
    /// Color a producer should give an entity of this type.
    #[must_use]
    pub fn base_color(&self, entity_type: RenderEntityType) -> Vec4 {
        use RenderEntityType as T;
        match entity_type {
            T::Vertex => self.vertex,
            T::Edge | T::Wire => self.edge,
            T::MeshNode => self.mesh_node,
            T::MeshLine => self.mesh_line,
            t if t.is_mesh() => self.mesh_surface,
            _ => self.face,
        }
    }

    /// Highlight color for surfaces.
    #[must_use]
    pub fn face_highlight(&self, kind: HighlightKind) -> Vec4 {
        match kind {
            HighlightKind::Hovered => self.face_hover,
            HighlightKind::Selected => self.face_selection,
        }
    }

    /// Highlight color for edges, wires and points.
    #[must_use]
    pub fn edge_highlight(&self, kind: HighlightKind) -> Vec4 {
        match kind {
            HighlightKind::Hovered => self.edge_hover,
            HighlightKind::Selected => self.edge_selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_and_edge_highlights_differ() {
        let colors = ColorMap::default();
        for kind in [HighlightKind::Hovered, HighlightKind::Selected] {
            assert_ne!(colors.face_highlight(kind), colors.edge_highlight(kind));
        }
        assert_ne!(colors.face_hover, colors.face_selection);
    }

    #[test]
    fn test_base_colors_by_type() {
        let colors = ColorMap::default();
        assert_eq!(colors.base_color(RenderEntityType::Face), colors.face);
        assert_eq!(colors.base_color(RenderEntityType::Part), colors.face);
        assert_eq!(colors.base_color(RenderEntityType::Wire), colors.edge);
        assert_eq!(colors.base_color(RenderEntityType::MeshHexa8), colors.mesh_surface);
        assert_eq!(colors.base_color(RenderEntityType::MeshNode), colors.mesh_node);
    }
}
