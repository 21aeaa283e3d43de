//! Per-frame render data handed from the document to the renderer.
//!
//! The renderer never sees the entity graph itself. Each version of the
//! document is flattened into [`RenderData`]: a list of geometry primitives
//! (one per BRep entity that draws something) plus FEM meshes, each tagged with
//! the uid and type of the entity that owns it.

use std::collections::HashMap;

use glam::{Vec3, Vec4};

use crate::color_map::ColorMap;
use crate::entity::RenderEntityType;
use crate::error::{CadviewError, Result};
use crate::pick::{EntityKey, EntityUid, PickResult, UID_MASK};

/// How a primitive's vertices are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Indexed triangle list.
    Triangles,
    /// Indexed line list.
    Lines,
    /// Unindexed point list.
    Points,
}

impl Topology {
    /// Number of indices per primitive, `None` for unindexed points.
    #[must_use]
    pub fn indices_per_primitive(self) -> Option<usize> {
        match self {
            Topology::Triangles => Some(3),
            Topology::Lines => Some(2),
            Topology::Points => None,
        }
    }
}

/// Geometry drawn for one BRep entity.
#[derive(Debug, Clone)]
pub struct RenderPrimitive {
    pub topology: Topology,
    /// The entity this primitive belongs to.
    pub key: EntityKey,
    /// Owning part, 0 if none.
    pub part_uid: EntityUid,
    /// Owning solid, 0 if none.
    pub solid_uid: EntityUid,
    /// Wires this primitive belongs to (edges only).
    pub wire_uids: Vec<EntityUid>,
    pub positions: Vec<Vec3>,
    /// Per-vertex normals; empty for unlit primitives.
    pub normals: Vec<Vec3>,
    /// Per-vertex colors; empty to use `color` everywhere.
    pub vertex_colors: Vec<Vec4>,
    pub color: Vec4,
    pub indices: Vec<u32>,
}

impl RenderPrimitive {
    fn new(topology: Topology, key: EntityKey, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            topology,
            key,
            part_uid: 0,
            solid_uid: 0,
            wire_uids: Vec::new(),
            positions,
            normals: Vec::new(),
            vertex_colors: Vec::new(),
            color: ColorMap::default().base_color(key.entity_type),
            indices,
        }
    }

    /// Indexed triangles, usually a tessellated face.
    #[must_use]
    pub fn triangles(key: EntityKey, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self::new(Topology::Triangles, key, positions, indices)
    }

    /// Indexed line segments, usually a discretized edge.
    #[must_use]
    pub fn lines(key: EntityKey, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self::new(Topology::Lines, key, positions, indices)
    }

    /// Points, usually a single vertex.
    #[must_use]
    pub fn points(key: EntityKey, positions: Vec<Vec3>) -> Self {
        Self::new(Topology::Points, key, positions, Vec::new())
    }

    #[must_use]
    pub fn with_part(mut self, part_uid: EntityUid) -> Self {
        self.part_uid = part_uid;
        self
    }

    #[must_use]
    pub fn with_solid(mut self, solid_uid: EntityUid) -> Self {
        self.solid_uid = solid_uid;
        self
    }

    #[must_use]
    pub fn with_wires(mut self, wire_uids: impl IntoIterator<Item = EntityUid>) -> Self {
        self.wire_uids = wire_uids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    #[must_use]
    pub fn with_vertex_colors(mut self, colors: Vec<Vec4>) -> Self {
        self.vertex_colors = colors;
        self
    }

    /// Color of vertex `i`.
    #[must_use]
    pub fn vertex_color(&self, i: usize) -> Vec4 {
        self.vertex_colors.get(i).copied().unwrap_or(self.color)
    }

    /// Normal of vertex `i`, zero when the primitive is unlit.
    #[must_use]
    pub fn vertex_normal(&self, i: usize) -> Vec3 {
        self.normals.get(i).copied().unwrap_or(Vec3::ZERO)
    }

    /// Number of indices (or vertices for points) this primitive draws.
    #[must_use]
    pub fn element_count(&self) -> usize {
        match self.topology {
            Topology::Points => self.positions.len(),
            _ => self.indices.len(),
        }
    }

    /// Checks attribute lengths, index bounds and uid width.
    pub fn validate(&self) -> Result<()> {
        check_uid(self.key.uid)?;
        for uid in [self.part_uid, self.solid_uid]
            .into_iter()
            .chain(self.wire_uids.iter().copied())
        {
            check_uid(uid)?;
        }
        let n = self.positions.len();
        for len in [self.normals.len(), self.vertex_colors.len()] {
            if len != 0 && len != n {
                return Err(CadviewError::SizeMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        if let Some(stride) = self.topology.indices_per_primitive() {
            if self.indices.len() % stride != 0 {
                return Err(CadviewError::SizeMismatch {
                    expected: self.indices.len() / stride * stride + stride,
                    actual: self.indices.len(),
                });
            }
            if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= n) {
                return Err(CadviewError::SizeMismatch {
                    expected: n,
                    actual: bad as usize + 1,
                });
            }
        }
        Ok(())
    }
}

fn check_uid(uid: EntityUid) -> Result<()> {
    if uid > UID_MASK {
        Err(CadviewError::UidOutOfRange(uid))
    } else {
        Ok(())
    }
}

/// One FEM entity (node, line or element) and the vertices drawing it.
#[derive(Debug, Clone)]
pub struct MeshItem {
    pub key: EntityKey,
    /// Triangle list for elements, segment list for lines, points for nodes.
    pub positions: Vec<Vec3>,
    /// Per-vertex normals for elements; empty otherwise.
    pub normals: Vec<Vec3>,
}

impl MeshItem {
    #[must_use]
    pub fn new(key: EntityKey, positions: Vec<Vec3>) -> Self {
        Self {
            key,
            positions,
            normals: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }
}

/// An FEM mesh split into its three display layers.
#[derive(Debug, Clone)]
pub struct MeshRenderData {
    /// Part owning the mesh, 0 if none.
    pub part_uid: EntityUid,
    pub surface_color: Vec4,
    pub line_color: Vec4,
    pub node_color: Vec4,
    /// Element faces, unindexed triangles.
    pub surface: Vec<MeshItem>,
    /// Element edges and 1D elements, unindexed segments.
    pub wireframe: Vec<MeshItem>,
    pub nodes: Vec<MeshItem>,
}

impl MeshRenderData {
    #[must_use]
    pub fn new(part_uid: EntityUid) -> Self {
        let colors = ColorMap::default();
        Self {
            part_uid,
            surface_color: colors.base_color(RenderEntityType::MeshTriangle),
            line_color: colors.base_color(RenderEntityType::MeshLine),
            node_color: colors.base_color(RenderEntityType::MeshNode),
            surface: Vec::new(),
            wireframe: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Checks that every item belongs to the mesh domain and has whole primitives.
    pub fn validate(&self) -> Result<()> {
        check_uid(self.part_uid)?;
        for (items, stride) in [(&self.surface, 3), (&self.wireframe, 2), (&self.nodes, 1)] {
            for item in items {
                check_uid(item.key.uid)?;
                if !item.key.entity_type.is_mesh() {
                    return Err(CadviewError::UnknownEntityType(item.key.entity_type.to_string()));
                }
                if item.positions.len() % stride != 0 {
                    return Err(CadviewError::SizeMismatch {
                        expected: item.positions.len() / stride * stride + stride,
                        actual: item.positions.len(),
                    });
                }
                if !item.normals.is_empty() && item.normals.len() != item.positions.len() {
                    return Err(CadviewError::SizeMismatch {
                        expected: item.positions.len(),
                        actual: item.normals.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Everything the renderer draws for one document version.
#[derive(Debug, Clone, Default)]
pub struct RenderData {
    /// Bumped by the producer whenever the content changes.
    pub version: u64,
    pub primitives: Vec<RenderPrimitive>,
    pub meshes: Vec<MeshRenderData>,
}

impl RenderData {
    #[must_use]
    pub fn new(version: u64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_primitive(mut self, primitive: RenderPrimitive) -> Self {
        self.primitives.push(primitive);
        self
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: MeshRenderData) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Validates every primitive and mesh.
    pub fn validate(&self) -> Result<()> {
        self.primitives.iter().try_for_each(RenderPrimitive::validate)?;
        self.meshes.iter().try_for_each(MeshRenderData::validate)
    }

    /// Returns true if there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty() && self.meshes.is_empty()
    }

    /// Axis-aligned bounds of all positions, `None` when empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let mesh_positions = self.meshes.iter().flat_map(|m| {
            m.surface
                .iter()
                .chain(&m.wireframe)
                .chain(&m.nodes)
                .flat_map(|item| item.positions.iter())
        });
        self.primitives
            .iter()
            .flat_map(|p| p.positions.iter())
            .chain(mesh_positions)
            .fold(None, |bounds, &p| match bounds {
                None => Some((p, p)),
                Some((min, max)) => Some((min.min(p), max.max(p))),
            })
    }

    /// Maps each wire uid to the uids of the edges that belong to it.
    #[must_use]
    pub fn wire_edge_index(&self) -> HashMap<EntityUid, Vec<EntityUid>> {
        let mut index: HashMap<EntityUid, Vec<EntityUid>> = HashMap::new();
        for primitive in &self.primitives {
            if primitive.key.entity_type != RenderEntityType::Edge {
                continue;
            }
            for &wire in &primitive.wire_uids {
                let edges = index.entry(wire).or_default();
                if !edges.contains(&primitive.key.uid) {
                    edges.push(primitive.key.uid);
                }
            }
        }
        index
    }

    /// Finds the primitive drawn for an entity.
    #[must_use]
    pub fn find(&self, key: &PickResult) -> Option<&RenderPrimitive> {
        self.primitives.iter().find(|p| p.key == *key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(uid: EntityUid) -> RenderPrimitive {
        RenderPrimitive::triangles(
            PickResult::new(uid, RenderEntityType::Face),
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
        )
    }

    fn edge(uid: EntityUid, wires: &[EntityUid]) -> RenderPrimitive {
        RenderPrimitive::lines(
            PickResult::new(uid, RenderEntityType::Edge),
            vec![Vec3::ZERO, Vec3::Z],
            vec![0, 1],
        )
        .with_wires(wires.iter().copied())
    }

    #[test]
    fn test_validate_accepts_well_formed_data() {
        let data = RenderData::new(1)
            .with_primitive(face(1).with_normals(vec![Vec3::Z; 3]))
            .with_primitive(edge(2, &[3]));
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_primitives() {
        let mut bad_index = face(1);
        bad_index.indices = vec![0, 1, 5];
        assert!(bad_index.validate().is_err());

        let partial = RenderPrimitive::triangles(
            PickResult::new(1, RenderEntityType::Face),
            vec![Vec3::ZERO; 3],
            vec![0, 1],
        );
        assert!(partial.validate().is_err());

        assert!(face(1).with_normals(vec![Vec3::Z]).validate().is_err());
        assert!(matches!(
            face(UID_MASK + 1).validate(),
            Err(CadviewError::UidOutOfRange(_))
        ));
    }

    #[test]
    fn test_mesh_validation_requires_mesh_types() {
        let mut mesh = MeshRenderData::new(0);
        mesh.nodes
            .push(MeshItem::new(PickResult::new(4, RenderEntityType::MeshNode), vec![Vec3::ONE]));
        assert!(mesh.validate().is_ok());
        mesh.nodes
            .push(MeshItem::new(PickResult::new(5, RenderEntityType::Vertex), vec![Vec3::ONE]));
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_bounding_box() {
        assert_eq!(RenderData::new(0).bounding_box(), None);
        let data = RenderData::new(1)
            .with_primitive(face(1))
            .with_primitive(RenderPrimitive::points(
                PickResult::new(2, RenderEntityType::Vertex),
                vec![Vec3::new(-1.0, 2.0, 0.5)],
            ));
        let (min, max) = data.bounding_box().unwrap();
        assert_eq!(min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 0.5));
    }

    #[test]
    fn test_wire_edge_index() {
        let data = RenderData::new(1)
            .with_primitive(edge(10, &[1]))
            .with_primitive(edge(11, &[1, 2]))
            .with_primitive(face(12));
        let index = data.wire_edge_index();
        assert_eq!(index[&1], vec![10, 11]);
        assert_eq!(index[&2], vec![11]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_vertex_attributes_fall_back() {
        let p = face(1).with_color(Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(p.vertex_color(2), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(p.vertex_normal(0), Vec3::ZERO);
        assert_eq!(p.element_count(), 3);
    }

    #[test]
    fn test_default_colors_follow_entity_type() {
        let colors = ColorMap::default();
        assert_eq!(face(1).color, colors.face);
        assert_eq!(edge(2, &[]).color, colors.edge);
        let mesh = MeshRenderData::new(5);
        assert_eq!(mesh.surface_color, colors.mesh_surface);
        assert_eq!(mesh.line_color, colors.mesh_line);
        assert_eq!(mesh.node_color, colors.mesh_node);
    }
}
