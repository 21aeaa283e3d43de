//! CPU-side scene geometry built from [`RenderData`].
//!
//! Primitives are sorted into three topology buckets (triangles, lines,
//! points). Each primitive becomes one [`DrawRange`] recording where it sits
//! in its bucket and which entities own it. FEM meshes share a fourth vertex
//! buffer laid out as `[surface][wireframe][nodes]`.

use std::collections::HashMap;
use std::ops::Range;

use glam::{Vec3, Vec4};

use cadview_core::{
    EntityKey, EntityUid, MeshItem, RangeOwner, RenderData, RenderPrimitive, Topology,
};

use crate::uniforms::Vertex;

/// A primitive's slice of a bucket and the entities owning it.
///
/// For triangles and lines `start`/`count` address the index buffer; for
/// points and mesh items they address vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRange {
    pub start: u32,
    pub count: u32,
    pub key: EntityKey,
    pub part_uid: EntityUid,
    pub solid_uid: EntityUid,
    pub wire_uids: Vec<EntityUid>,
}

impl DrawRange {
    #[must_use]
    pub fn range(&self) -> Range<u32> {
        self.start..self.start + self.count
    }

    #[must_use]
    pub fn owner(&self) -> RangeOwner<'_> {
        RangeOwner {
            key: self.key,
            part_uid: self.part_uid,
            solid_uid: self.solid_uid,
            wire_uids: &self.wire_uids,
        }
    }
}

/// One topology bucket.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub vertices: Vec<Vertex>,
    /// Absolute indices into `vertices`; empty for points.
    pub indices: Vec<u32>,
    pub ranges: Vec<DrawRange>,
}

impl Bucket {
    /// Ranges merged wherever they touch, for drawing the whole bucket.
    #[must_use]
    pub fn batches(&self) -> Vec<Range<u32>> {
        merge_ranges(self.ranges.iter().map(DrawRange::range))
    }
}

/// Vertex spans of the three FEM layers in the mesh buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshLayout {
    pub surface: Range<u32>,
    pub wireframe: Range<u32>,
    pub nodes: Range<u32>,
}

/// Everything the passes draw for one render-data version.
#[derive(Debug, Clone, Default)]
pub struct SceneGeometry {
    pub version: Option<u64>,
    pub triangles: Bucket,
    pub lines: Bucket,
    pub points: Bucket,
    /// FEM vertices, `[surface][wireframe][nodes]`.
    pub mesh_vertices: Vec<Vertex>,
    pub mesh_layout: MeshLayout,
    /// Per-item ranges into `mesh_vertices`, in layout order.
    pub mesh_ranges: Vec<DrawRange>,
    /// Wire uid to the edges forming it.
    pub wire_edges: HashMap<EntityUid, Vec<EntityUid>>,
}

impl SceneGeometry {
    /// Flattens render data into buckets.
    #[must_use]
    pub fn build(data: &RenderData) -> Self {
        let mut geometry = SceneGeometry {
            version: Some(data.version),
            wire_edges: data.wire_edge_index(),
            ..SceneGeometry::default()
        };
        for primitive in &data.primitives {
            if let Err(err) = primitive.validate() {
                log::warn!("skipping primitive of {} {}: {err}", primitive.key.entity_type, primitive.key.uid);
                continue;
            }
            match primitive.topology {
                Topology::Triangles => push_indexed(&mut geometry.triangles, primitive, true),
                Topology::Lines => push_indexed(&mut geometry.lines, primitive, false),
                Topology::Points => push_points(&mut geometry.points, primitive),
            }
        }
        geometry.build_meshes(data);
        geometry
    }

    fn build_meshes(&mut self, data: &RenderData) {
        let meshes: Vec<_> = data
            .meshes
            .iter()
            .filter(|mesh| match mesh.validate() {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("skipping mesh of part {}: {err}", mesh.part_uid);
                    false
                }
            })
            .collect();

        let surface_start = self.mesh_len();
        for mesh in &meshes {
            for item in &mesh.surface {
                self.push_mesh_item(item, mesh.part_uid, mesh.surface_color, true);
            }
        }
        let wireframe_start = self.mesh_len();
        for mesh in &meshes {
            for item in &mesh.wireframe {
                self.push_mesh_item(item, mesh.part_uid, mesh.line_color, false);
            }
        }
        let nodes_start = self.mesh_len();
        for mesh in &meshes {
            for item in &mesh.nodes {
                self.push_mesh_item(item, mesh.part_uid, mesh.node_color, false);
            }
        }
        self.mesh_layout = MeshLayout {
            surface: surface_start..wireframe_start,
            wireframe: wireframe_start..nodes_start,
            nodes: nodes_start..self.mesh_len(),
        };
    }

    #[allow(clippy::cast_possible_truncation)]
    fn mesh_len(&self) -> u32 {
        self.mesh_vertices.len() as u32
    }

    fn push_mesh_item(&mut self, item: &MeshItem, part_uid: EntityUid, color: Vec4, lit: bool) {
        let start = self.mesh_len();
        let pick_id = item.key.pick_words();
        let normals = if lit && item.normals.is_empty() {
            flat_normals(&item.positions)
        } else {
            item.normals.clone()
        };
        for (i, &position) in item.positions.iter().enumerate() {
            let normal = normals.get(i).copied().unwrap_or(Vec3::ZERO);
            self.mesh_vertices
                .push(Vertex::new(position, normal, color, pick_id));
        }
        self.mesh_ranges.push(DrawRange {
            start,
            count: self.mesh_len() - start,
            key: item.key,
            part_uid,
            solid_uid: 0,
            wire_uids: Vec::new(),
        });
    }

    /// Mesh ranges lying in `layer`.
    pub fn mesh_ranges_in(&self, layer: &Range<u32>) -> impl Iterator<Item = &DrawRange> {
        let layer = layer.clone();
        self.mesh_ranges
            .iter()
            .filter(move |r| r.start >= layer.start && r.start < layer.end)
    }

    /// Finds the first range drawn for `key`, searching every bucket.
    #[must_use]
    pub fn find_range(&self, key: &EntityKey) -> Option<&DrawRange> {
        self.triangles
            .ranges
            .iter()
            .chain(&self.lines.ranges)
            .chain(&self.points.ranges)
            .chain(&self.mesh_ranges)
            .find(|range| range.key == *key)
    }

    /// Edges forming `wire_uid`.
    #[must_use]
    pub fn edges_of_wire(&self, wire_uid: EntityUid) -> &[EntityUid] {
        self.wire_edges.get(&wire_uid).map_or(&[], Vec::as_slice)
    }

    /// Returns true if there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.ranges.is_empty()
            && self.lines.ranges.is_empty()
            && self.points.ranges.is_empty()
            && self.mesh_ranges.is_empty()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn push_indexed(bucket: &mut Bucket, primitive: &RenderPrimitive, lit: bool) {
    let base = bucket.vertices.len() as u32;
    let start = bucket.indices.len() as u32;
    let pick_id = primitive.key.pick_words();
    let generated = if lit && primitive.normals.is_empty() {
        smooth_normals(&primitive.positions, &primitive.indices)
    } else {
        Vec::new()
    };
    for (i, &position) in primitive.positions.iter().enumerate() {
        let normal = generated
            .get(i)
            .copied()
            .unwrap_or_else(|| primitive.vertex_normal(i));
        bucket.vertices.push(Vertex::new(
            position,
            normal,
            primitive.vertex_color(i),
            pick_id,
        ));
    }
    bucket
        .indices
        .extend(primitive.indices.iter().map(|&i| base + i));
    bucket.ranges.push(range_for(primitive, start, primitive.indices.len() as u32));
}

#[allow(clippy::cast_possible_truncation)]
fn push_points(bucket: &mut Bucket, primitive: &RenderPrimitive) {
    let start = bucket.vertices.len() as u32;
    let pick_id = primitive.key.pick_words();
    for (i, &position) in primitive.positions.iter().enumerate() {
        bucket.vertices.push(Vertex::new(
            position,
            Vec3::ZERO,
            primitive.vertex_color(i),
            pick_id,
        ));
    }
    bucket.ranges.push(range_for(primitive, start, primitive.positions.len() as u32));
}

fn range_for(primitive: &RenderPrimitive, start: u32, count: u32) -> DrawRange {
    DrawRange {
        start,
        count,
        key: primitive.key,
        part_uid: primitive.part_uid,
        solid_uid: primitive.solid_uid,
        wire_uids: primitive.wire_uids.clone(),
    }
}

/// Area-weighted vertex normals of an indexed triangle list.
fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals.iter().map(|n| n.normalize_or_zero()).collect()
}

/// Per-triangle normals of an unindexed triangle list.
fn flat_normals(positions: &[Vec3]) -> Vec<Vec3> {
    positions
        .chunks_exact(3)
        .flat_map(|tri| {
            let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or_zero();
            [n; 3]
        })
        .collect()
}

/// Merges ranges that touch or overlap, keeping first-seen order of starts.
#[must_use]
pub fn merge_ranges(ranges: impl IntoIterator<Item = Range<u32>>) -> Vec<Range<u32>> {
    let mut merged: Vec<Range<u32>> = Vec::new();
    for range in ranges {
        if range.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if range.start <= last.end && range.start >= last.start => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadview_core::{MeshRenderData, PickResult, RenderEntityType};

    fn key(uid: EntityUid, entity_type: RenderEntityType) -> EntityKey {
        PickResult::new(uid, entity_type)
    }

    fn quad(uid: EntityUid) -> RenderPrimitive {
        RenderPrimitive::triangles(
            key(uid, RenderEntityType::Face),
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![0, 1, 2, 0, 2, 3],
        )
        .with_part(100)
    }

    fn sample() -> RenderData {
        let mut mesh = MeshRenderData::new(200);
        mesh.surface.push(MeshItem::new(
            key(300, RenderEntityType::MeshTriangle),
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        ));
        mesh.wireframe.push(MeshItem::new(
            key(301, RenderEntityType::MeshLine),
            vec![Vec3::ZERO, Vec3::X],
        ));
        mesh.nodes.push(MeshItem::new(key(302, RenderEntityType::MeshNode), vec![Vec3::ZERO]));
        mesh.nodes.push(MeshItem::new(key(303, RenderEntityType::MeshNode), vec![Vec3::X]));

        RenderData::new(4)
            .with_primitive(quad(1))
            .with_primitive(quad(2))
            .with_primitive(
                RenderPrimitive::lines(
                    key(10, RenderEntityType::Edge),
                    vec![Vec3::ZERO, Vec3::X],
                    vec![0, 1],
                )
                .with_wires([50]),
            )
            .with_primitive(RenderPrimitive::points(
                key(20, RenderEntityType::Vertex),
                vec![Vec3::ZERO],
            ))
            .with_mesh(mesh)
    }

    #[test]
    fn test_indices_are_rebased_per_primitive() {
        let geometry = SceneGeometry::build(&sample());
        assert_eq!(geometry.version, Some(4));
        assert_eq!(geometry.triangles.vertices.len(), 8);
        assert_eq!(&geometry.triangles.indices[6..], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(geometry.triangles.ranges[1].range(), 6..12);
        assert_eq!(geometry.triangles.ranges[1].part_uid, 100);
    }

    #[test]
    fn test_vertices_carry_pick_ids() {
        let geometry = SceneGeometry::build(&sample());
        let expected = key(2, RenderEntityType::Face).pick_words();
        assert!(geometry.triangles.vertices[4..].iter().all(|v| v.pick_id == expected));
        assert_eq!(
            geometry.points.vertices[0].pick_id,
            key(20, RenderEntityType::Vertex).pick_words()
        );
    }

    #[test]
    fn test_generated_normals_face_the_plane_normal() {
        let geometry = SceneGeometry::build(&sample());
        for vertex in &geometry.triangles.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_contiguous_ranges_merge_into_one_batch() {
        let geometry = SceneGeometry::build(&sample());
        assert_eq!(geometry.triangles.batches(), vec![0..12]);
        assert_eq!(merge_ranges([0..3, 3..6, 9..12, 12..15]), vec![0..6, 9..15]);
        assert_eq!(merge_ranges([0..3, 6..6, 3..4]), vec![0..4]);
        assert_eq!(merge_ranges([6..9, 0..3]), vec![6..9, 0..3]);
    }

    #[test]
    fn test_mesh_layout_orders_layers() {
        let geometry = SceneGeometry::build(&sample());
        assert_eq!(
            geometry.mesh_layout,
            MeshLayout {
                surface: 0..3,
                wireframe: 3..5,
                nodes: 5..7,
            }
        );
        let nodes: Vec<_> = geometry
            .mesh_ranges_in(&geometry.mesh_layout.nodes)
            .map(|r| r.key.uid)
            .collect();
        assert_eq!(nodes, vec![302, 303]);
        assert!(geometry.mesh_ranges.iter().all(|r| r.part_uid == 200));
    }

    #[test]
    fn test_invalid_primitives_are_skipped() {
        let mut broken = quad(3);
        broken.indices.push(99);
        let data = RenderData::new(1).with_primitive(broken).with_primitive(quad(4));
        let geometry = SceneGeometry::build(&data);
        assert_eq!(geometry.triangles.ranges.len(), 1);
        assert_eq!(geometry.triangles.ranges[0].key.uid, 4);
    }

    #[test]
    fn test_lookups() {
        let geometry = SceneGeometry::build(&sample());
        assert_eq!(geometry.edges_of_wire(50), &[10]);
        assert!(geometry.edges_of_wire(51).is_empty());
        let edge = geometry.find_range(&key(10, RenderEntityType::Edge)).unwrap();
        assert_eq!(edge.wire_uids, vec![50]);
        assert!(geometry.find_range(&key(10, RenderEntityType::Face)).is_none());
        assert!(!geometry.is_empty());
        assert!(SceneGeometry::default().is_empty());
    }
}
