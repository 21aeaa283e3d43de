//! Bit masks over [`RenderEntityType`] values.

use bitflags::bitflags;

use crate::entity::RenderEntityType;
use crate::error::{CadviewError, Result};

bitflags! {
    /// One bit per [`RenderEntityType`] value (`1 << value`).
    ///
    /// Used both for "which types are currently pickable" and for "which
    /// combination of types did an operation touch".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderEntityTypeMask: u32 {
        const VERTEX = 1 << 0;
        const EDGE = 1 << 1;
        const WIRE = 1 << 2;
        const FACE = 1 << 3;
        const SHELL = 1 << 4;
        const SOLID = 1 << 5;
        const COMPSOLID = 1 << 6;
        const COMPOUND = 1 << 7;
        const PART = 1 << 8;
        const MESH_NODE = 1 << 9;
        const MESH_LINE = 1 << 10;
        const MESH_TRIANGLE = 1 << 11;
        const MESH_QUAD4 = 1 << 12;
        const MESH_TETRA4 = 1 << 13;
        const MESH_HEXA8 = 1 << 14;
        const MESH_PRISM6 = 1 << 15;
        const MESH_PYRAMID5 = 1 << 16;
    }
}

/// All 2D/3D mesh element bits; nodes and lines are not elements.
pub const RENDER_MESH_ELEMENTS: RenderEntityTypeMask = RenderEntityTypeMask::MESH_TRIANGLE
    .union(RenderEntityTypeMask::MESH_QUAD4)
    .union(RenderEntityTypeMask::MESH_TETRA4)
    .union(RenderEntityTypeMask::MESH_HEXA8)
    .union(RenderEntityTypeMask::MESH_PRISM6)
    .union(RenderEntityTypeMask::MESH_PYRAMID5);

/// Every mesh-domain bit.
pub const RENDER_MESH: RenderEntityTypeMask = RENDER_MESH_ELEMENTS
    .union(RenderEntityTypeMask::MESH_NODE)
    .union(RenderEntityTypeMask::MESH_LINE);

/// Every geometry-domain bit.
pub const RENDER_GEOMETRY: RenderEntityTypeMask = RenderEntityTypeMask::all().difference(RENDER_MESH);

/// Geometry types that may be picked together.
pub const RENDER_COMBINABLE: RenderEntityTypeMask = RenderEntityTypeMask::VERTEX
    .union(RenderEntityTypeMask::EDGE)
    .union(RenderEntityTypeMask::FACE);

impl RenderEntityType {
    /// The mask bit for this type; `None` has no bit.
    #[must_use]
    pub const fn mask(self) -> RenderEntityTypeMask {
        match self {
            RenderEntityType::None => RenderEntityTypeMask::empty(),
            other => RenderEntityTypeMask::from_bits_retain(1 << other.as_u8()),
        }
    }
}

impl From<RenderEntityType> for RenderEntityTypeMask {
    fn from(value: RenderEntityType) -> Self {
        value.mask()
    }
}

impl RenderEntityTypeMask {
    /// Returns true if the bit for `entity_type` is set.
    #[must_use]
    pub fn contains_type(self, entity_type: RenderEntityType) -> bool {
        let bit = entity_type.mask();
        !bit.is_empty() && self.contains(bit)
    }

    /// Iterates over the types whose bit is set, in value order.
    pub fn types(self) -> impl Iterator<Item = RenderEntityType> {
        RenderEntityType::ALL
            .into_iter()
            .filter(move |t| self.contains_type(*t))
    }

    /// Names of the types whose bit is set, in value order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        self.types().map(RenderEntityType::name).collect()
    }

    /// Builds a mask from UI type names.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::empty(), |mask, name| {
            let entity_type: RenderEntityType = name.as_ref().parse()?;
            Ok(mask | entity_type.mask())
        })
    }

    /// Builds a mask from a raw integer, rejecting bits that name no type.
    pub fn from_raw(raw: u64) -> Result<Self> {
        u32::try_from(raw)
            .ok()
            .and_then(Self::from_bits)
            .ok_or(CadviewError::InvalidPickTypeMask(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_per_value() {
        for t in RenderEntityType::ALL {
            assert_eq!(t.mask().bits(), 1 << t.as_u8());
        }
        assert!(RenderEntityType::None.mask().is_empty());
        assert!(!RenderEntityTypeMask::all().contains_type(RenderEntityType::None));
    }

    #[test]
    fn test_mesh_elements_exclude_node_and_line() {
        assert!(!RENDER_MESH_ELEMENTS.contains(RenderEntityTypeMask::MESH_NODE));
        assert!(!RENDER_MESH_ELEMENTS.contains(RenderEntityTypeMask::MESH_LINE));
        assert_eq!(RENDER_MESH_ELEMENTS.types().count(), 6);
        for t in RENDER_MESH_ELEMENTS.types() {
            assert!(t.mesh().is_some_and(crate::entity::MeshEntityType::is_element));
        }
    }

    #[test]
    fn test_domains_partition_all_bits() {
        assert!(RENDER_GEOMETRY.intersection(RENDER_MESH).is_empty());
        assert_eq!(RENDER_GEOMETRY | RENDER_MESH, RenderEntityTypeMask::all());
        assert!(RENDER_GEOMETRY.types().all(RenderEntityType::is_geometry));
        assert!(RENDER_MESH.types().all(RenderEntityType::is_mesh));
    }

    #[test]
    fn test_from_names() {
        let mask = RenderEntityTypeMask::from_names(["vertex", "face", "mesh_node"]).unwrap();
        assert_eq!(
            mask,
            RenderEntityTypeMask::VERTEX | RenderEntityTypeMask::FACE | RenderEntityTypeMask::MESH_NODE
        );
        assert_eq!(mask.names(), vec!["vertex", "face", "mesh_node"]);
        assert!(RenderEntityTypeMask::from_names(["vertex", "blob"]).is_err());
    }

    #[test]
    fn test_from_raw_rejects_unknown_bits() {
        assert_eq!(
            RenderEntityTypeMask::from_raw(0b1000).unwrap(),
            RenderEntityTypeMask::FACE
        );
        assert!(RenderEntityTypeMask::from_raw(1 << 17).is_err());
        assert!(RenderEntityTypeMask::from_raw(u64::from(u32::MAX) + 1).is_err());
    }
}
