//! Entity type enumerations for the geometry and mesh domains.
//!
//! BRep geometry and FEM mesh entities share one byte-sized type space so that
//! both can travel through the same pick buffer:
//!
//! | value | type            |
//! |-------|-----------------|
//! | 0–8   | geometry (BRep) |
//! | 9–16  | mesh (FEM)      |
//! | 17    | `None`          |

use std::fmt;
use std::str::FromStr;

use crate::error::CadviewError;

/// Topological type of a BRep entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntityType {
    Vertex = 0,
    Edge = 1,
    Wire = 2,
    Face = 3,
    Shell = 4,
    Solid = 5,
    CompSolid = 6,
    Compound = 7,
    Part = 8,
}

impl EntityType {
    /// All geometry types in value order.
    pub const ALL: [EntityType; 9] = [
        EntityType::Vertex,
        EntityType::Edge,
        EntityType::Wire,
        EntityType::Face,
        EntityType::Shell,
        EntityType::Solid,
        EntityType::CompSolid,
        EntityType::Compound,
        EntityType::Part,
    ];
}

/// Type of an FEM mesh entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MeshEntityType {
    Node = 0,
    Line = 1,
    Triangle = 2,
    Quad4 = 3,
    Tetra4 = 4,
    Hexa8 = 5,
    Prism6 = 6,
    Pyramid5 = 7,
}

impl MeshEntityType {
    /// All mesh types in value order.
    pub const ALL: [MeshEntityType; 8] = [
        MeshEntityType::Node,
        MeshEntityType::Line,
        MeshEntityType::Triangle,
        MeshEntityType::Quad4,
        MeshEntityType::Tetra4,
        MeshEntityType::Hexa8,
        MeshEntityType::Prism6,
        MeshEntityType::Pyramid5,
    ];

    /// Returns true for 2D and 3D elements (everything except nodes and lines).
    #[must_use]
    pub fn is_element(self) -> bool {
        !matches!(self, MeshEntityType::Node | MeshEntityType::Line)
    }
}

/// A type from either domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainEntityType {
    Geometry(EntityType),
    Mesh(MeshEntityType),
}

/// Unified entity type carried through rendering and picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum RenderEntityType {
    Vertex = 0,
    Edge = 1,
    Wire = 2,
    Face = 3,
    Shell = 4,
    Solid = 5,
    CompSolid = 6,
    Compound = 7,
    Part = 8,
    MeshNode = 9,
    MeshLine = 10,
    MeshTriangle = 11,
    MeshQuad4 = 12,
    MeshTetra4 = 13,
    MeshHexa8 = 14,
    MeshPrism6 = 15,
    MeshPyramid5 = 16,
    /// No entity (background, nothing hovered).
    #[default]
    None = 17,
}

impl RenderEntityType {
    /// Every real type, `None` excluded, in value order.
    pub const ALL: [RenderEntityType; 17] = [
        RenderEntityType::Vertex,
        RenderEntityType::Edge,
        RenderEntityType::Wire,
        RenderEntityType::Face,
        RenderEntityType::Shell,
        RenderEntityType::Solid,
        RenderEntityType::CompSolid,
        RenderEntityType::Compound,
        RenderEntityType::Part,
        RenderEntityType::MeshNode,
        RenderEntityType::MeshLine,
        RenderEntityType::MeshTriangle,
        RenderEntityType::MeshQuad4,
        RenderEntityType::MeshTetra4,
        RenderEntityType::MeshHexa8,
        RenderEntityType::MeshPrism6,
        RenderEntityType::MeshPyramid5,
    ];

    /// Decodes a type byte. Values outside 0–16 decode to `None`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => RenderEntityType::Vertex,
            1 => RenderEntityType::Edge,
            2 => RenderEntityType::Wire,
            3 => RenderEntityType::Face,
            4 => RenderEntityType::Shell,
            5 => RenderEntityType::Solid,
            6 => RenderEntityType::CompSolid,
            7 => RenderEntityType::Compound,
            8 => RenderEntityType::Part,
            9 => RenderEntityType::MeshNode,
            10 => RenderEntityType::MeshLine,
            11 => RenderEntityType::MeshTriangle,
            12 => RenderEntityType::MeshQuad4,
            13 => RenderEntityType::MeshTetra4,
            14 => RenderEntityType::MeshHexa8,
            15 => RenderEntityType::MeshPrism6,
            16 => RenderEntityType::MeshPyramid5,
            _ => RenderEntityType::None,
        }
    }

    /// Returns the type byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns true for geometry-domain values (0–8).
    #[must_use]
    pub const fn is_geometry(self) -> bool {
        (self as u8) <= RenderEntityType::Part as u8
    }

    /// Returns true for mesh-domain values (9–16).
    #[must_use]
    pub const fn is_mesh(self) -> bool {
        let v = self as u8;
        v >= RenderEntityType::MeshNode as u8 && v <= RenderEntityType::MeshPyramid5 as u8
    }

    /// Splits the unified type into its domain. `None` has no domain.
    #[must_use]
    pub fn domain(self) -> Option<DomainEntityType> {
        if let Some(t) = self.geometry() {
            return Some(DomainEntityType::Geometry(t));
        }
        self.mesh().map(DomainEntityType::Mesh)
    }

    /// Converts to the geometry-domain type.
    #[must_use]
    pub fn geometry(self) -> Option<EntityType> {
        match self {
            RenderEntityType::Vertex => Some(EntityType::Vertex),
            RenderEntityType::Edge => Some(EntityType::Edge),
            RenderEntityType::Wire => Some(EntityType::Wire),
            RenderEntityType::Face => Some(EntityType::Face),
            RenderEntityType::Shell => Some(EntityType::Shell),
            RenderEntityType::Solid => Some(EntityType::Solid),
            RenderEntityType::CompSolid => Some(EntityType::CompSolid),
            RenderEntityType::Compound => Some(EntityType::Compound),
            RenderEntityType::Part => Some(EntityType::Part),
            _ => None,
        }
    }

    /// Converts to the mesh-domain type.
    #[must_use]
    pub fn mesh(self) -> Option<MeshEntityType> {
        match self {
            RenderEntityType::MeshNode => Some(MeshEntityType::Node),
            RenderEntityType::MeshLine => Some(MeshEntityType::Line),
            RenderEntityType::MeshTriangle => Some(MeshEntityType::Triangle),
            RenderEntityType::MeshQuad4 => Some(MeshEntityType::Quad4),
            RenderEntityType::MeshTetra4 => Some(MeshEntityType::Tetra4),
            RenderEntityType::MeshHexa8 => Some(MeshEntityType::Hexa8),
            RenderEntityType::MeshPrism6 => Some(MeshEntityType::Prism6),
            RenderEntityType::MeshPyramid5 => Some(MeshEntityType::Pyramid5),
            _ => None,
        }
    }

    /// Name used at the UI boundary.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RenderEntityType::Vertex => "vertex",
            RenderEntityType::Edge => "edge",
            RenderEntityType::Wire => "wire",
            RenderEntityType::Face => "face",
            RenderEntityType::Shell => "shell",
            RenderEntityType::Solid => "solid",
            RenderEntityType::CompSolid => "compsolid",
            RenderEntityType::Compound => "compound",
            RenderEntityType::Part => "part",
            RenderEntityType::MeshNode => "mesh_node",
            RenderEntityType::MeshLine => "mesh_line",
            RenderEntityType::MeshTriangle => "mesh_triangle",
            RenderEntityType::MeshQuad4 => "mesh_quad4",
            RenderEntityType::MeshTetra4 => "mesh_tetra4",
            RenderEntityType::MeshHexa8 => "mesh_hexa8",
            RenderEntityType::MeshPrism6 => "mesh_prism6",
            RenderEntityType::MeshPyramid5 => "mesh_pyramid5",
            RenderEntityType::None => "none",
        }
    }
}

impl From<EntityType> for RenderEntityType {
    fn from(value: EntityType) -> Self {
        match value {
            EntityType::Vertex => RenderEntityType::Vertex,
            EntityType::Edge => RenderEntityType::Edge,
            EntityType::Wire => RenderEntityType::Wire,
            EntityType::Face => RenderEntityType::Face,
            EntityType::Shell => RenderEntityType::Shell,
            EntityType::Solid => RenderEntityType::Solid,
            EntityType::CompSolid => RenderEntityType::CompSolid,
            EntityType::Compound => RenderEntityType::Compound,
            EntityType::Part => RenderEntityType::Part,
        }
    }
}

impl From<MeshEntityType> for RenderEntityType {
    fn from(value: MeshEntityType) -> Self {
        match value {
            MeshEntityType::Node => RenderEntityType::MeshNode,
            MeshEntityType::Line => RenderEntityType::MeshLine,
            MeshEntityType::Triangle => RenderEntityType::MeshTriangle,
            MeshEntityType::Quad4 => RenderEntityType::MeshQuad4,
            MeshEntityType::Tetra4 => RenderEntityType::MeshTetra4,
            MeshEntityType::Hexa8 => RenderEntityType::MeshHexa8,
            MeshEntityType::Prism6 => RenderEntityType::MeshPrism6,
            MeshEntityType::Pyramid5 => RenderEntityType::MeshPyramid5,
        }
    }
}

impl From<DomainEntityType> for RenderEntityType {
    fn from(value: DomainEntityType) -> Self {
        match value {
            DomainEntityType::Geometry(t) => t.into(),
            DomainEntityType::Mesh(t) => t.into(),
        }
    }
}

impl fmt::Display for RenderEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenderEntityType {
    type Err = CadviewError;

    /// Parses a UI type name. `"none"` is not accepted: it names no entity.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        RenderEntityType::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| CadviewError::UnknownEntityType(s.to_string()))
    }
}
