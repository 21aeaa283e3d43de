//! Core types for cadview.
//!
//! This crate holds everything the picking and selection subsystem needs that
//! does not touch the GPU:
//! - entity types, type masks and the pick-id codec
//! - the [`SelectionManager`] with its pick-type exclusivity rules
//! - [`RenderData`] and the per-frame [`SceneFrameState`] snapshot
//! - configuration [`Options`] and the highlight [`ColorMap`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod color_map;
pub mod entity;
pub mod error;
pub mod frame;
pub mod mask;
pub mod options;
pub mod pick;
pub mod render_data;
pub mod selection;
pub mod signal;
pub mod uid;

pub use color_map::ColorMap;
pub use entity::{DomainEntityType, EntityType, MeshEntityType, RenderEntityType};
pub use error::{CadviewError, Result};
pub use frame::{MeshDisplayMode, PickAction, PickInput, SceneFrameState};
pub use mask::{
    RenderEntityTypeMask, RENDER_COMBINABLE, RENDER_GEOMETRY, RENDER_MESH, RENDER_MESH_ELEMENTS,
};
pub use options::Options;
pub use pick::{
    decode_hit, decode_pick_id, encode_pick_id, pack_pick_id, unpack_pick_id, EntityKey,
    EntityUid, PickResult, UID_MASK,
};
pub use render_data::{MeshItem, MeshRenderData, RenderData, RenderPrimitive, Topology};
pub use selection::{
    normalize_pick_types, HighlightKind, HighlightSnapshot, HoverState, PickModeEvent,
    RangeOwner, SelectionAction, SelectionEvent, SelectionManager,
};
pub use signal::{Signal, SlotId};
pub use uid::UidGenerator;

// Re-export glam types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
