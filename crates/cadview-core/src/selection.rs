//! Selection and hover state shared by the GUI and render threads.
//!
//! [`SelectionManager`] is an explicitly constructed service: the application
//! creates one and hands `Arc` clones to the render scene and the UI bridge.
//! Every public method takes the single internal mutex for its duration and
//! releases it before any signal fires, so subscribers may call back into the
//! manager.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::entity::RenderEntityType;
use crate::mask::{RenderEntityTypeMask, RENDER_COMBINABLE, RENDER_MESH_ELEMENTS};
use crate::pick::{EntityKey, EntityUid, PickResult};
use crate::signal::Signal;

/// What happened to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionAction {
    Added,
    Removed,
    Cleared,
}

/// Payload of [`SelectionManager::selection_changed`].
///
/// `Cleared` events carry [`PickResult::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub result: PickResult,
    pub action: SelectionAction,
}

/// Payload of [`SelectionManager::pick_mode_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickModeEvent {
    pub enabled: bool,
    pub pick_types: RenderEntityTypeMask,
}

/// Current hover target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoverState {
    /// Hovered entity, [`PickResult::NONE`] when nothing is hovered.
    pub entity: PickResult,
    /// Part owning the hovered entity, 0 if unknown.
    pub part_uid: EntityUid,
    /// Wire owning the hovered entity, 0 if none.
    pub wire_uid: EntityUid,
    /// Edges of the hovered wire, highlighted together with it.
    pub wire_edges: HashSet<EntityUid>,
}

impl HoverState {
    /// Hover target with owner uids and no wire edges.
    #[must_use]
    pub fn new(entity: PickResult, part_uid: EntityUid, wire_uid: EntityUid) -> Self {
        Self {
            entity,
            part_uid,
            wire_uid,
            wire_edges: HashSet::new(),
        }
    }

    /// Sets the edges highlighted along with a hovered wire.
    #[must_use]
    pub fn with_wire_edges(mut self, edges: impl IntoIterator<Item = EntityUid>) -> Self {
        self.wire_edges = edges.into_iter().collect();
        self
    }
}

/// Resolves a requested pick-type mask against the previously active one.
///
/// Rules are evaluated on the bits that are *newly* requested:
/// 1. any new mesh node/line/element bit: keep only new mesh bits (the element
///    group is kept as requested once any element bit is new);
/// 2. new `Part`: `{Part}`;
/// 3. new `Solid`: `{Solid}`;
/// 4. new `Wire`: `{Wire}`;
/// 5. otherwise the request restricted to `{Vertex, Edge, Face}`.
///
/// Requesting the active mask again returns it unchanged.
#[must_use]
pub fn normalize_pick_types(
    previous: RenderEntityTypeMask,
    requested: RenderEntityTypeMask,
) -> RenderEntityTypeMask {
    if requested == previous {
        return previous;
    }
    let newly = requested.difference(previous);
    let node_line = RenderEntityTypeMask::MESH_NODE | RenderEntityTypeMask::MESH_LINE;

    if newly.intersects(node_line | RENDER_MESH_ELEMENTS) {
        let mut result = newly.intersection(node_line);
        if newly.intersects(RENDER_MESH_ELEMENTS) {
            result |= requested.intersection(RENDER_MESH_ELEMENTS);
        }
        return result;
    }
    for exclusive in [
        RenderEntityTypeMask::PART,
        RenderEntityTypeMask::SOLID,
        RenderEntityTypeMask::WIRE,
    ] {
        if newly.contains(exclusive) {
            return exclusive;
        }
    }
    requested.intersection(RENDER_COMBINABLE)
}

#[derive(Debug)]
struct State {
    pick_enabled: bool,
    pick_types: RenderEntityTypeMask,
    selections: HashSet<PickResult>,
    selected_wire_edges: HashMap<EntityUid, HashSet<EntityUid>>,
    hover: HoverState,
}

/// Selection set, hover target and pick-mode state.
#[derive(Debug)]
pub struct SelectionManager {
    state: Mutex<State>,
    selection_changed: Signal<SelectionEvent>,
    hover_changed: Signal<HoverState>,
    pick_mode_changed: Signal<PickModeEvent>,
}

impl SelectionManager {
    /// Creates a manager with picking disabled and `{Vertex, Edge, Face}` pickable.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pick_types(RENDER_COMBINABLE)
    }

    /// Creates a manager with picking disabled and the given types pickable.
    #[must_use]
    pub fn with_pick_types(pick_types: RenderEntityTypeMask) -> Self {
        Self {
            state: Mutex::new(State {
                pick_enabled: false,
                pick_types,
                selections: HashSet::new(),
                selected_wire_edges: HashMap::new(),
                hover: HoverState::default(),
            }),
            selection_changed: Signal::new(),
            hover_changed: Signal::new(),
            pick_mode_changed: Signal::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fires on every successful add/remove and on every clear.
    pub fn selection_changed(&self) -> &Signal<SelectionEvent> {
        &self.selection_changed
    }

    /// Fires on every hover update.
    pub fn hover_changed(&self) -> &Signal<HoverState> {
        &self.hover_changed
    }

    /// Fires when picking is toggled or the pickable types change.
    pub fn pick_mode_changed(&self) -> &Signal<PickModeEvent> {
        &self.pick_mode_changed
    }

    // ========== Pick mode ==========

    /// Enables or disables picking.
    ///
    /// Enabling always re-broadcasts the current pick types. Disabling an
    /// already disabled manager is silent.
    pub fn set_pick_enabled(&self, enabled: bool) {
        let event = {
            let mut state = self.lock();
            let changed = state.pick_enabled != enabled;
            state.pick_enabled = enabled;
            (changed || enabled).then_some(PickModeEvent {
                enabled,
                pick_types: state.pick_types,
            })
        };
        if let Some(event) = event {
            log::debug!("pick {} ({:?})", if enabled { "enabled" } else { "disabled" }, event.pick_types);
            self.pick_mode_changed.emit(&event);
        }
    }

    /// Returns whether picking is enabled.
    pub fn is_pick_enabled(&self) -> bool {
        self.lock().pick_enabled
    }

    /// Requests a set of pickable types and returns the normalized mask now in effect.
    pub fn set_pick_types(&self, requested: RenderEntityTypeMask) -> RenderEntityTypeMask {
        let (mask, event) = {
            let mut state = self.lock();
            let mask = normalize_pick_types(state.pick_types, requested);
            let changed = mask != state.pick_types;
            state.pick_types = mask;
            let event = changed.then_some(PickModeEvent {
                enabled: state.pick_enabled,
                pick_types: mask,
            });
            (mask, event)
        };
        if let Some(event) = event {
            if mask != requested {
                log::debug!("pick types {requested:?} normalized to {mask:?}");
            }
            self.pick_mode_changed.emit(&event);
        }
        mask
    }

    /// Returns the currently pickable types.
    pub fn pick_types(&self) -> RenderEntityTypeMask {
        self.lock().pick_types
    }

    // ========== Selection mutation ==========

    /// Adds an entity to the selection.
    ///
    /// Returns false if the type is `None`, not currently pickable, or the
    /// entity is already selected.
    pub fn add_selection(&self, uid: EntityUid, entity_type: RenderEntityType) -> bool {
        self.insert(PickResult::new(uid, entity_type), None)
    }

    /// Adds a wire to the selection together with the edges forming it.
    pub fn add_wire_selection(
        &self,
        wire_uid: EntityUid,
        edges: impl IntoIterator<Item = EntityUid>,
    ) -> bool {
        let edges = edges.into_iter().collect();
        self.insert(PickResult::new(wire_uid, RenderEntityType::Wire), Some(edges))
    }

    fn insert(&self, result: PickResult, wire_edges: Option<HashSet<EntityUid>>) -> bool {
        {
            let mut state = self.lock();
            if result.entity_type == RenderEntityType::None {
                drop(state);
                log::warn!("rejected selection of uid {} with no entity type", result.uid);
                return false;
            }
            if !state.pick_types.contains_type(result.entity_type) {
                let pick_types = state.pick_types;
                drop(state);
                log::warn!(
                    "rejected selection of {} {}: not pickable under {pick_types:?}",
                    result.entity_type,
                    result.uid
                );
                return false;
            }
            if !state.selections.insert(result) {
                return false;
            }
            if result.entity_type == RenderEntityType::Wire {
                state
                    .selected_wire_edges
                    .insert(result.uid, wire_edges.unwrap_or_default());
            }
        }
        self.selection_changed.emit(&SelectionEvent {
            result,
            action: SelectionAction::Added,
        });
        true
    }

    /// Removes an entity from the selection. Returns false if it was not selected.
    pub fn remove_selection(&self, uid: EntityUid, entity_type: RenderEntityType) -> bool {
        let result = PickResult::new(uid, entity_type);
        {
            let mut state = self.lock();
            if !state.selections.remove(&result) {
                drop(state);
                log::warn!("cannot remove {entity_type} {uid}: not selected");
                return false;
            }
            if entity_type == RenderEntityType::Wire {
                state.selected_wire_edges.remove(&uid);
            }
        }
        self.selection_changed.emit(&SelectionEvent {
            result,
            action: SelectionAction::Removed,
        });
        true
    }

    /// Empties the selection. Always notifies, even when it was already empty.
    pub fn clear_selection(&self) {
        {
            let mut state = self.lock();
            state.selections.clear();
            state.selected_wire_edges.clear();
        }
        self.selection_changed.emit(&SelectionEvent {
            result: PickResult::NONE,
            action: SelectionAction::Cleared,
        });
    }

    // ========== Selection queries ==========

    /// Snapshot of the selection, in no particular order.
    pub fn selections(&self) -> Vec<PickResult> {
        self.lock().selections.iter().copied().collect()
    }

    /// Number of selected entities.
    pub fn selection_count(&self) -> usize {
        self.lock().selections.len()
    }

    /// Returns true if the entity itself is selected.
    pub fn is_selected(&self, key: &EntityKey) -> bool {
        self.lock().selections.contains(key)
    }

    /// Returns true if the part is selected.
    pub fn is_part_selected(&self, part_uid: EntityUid) -> bool {
        part_uid != 0
            && self
                .lock()
                .selections
                .contains(&PickResult::new(part_uid, RenderEntityType::Part))
    }

    /// Returns true if the solid is selected.
    pub fn is_solid_selected(&self, solid_uid: EntityUid) -> bool {
        solid_uid != 0
            && self
                .lock()
                .selections
                .contains(&PickResult::new(solid_uid, RenderEntityType::Solid))
    }

    /// Returns true if the wire is selected.
    pub fn is_wire_selected(&self, wire_uid: EntityUid) -> bool {
        wire_uid != 0 && self.lock().selected_wire_edges.contains_key(&wire_uid)
    }

    /// Returns true if the edge belongs to any selected wire.
    pub fn is_edge_in_selected_wire(&self, edge_uid: EntityUid) -> bool {
        self.lock()
            .selected_wire_edges
            .values()
            .any(|edges| edges.contains(&edge_uid))
    }

    // ========== Hover ==========

    /// Replaces the hover target and notifies, even if nothing changed.
    pub fn set_hover_entity(
        &self,
        uid: EntityUid,
        entity_type: RenderEntityType,
        part_uid: EntityUid,
        wire_uid: EntityUid,
    ) {
        self.set_hover(HoverState::new(
            PickResult::new(uid, entity_type),
            part_uid,
            wire_uid,
        ));
    }

    /// Replaces the full hover state (including wire edges) and notifies.
    pub fn set_hover(&self, hover: HoverState) {
        let event = {
            let mut state = self.lock();
            state.hover = hover;
            state.hover.clone()
        };
        self.hover_changed.emit(&event);
    }

    /// Resets hover to the no-hit sentinel and notifies.
    pub fn clear_hover(&self) {
        self.set_hover(HoverState::default());
    }

    /// Snapshot of the hover state.
    pub fn hover(&self) -> HoverState {
        self.lock().hover.clone()
    }

    /// The hovered entity, [`PickResult::NONE`] if none.
    pub fn hovered_entity(&self) -> PickResult {
        self.lock().hover.entity
    }

    /// Returns true if `key` is the hovered entity.
    pub fn is_entity_hovered(&self, key: &EntityKey) -> bool {
        key.is_hit() && self.lock().hover.entity == *key
    }

    /// Returns true if the part itself is hovered.
    pub fn is_part_hovered(&self, part_uid: EntityUid) -> bool {
        if part_uid == 0 {
            return false;
        }
        let state = self.lock();
        state.hover.entity == PickResult::new(part_uid, RenderEntityType::Part)
    }

    /// Returns true if the hovered entity is the solid.
    pub fn is_solid_hovered(&self, solid_uid: EntityUid) -> bool {
        solid_uid != 0
            && self.lock().hover.entity == PickResult::new(solid_uid, RenderEntityType::Solid)
    }

    /// Returns true if the wire is hovered.
    pub fn is_wire_hovered(&self, wire_uid: EntityUid) -> bool {
        if wire_uid == 0 {
            return false;
        }
        let state = self.lock();
        state.hover.wire_uid == wire_uid
            || state.hover.entity == PickResult::new(wire_uid, RenderEntityType::Wire)
    }

    /// Returns true if the edge belongs to the hovered wire.
    pub fn is_edge_in_hovered_wire(&self, edge_uid: EntityUid) -> bool {
        self.lock().hover.wire_edges.contains(&edge_uid)
    }

    /// Snapshot used by the highlight pass: selection plus hover under one lock.
    pub fn highlight_snapshot(&self) -> HighlightSnapshot {
        let state = self.lock();
        HighlightSnapshot {
            selections: state.selections.clone(),
            selected_wire_edges: state
                .selected_wire_edges
                .values()
                .flatten()
                .copied()
                .collect(),
            hover: state.hover.clone(),
        }
    }
}

impl Default for SelectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Consistent copy of selection and hover for one frame.
#[derive(Debug, Clone, Default)]
pub struct HighlightSnapshot {
    pub selections: HashSet<PickResult>,
    pub selected_wire_edges: HashSet<EntityUid>,
    pub hover: HoverState,
}

/// Why a draw range is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    Hovered,
    Selected,
}

/// Ownership of one draw range, as seen by highlight queries.
#[derive(Debug, Clone, Copy)]
pub struct RangeOwner<'a> {
    pub key: EntityKey,
    pub part_uid: EntityUid,
    pub solid_uid: EntityUid,
    pub wire_uids: &'a [EntityUid],
}

impl HighlightSnapshot {
    /// Decides whether a range is highlighted. Hover wins over selection.
    #[must_use]
    pub fn classify(&self, owner: &RangeOwner<'_>) -> Option<HighlightKind> {
        if self.is_hovered(owner) {
            Some(HighlightKind::Hovered)
        } else if self.is_selected(owner) {
            Some(HighlightKind::Selected)
        } else {
            None
        }
    }

    fn is_hovered(&self, owner: &RangeOwner<'_>) -> bool {
        let hover = &self.hover;
        if !hover.entity.is_hit() {
            return false;
        }
        if hover.entity == owner.key {
            return true;
        }
        if owner.key.entity_type == RenderEntityType::Edge
            && hover.wire_edges.contains(&owner.key.uid)
        {
            return true;
        }
        match hover.entity.entity_type {
            RenderEntityType::Part => owner.part_uid != 0 && hover.entity.uid == owner.part_uid,
            RenderEntityType::Solid => owner.solid_uid != 0 && hover.entity.uid == owner.solid_uid,
            RenderEntityType::Wire => owner.wire_uids.contains(&hover.entity.uid),
            _ => false,
        }
    }

    fn is_selected(&self, owner: &RangeOwner<'_>) -> bool {
        if self.selections.contains(&owner.key) {
            return true;
        }
        if owner.key.entity_type == RenderEntityType::Edge
            && self.selected_wire_edges.contains(&owner.key.uid)
        {
            return true;
        }
        let owned_by = |uid: EntityUid, entity_type| {
            uid != 0 && self.selections.contains(&PickResult::new(uid, entity_type))
        };
        owned_by(owner.part_uid, RenderEntityType::Part)
            || owned_by(owner.solid_uid, RenderEntityType::Solid)
            || owner
                .wire_uids
                .iter()
                .any(|&wire| owned_by(wire, RenderEntityType::Wire))
    }
}
