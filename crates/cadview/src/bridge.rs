//! UI-facing pick and selection surface.
//!
//! [`PickBridge`] speaks in type names and plain uids so a UI layer never
//! handles masks or packed ids. Manager notifications arrive on whatever
//! thread mutated the selection; the bridge forwards them into a channel the
//! GUI thread drains with [`PickBridge::drain_events`].

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use cadview_core::{
    CadviewError, EntityUid, PickInput, PickResult, RenderEntityType, RenderEntityTypeMask,
    Result, SelectionAction, SelectionManager, SlotId,
};

/// One selected entity as the UI sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub uid: EntityUid,
}

impl From<PickResult> for SelectionEntry {
    fn from(result: PickResult) -> Self {
        Self {
            entity_type: result.entity_type.name().to_string(),
            uid: result.uid,
        }
    }
}

/// Notification forwarded to the GUI thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum BridgeEvent {
    PickModeChanged { enabled: bool, pick_types: Vec<String> },
    /// The full selection after a change.
    SelectionChanged(Vec<SelectionEntry>),
    EntitySelected(SelectionEntry),
    EntityRemoved(SelectionEntry),
    /// The hovered entity, `None` when nothing is hovered.
    HoverChanged(Option<SelectionEntry>),
}

fn selection_list_of(manager: &SelectionManager) -> Vec<SelectionEntry> {
    let mut list: Vec<SelectionEntry> = manager.selections().into_iter().map(Into::into).collect();
    list.sort_by(|a, b| a.entity_type.cmp(&b.entity_type).then(a.uid.cmp(&b.uid)));
    list
}

fn type_names(mask: RenderEntityTypeMask) -> Vec<String> {
    mask.names().into_iter().map(str::to_string).collect()
}

/// Pick-mode control, selection queries and events for the UI layer.
pub struct PickBridge {
    manager: Arc<SelectionManager>,
    events: Receiver<BridgeEvent>,
    slots: [SlotId; 3],
}

impl PickBridge {
    /// Subscribes to `manager`. Events are queued until drained.
    #[must_use]
    pub fn new(manager: Arc<SelectionManager>) -> Self {
        let (tx, events) = mpsc::channel();
        let slots = [
            Self::forward_pick_mode(&manager, tx.clone()),
            Self::forward_selection(&manager, tx.clone()),
            Self::forward_hover(&manager, tx),
        ];
        Self {
            manager,
            events,
            slots,
        }
    }

    fn forward_pick_mode(manager: &Arc<SelectionManager>, tx: Sender<BridgeEvent>) -> SlotId {
        manager.pick_mode_changed().connect(move |event| {
            let _ = tx.send(BridgeEvent::PickModeChanged {
                enabled: event.enabled,
                pick_types: type_names(event.pick_types),
            });
        })
    }

    fn forward_selection(manager: &Arc<SelectionManager>, tx: Sender<BridgeEvent>) -> SlotId {
        // Weak: the manager owns this slot.
        let weak: Weak<SelectionManager> = Arc::downgrade(manager);
        manager.selection_changed().connect(move |event| {
            match event.action {
                SelectionAction::Added => {
                    let _ = tx.send(BridgeEvent::EntitySelected(event.result.into()));
                }
                SelectionAction::Removed => {
                    let _ = tx.send(BridgeEvent::EntityRemoved(event.result.into()));
                }
                SelectionAction::Cleared => {}
            }
            if let Some(manager) = weak.upgrade() {
                let _ = tx.send(BridgeEvent::SelectionChanged(selection_list_of(&manager)));
            }
        })
    }

    fn forward_hover(manager: &Arc<SelectionManager>, tx: Sender<BridgeEvent>) -> SlotId {
        manager.hover_changed().connect(move |hover| {
            let entity = hover.entity.is_hit().then(|| hover.entity.into());
            let _ = tx.send(BridgeEvent::HoverChanged(entity));
        })
    }

    pub fn manager(&self) -> &Arc<SelectionManager> {
        &self.manager
    }

    /// Every event queued since the last drain, oldest first.
    pub fn drain_events(&self) -> Vec<BridgeEvent> {
        self.events.try_iter().collect()
    }

    // ========== Pick mode ==========

    pub fn set_pick_enabled(&self, enabled: bool) {
        self.manager.set_pick_enabled(enabled);
    }

    pub fn is_pick_enabled(&self) -> bool {
        self.manager.is_pick_enabled()
    }

    /// Sets pickable types from an integer mask or a list of type names.
    ///
    /// Returns the names actually active after the exclusivity rules.
    pub fn set_pick_types_json(&self, value: &serde_json::Value) -> Result<Vec<String>> {
        let requested = match value {
            serde_json::Value::Number(n) => {
                let raw = n.as_u64().ok_or_else(|| {
                    CadviewError::MalformedPickTypeRequest(format!("{n} is not a non-negative integer"))
                })?;
                RenderEntityTypeMask::from_raw(raw)?
            }
            serde_json::Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str().ok_or_else(|| {
                            CadviewError::MalformedPickTypeRequest(format!("{item} is not a type name"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                RenderEntityTypeMask::from_names(names)?
            }
            other => {
                return Err(CadviewError::MalformedPickTypeRequest(format!(
                    "expected an integer or a list of names, got {other}"
                )))
            }
        };
        Ok(type_names(self.manager.set_pick_types(requested)))
    }

    /// Sets pickable types from type names.
    pub fn set_pick_type_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        let requested = RenderEntityTypeMask::from_names(names)?;
        Ok(type_names(self.manager.set_pick_types(requested)))
    }

    /// Names of the currently pickable types.
    pub fn pick_types(&self) -> Vec<String> {
        type_names(self.manager.pick_types())
    }

    // ========== Selection ==========

    /// The selection sorted by type name, then uid.
    pub fn selection_list(&self) -> Vec<SelectionEntry> {
        selection_list_of(&self.manager)
    }

    pub fn is_selected(&self, type_name: &str, uid: EntityUid) -> Result<bool> {
        let entity_type: RenderEntityType = type_name.parse()?;
        Ok(self.manager.is_selected(&PickResult::new(uid, entity_type)))
    }

    pub fn selection_count(&self) -> usize {
        self.manager.selection_count()
    }

    pub fn clear_selection(&self) {
        self.manager.clear_selection();
    }

    /// A validated click for the render thread.
    ///
    /// `filter` is a single type name restricting this click.
    pub fn pick_request(&self, x: u32, y: u32, radius: u32, filter: Option<&str>) -> Result<PickInput> {
        let mut input = PickInput::at(x, y).with_radius(radius);
        if let Some(name) = filter {
            let entity_type: RenderEntityType = name.parse()?;
            input = input.with_filter(entity_type.mask());
        }
        Ok(input)
    }
}

impl Drop for PickBridge {
    fn drop(&mut self) {
        let [pick_mode, selection, hover] = self.slots;
        self.manager.pick_mode_changed().disconnect(pick_mode);
        self.manager.selection_changed().disconnect(selection);
        self.manager.hover_changed().disconnect(hover);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_type_name() {
        let entry = SelectionEntry::from(PickResult::new(42, RenderEntityType::Face));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "face", "uid": 42 }));
    }

    #[test]
    fn test_event_serialization() {
        let event = BridgeEvent::HoverChanged(None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "hover_changed", "data": null }));
    }
}
