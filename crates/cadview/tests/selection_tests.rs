//! Selection manager behaviour as seen by an application.

use std::sync::{Arc, Mutex};

use cadview::{
    normalize_pick_types, PickResult, RenderEntityType, RenderEntityTypeMask, SelectionAction,
    SelectionManager, RENDER_COMBINABLE,
};

#[test]
fn test_exclusivity_rules() {
    let face = RenderEntityTypeMask::FACE;
    let part = RenderEntityTypeMask::PART;
    let vertex = RenderEntityTypeMask::VERTEX;
    let edge = RenderEntityTypeMask::EDGE;
    let node = RenderEntityTypeMask::MESH_NODE;

    assert_eq!(normalize_pick_types(face, face | part), part);
    assert_eq!(normalize_pick_types(vertex, vertex | edge), vertex | edge);
    assert_eq!(normalize_pick_types(face, face | node), node);
    assert_eq!(normalize_pick_types(part, part), part);
}

#[test]
fn test_selection_events_in_order() {
    let manager = SelectionManager::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    manager.selection_changed().connect(move |event| {
        sink.lock().unwrap().push((event.result, event.action));
    });

    assert!(manager.add_selection(1, RenderEntityType::Face));
    assert!(!manager.add_selection(1, RenderEntityType::Face));
    assert!(manager.remove_selection(1, RenderEntityType::Face));
    manager.clear_selection();
    manager.clear_selection();

    let face = PickResult::new(1, RenderEntityType::Face);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            (face, SelectionAction::Added),
            (face, SelectionAction::Removed),
            (PickResult::NONE, SelectionAction::Cleared),
            (PickResult::NONE, SelectionAction::Cleared),
        ]
    );
}

#[test]
fn test_unpickable_types_are_rejected() {
    let manager = SelectionManager::new();
    assert_eq!(manager.pick_types(), RENDER_COMBINABLE);
    assert!(!manager.add_selection(5, RenderEntityType::Part));
    assert!(!manager.add_selection(5, RenderEntityType::None));
    assert_eq!(manager.selection_count(), 0);
}

#[test]
fn test_subscriber_may_query_the_manager() {
    let manager = Arc::new(SelectionManager::new());
    let seen = Arc::new(Mutex::new(0));
    let weak = Arc::downgrade(&manager);
    let count = Arc::clone(&seen);
    manager.selection_changed().connect(move |_| {
        if let Some(manager) = weak.upgrade() {
            *count.lock().unwrap() = manager.selection_count();
        }
    });
    manager.add_selection(3, RenderEntityType::Edge);
    manager.add_selection(4, RenderEntityType::Edge);
    assert_eq!(*seen.lock().unwrap(), 2);
}

#[test]
fn test_managers_shared_across_threads() {
    let manager = Arc::new(SelectionManager::new());
    let handles: Vec<_> = (1..=8)
        .map(|uid| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || manager.add_selection(uid, RenderEntityType::Vertex))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(manager.selection_count(), 8);
}

#[test]
fn test_wire_selection_tracks_edges() {
    let manager = SelectionManager::with_pick_types(RenderEntityTypeMask::WIRE);
    assert!(manager.add_wire_selection(50, [10, 11]));
    assert!(manager.is_wire_selected(50));
    assert!(manager.is_edge_in_selected_wire(11));
    manager.remove_selection(50, RenderEntityType::Wire);
    assert!(!manager.is_edge_in_selected_wire(11));
}
