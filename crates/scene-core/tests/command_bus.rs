use std::cell::Cell;
use std::rc::Rc;

use scene_core::{
    CommandBus, CommandKind, CommandPayload, HandlerOutcome, LayerKind, TileUpdate,
    ValidationError,
};

fn noop_outcome() -> HandlerOutcome {
    HandlerOutcome::new(|| Ok(()), || Ok(()))
}

fn grid_payload(rows: usize, cols: usize) -> CommandPayload {
    CommandPayload::SetGridSize {
        rows,
        cols,
        anchor: None,
    }
}

#[test]
fn test_execute_records_command_entry() {
    let mut bus = CommandBus::new();
    bus.register(CommandKind::SetGridSize, |_| Some(noop_outcome()));

    let executed = bus.execute(grid_payload(30, 30)).unwrap();
    assert!(executed);
    assert!(bus.history().can_undo());
    assert!(!bus.history().can_redo());
    assert_eq!(bus.history().undo_depth(), 1);
}

#[test]
fn test_invalid_payload_never_reaches_handler() {
    let mut bus = CommandBus::new();
    let invoked = Rc::new(Cell::new(0u32));
    let spy = invoked.clone();
    bus.register(CommandKind::PaintStrokeBatch, move |_| {
        spy.set(spy.get() + 1);
        Some(noop_outcome())
    });

    // Empty update list fails the schema's min-length constraint.
    let result = bus.execute(CommandPayload::PaintStrokeBatch {
        layer_id: "base".to_string(),
        updates: vec![],
    });
    assert_eq!(result, Err(ValidationError::EmptyStrokeBatch));
    assert_eq!(invoked.get(), 0);
    assert_eq!(bus.history().undo_depth(), 0);
    assert_eq!(bus.history().redo_depth(), 0);
}

#[test]
fn test_invalid_grid_size_rejected_before_dispatch() {
    let mut bus = CommandBus::new();
    let invoked = Rc::new(Cell::new(0u32));
    let spy = invoked.clone();
    bus.register(CommandKind::SetGridSize, move |_| {
        spy.set(spy.get() + 1);
        Some(noop_outcome())
    });

    assert!(bus.execute(grid_payload(0, 30)).is_err());
    assert!(bus.execute(grid_payload(30, 600)).is_err());
    assert_eq!(invoked.get(), 0);
    assert!(!bus.history().can_undo());
}

#[test]
fn test_missing_handler_is_silently_ignored() {
    let mut bus = CommandBus::new();
    let executed = bus.execute(grid_payload(30, 30)).unwrap();
    assert!(!executed);
    assert!(!bus.history().can_undo());
}

#[test]
fn test_declining_handler_records_nothing() {
    let mut bus = CommandBus::new();
    bus.register(CommandKind::SetGridSize, |_| None);

    let executed = bus.execute(grid_payload(30, 30)).unwrap();
    assert!(!executed);
    assert!(!bus.history().can_undo());
}

#[test]
fn test_skip_history_executes_without_recording() {
    let mut bus = CommandBus::new();
    let invoked = Rc::new(Cell::new(0u32));
    let spy = invoked.clone();
    bus.register(CommandKind::SetLayerOpacity, move |_| {
        spy.set(spy.get() + 1);
        Some(noop_outcome().transient())
    });

    let executed = bus
        .execute(CommandPayload::SetLayerOpacity {
            layer_id: "base".to_string(),
            opacity: 0.25,
        })
        .unwrap();
    assert!(executed);
    assert_eq!(invoked.get(), 1);
    assert!(!bus.history().can_undo());
}

#[test]
fn test_exactly_one_handler_invocation_per_execute() {
    let mut bus = CommandBus::new();
    let invoked = Rc::new(Cell::new(0u32));
    let spy = invoked.clone();
    bus.register(CommandKind::AddLayer, move |_| {
        spy.set(spy.get() + 1);
        Some(noop_outcome())
    });

    for _ in 0..3 {
        bus.execute(CommandPayload::AddLayer {
            name: "Props".to_string(),
            kind: LayerKind::Objects,
        })
        .unwrap();
    }
    assert_eq!(invoked.get(), 3);
    assert_eq!(bus.history().undo_depth(), 3);
}

#[test]
fn test_stale_unregister_leaves_successor_active() {
    let mut bus = CommandBus::new();
    let hits_a = Rc::new(Cell::new(0u32));
    let hits_b = Rc::new(Cell::new(0u32));

    let spy_a = hits_a.clone();
    let token_a = bus.register(CommandKind::SetGridSize, move |_| {
        spy_a.set(spy_a.get() + 1);
        Some(noop_outcome())
    });

    // A second owner takes over the kind.
    let spy_b = hits_b.clone();
    bus.register(CommandKind::SetGridSize, move |_| {
        spy_b.set(spy_b.get() + 1);
        Some(noop_outcome())
    });

    // A's unregister is stale and must not remove B.
    assert!(!bus.unregister(token_a));
    assert!(bus.has_handler(CommandKind::SetGridSize));

    bus.execute(grid_payload(12, 12)).unwrap();
    assert_eq!(hits_a.get(), 0);
    assert_eq!(hits_b.get(), 1);
}

#[test]
fn test_current_unregister_removes_handler() {
    let mut bus = CommandBus::new();
    let token = bus.register(CommandKind::SetGridSize, |_| Some(noop_outcome()));
    assert!(bus.unregister(token));
    assert!(!bus.has_handler(CommandKind::SetGridSize));
    assert!(!bus.execute(grid_payload(12, 12)).unwrap());
}

#[test]
fn test_handler_outcome_label_reaches_history() {
    let mut bus = CommandBus::new();
    bus.register(CommandKind::PaintStrokeBatch, |payload| {
        let CommandPayload::PaintStrokeBatch { updates, .. } = payload else {
            return None;
        };
        Some(noop_outcome().with_label(format!("Paint {} tiles", updates.len())))
    });

    bus.execute(CommandPayload::PaintStrokeBatch {
        layer_id: "base".to_string(),
        updates: vec![
            TileUpdate {
                row: 0,
                col: 0,
                color: Some("#102030".to_string()),
            },
            TileUpdate {
                row: 0,
                col: 1,
                color: None,
            },
        ],
    })
    .unwrap();

    let Some(scene_core::HistoryEntry::Command(step)) = bus.history().latest() else {
        panic!("expected a command entry");
    };
    assert_eq!(step.kind, CommandKind::PaintStrokeBatch);
    assert_eq!(step.label.as_deref(), Some("Paint 2 tiles"));
}
