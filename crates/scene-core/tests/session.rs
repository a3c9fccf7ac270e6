use std::cell::Cell;
use std::rc::Rc;

use scene_core::{
    COMMAND_LOG_CAPACITY, CommandKind, CommandPayload, EditorSession, HandlerOutcome, LayerKind,
    SceneState, SessionPhase,
};

fn opacity_payload(value: f32) -> CommandPayload {
    CommandPayload::SetLayerOpacity {
        layer_id: "base".to_string(),
        opacity: value,
    }
}

fn register_opacity_handler(session: &mut EditorSession) -> Rc<Cell<u32>> {
    let invoked = Rc::new(Cell::new(0u32));
    let spy = invoked.clone();
    session.bus_mut().register(CommandKind::SetLayerOpacity, move |_| {
        spy.set(spy.get() + 1);
        Some(HandlerOutcome::new(|| Ok(()), || Ok(())).with_label("Set layer opacity"))
    });
    invoked
}

#[test]
fn test_session_starts_idle() {
    let session = EditorSession::new();
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(!session.history_state().can_undo);
    assert!(session.command_log().is_empty());
}

#[test]
fn test_executed_command_moves_session_to_editing() {
    let mut session = EditorSession::new();
    register_opacity_handler(&mut session);

    session.execute(opacity_payload(0.5)).unwrap();
    assert_eq!(session.phase(), SessionPhase::UserEditing);
    assert_eq!(session.history_state().undo_depth, 1);
}

#[test]
fn test_load_phase_executes_without_recording() {
    let mut session = EditorSession::new();
    let invoked = register_opacity_handler(&mut session);

    session.begin_load();
    assert_eq!(session.phase(), SessionPhase::ApplyingExternalDefaults);

    // The handler runs (defaults are applied) but history stays empty.
    assert!(session.execute(opacity_payload(0.75)).unwrap());
    assert_eq!(invoked.get(), 1);
    assert!(!session.history_state().can_undo);
    assert!(session.command_log().is_empty());

    session.end_load();
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[test]
fn test_load_phase_rejects_snapshot_pushes() {
    let mut scene = SceneState::new(4, 4);
    scene.add_layer("Base", LayerKind::Tilemap);
    let view = scene.snapshot_view();
    let mut session = EditorSession::with_scene(scene);

    session.begin_load();
    assert!(!session.push_snapshot(view));
    assert_eq!(session.history_state().undo_depth, 0);

    session.end_load();
    let view = session.scene().snapshot_view();
    assert!(session.push_snapshot(view));
    assert_eq!(session.history_state().undo_depth, 1);
    assert_eq!(session.phase(), SessionPhase::UserEditing);
}

#[test]
fn test_end_load_is_idempotent_and_preserves_editing() {
    let mut session = EditorSession::new();
    register_opacity_handler(&mut session);

    session.execute(opacity_payload(0.5)).unwrap();
    assert_eq!(session.phase(), SessionPhase::UserEditing);

    // end_load without begin_load must not knock the session back to idle.
    session.end_load();
    assert_eq!(session.phase(), SessionPhase::UserEditing);
}

#[test]
fn test_command_log_records_labels_in_order() {
    let mut session = EditorSession::new();
    register_opacity_handler(&mut session);

    session.execute(opacity_payload(0.2)).unwrap();
    session.execute(opacity_payload(0.4)).unwrap();

    let entries: Vec<_> = session.command_log().entries().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 1);
    assert_eq!(entries[1].seq, 2);
    assert_eq!(entries[0].kind, CommandKind::SetLayerOpacity);
    assert_eq!(entries[0].label.as_deref(), Some("Set layer opacity"));
}

#[test]
fn test_command_log_is_bounded() {
    let mut session = EditorSession::new();
    register_opacity_handler(&mut session);

    for _ in 0..(COMMAND_LOG_CAPACITY + 10) {
        session.execute(opacity_payload(0.5)).unwrap();
    }
    assert_eq!(session.command_log().len(), COMMAND_LOG_CAPACITY);
    // The oldest entries were evicted; sequence numbers keep counting.
    let first = session.command_log().entries().next().unwrap();
    assert_eq!(first.seq, 11);
}

#[test]
fn test_declined_commands_do_not_reach_the_log() {
    let mut session = EditorSession::new();
    session
        .bus_mut()
        .register(CommandKind::SetLayerOpacity, |_| None);

    assert!(!session.execute(opacity_payload(0.5)).unwrap());
    assert!(session.command_log().is_empty());
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[test]
fn test_session_undo_redo_runs_against_its_scene() {
    let mut scene = SceneState::new(4, 4);
    let base = scene.add_layer("Base", LayerKind::Tilemap);
    let mut session = EditorSession::with_scene(scene);

    let snapshot = session.scene().snapshot_tilemap(&base).unwrap();
    session.push_snapshot(snapshot);
    session
        .scene_mut()
        .tile_grid_mut(&base)
        .unwrap()
        .set(0, 0, Some("#123456".to_string()));

    assert!(session.undo().unwrap());
    assert_eq!(session.scene().tile_grid(&base).unwrap().painted_count(), 0);
    assert!(session.redo().unwrap());
    assert_eq!(session.scene().tile_grid(&base).unwrap().painted_count(), 1);

    let state = session.history_state();
    assert!(state.can_undo);
    assert!(!state.can_redo);
}
