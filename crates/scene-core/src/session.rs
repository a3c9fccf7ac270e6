//! Editing Session
//!
//! [`EditorSession`] ties the engine together for one editing session: it
//! owns the [`CommandBus`] (and through it the [`History`]) plus the
//! [`SceneState`] snapshots restore into, tracks which phase the session is
//! in, and keeps a bounded log of executed commands for diagnostics UIs.
//!
//! # Load phase
//!
//! Applying externally loaded defaults must not pollute history or trigger
//! persistence loops. Instead of loading flags cleared on a timer, the
//! session is an explicit state machine: [`begin_load`] and [`end_load`]
//! bracket the external update, and while the session is in
//! [`SessionPhase::ApplyingExternalDefaults`] executed commands run without
//! being recorded and direct snapshot pushes are rejected.
//!
//! [`begin_load`]: EditorSession::begin_load
//! [`end_load`]: EditorSession::end_load
//!
//! # Example
//!
//! ```rust
//! use scene_core::scene::{LayerKind, SceneState};
//! use scene_core::session::EditorSession;
//!
//! let mut scene = SceneState::new(16, 16);
//! let base = scene.add_layer("Base", LayerKind::Tilemap);
//! let mut session = EditorSession::with_scene(scene);
//!
//! let snapshot = session.scene().snapshot_tilemap(&base).unwrap();
//! session.push_snapshot(snapshot);
//! session
//!     .scene_mut()
//!     .tile_grid_mut(&base)
//!     .unwrap()
//!     .set(0, 0, Some("#112233".to_string()));
//!
//! assert!(session.history_state().can_undo);
//! session.undo().unwrap();
//! assert_eq!(session.scene().tile_grid(&base).unwrap().painted_count(), 0);
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::command::CommandBus;
use crate::history::{ApplyError, History, HistoryEntry};
use crate::scene::SceneState;
use crate::schema::{CommandKind, CommandPayload, ValidationError};

/// How many executed commands the diagnostics log retains.
pub const COMMAND_LOG_CAPACITY: usize = 50;

/// Which phase the editing session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No edit has happened yet.
    #[default]
    Idle,
    /// Externally loaded defaults are being applied; nothing is recorded.
    ApplyingExternalDefaults,
    /// The user has made at least one edit.
    UserEditing,
}

/// Aggregate view of the undo/redo stacks for UI badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryState {
    /// Whether undo is available.
    pub can_undo: bool,
    /// Whether redo is available.
    pub can_redo: bool,
    /// Undo stack depth.
    pub undo_depth: usize,
    /// Redo stack depth.
    pub redo_depth: usize,
}

/// One line in the diagnostics command log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLogEntry {
    /// Monotonic sequence number across the session.
    pub seq: u64,
    /// The executed command kind.
    pub kind: CommandKind,
    /// The label the handler attached, if any.
    pub label: Option<String>,
}

/// Bounded ring of recently executed commands, for dev-tools display.
#[derive(Debug, Default)]
pub struct CommandLog {
    entries: VecDeque<CommandLogEntry>,
    next_seq: u64,
}

impl CommandLog {
    fn record(&mut self, kind: CommandKind, label: Option<String>) {
        self.next_seq += 1;
        if self.entries.len() >= COMMAND_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(CommandLogEntry {
            seq: self.next_seq,
            kind,
            label,
        });
    }

    /// Logged entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &CommandLogEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One editing session: command bus, history, scene, phase, and command log.
///
/// Constructed when an editing session opens and torn down with it. Handlers
/// registered on the bus are owned by the features that registered them, not
/// by the session.
#[derive(Default)]
pub struct EditorSession {
    bus: CommandBus,
    scene: SceneState,
    phase: SessionPhase,
    log: CommandLog,
}

impl EditorSession {
    /// Create a session over an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session over an existing scene.
    pub fn with_scene(scene: SceneState) -> Self {
        Self {
            scene,
            ..Self::default()
        }
    }

    /// The current session phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Enter the load phase: until [`end_load`](EditorSession::end_load),
    /// executed commands are not recorded and snapshot pushes are rejected.
    pub fn begin_load(&mut self) {
        debug!("session entering load phase");
        self.phase = SessionPhase::ApplyingExternalDefaults;
    }

    /// Leave the load phase. Idempotent; a session that was already editing
    /// stays untouched.
    pub fn end_load(&mut self) {
        if self.phase == SessionPhase::ApplyingExternalDefaults {
            debug!("session leaving load phase");
            self.phase = SessionPhase::Idle;
        }
    }

    /// Execute a command through the bus. Outside the load phase, a recorded
    /// command also lands in the diagnostics log and moves the session to
    /// [`SessionPhase::UserEditing`].
    pub fn execute(&mut self, payload: CommandPayload) -> Result<bool, ValidationError> {
        if self.phase == SessionPhase::ApplyingExternalDefaults {
            return self.bus.execute_unrecorded(payload);
        }
        let status = self.bus.execute_inner(payload, true)?;
        if status.executed {
            self.phase = SessionPhase::UserEditing;
        }
        if status.recorded {
            if let Some(HistoryEntry::Command(step)) = self.bus.history().latest() {
                self.log.record(step.kind, step.label.clone());
            }
        }
        Ok(status.executed)
    }

    /// Push a pre-built snapshot entry onto the history. Returns `false`
    /// (and records nothing) during the load phase.
    pub fn push_snapshot(&mut self, entry: HistoryEntry) -> bool {
        if self.phase == SessionPhase::ApplyingExternalDefaults {
            return false;
        }
        self.bus.history_mut().push(entry);
        self.phase = SessionPhase::UserEditing;
        true
    }

    /// Undo the most recent entry against this session's scene.
    pub fn undo(&mut self) -> Result<bool, ApplyError> {
        let Self { bus, scene, .. } = self;
        bus.history_mut().undo(scene)
    }

    /// Redo the most recently undone entry against this session's scene.
    pub fn redo(&mut self) -> Result<bool, ApplyError> {
        let Self { bus, scene, .. } = self;
        bus.history_mut().redo(scene)
    }

    /// Aggregate undo/redo state for UI badges.
    pub fn history_state(&self) -> HistoryState {
        let history = self.bus.history();
        HistoryState {
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
            undo_depth: history.undo_depth(),
            redo_depth: history.redo_depth(),
        }
    }

    /// The diagnostics command log.
    pub fn command_log(&self) -> &CommandLog {
        &self.log
    }

    /// The command bus, for handler registration.
    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    /// Mutable command bus, for handler registration.
    pub fn bus_mut(&mut self) -> &mut CommandBus {
        &mut self.bus
    }

    /// The history shared by both execution paths.
    pub fn history(&self) -> &History {
        self.bus.history()
    }

    /// Mutable history, for subscriptions.
    pub fn history_mut(&mut self) -> &mut History {
        self.bus.history_mut()
    }

    /// The live scene.
    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Mutable access to the live scene.
    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }
}
