//! Undo/Redo History Stack
//!
//! One stack implementation behind one entry interface: the "semantic undo"
//! path (commands carrying their own inverse) and the "snapshot restore" path
//! (restore-to-this-state entries for every editor entity kind) are two
//! constructors of the same [`HistoryEntry`] union, not two different stacks.
//!
//! # Stack discipline
//!
//! - Pushing a new entry clears the redo stack; branching timelines are not
//!   supported.
//! - `undo` pops the top entry, captures the *current* state of the affected
//!   entity (not the popped entry) through the [`SceneStore`] seam, applies
//!   the restore, and pushes the fresh capture onto the redo stack. This is
//!   what makes "restore snapshot A" reversible: its inverse is "restore
//!   whatever was live immediately before A was restored".
//! - `redo` is symmetric.
//! - If applying an entry fails, the entry still moves to the opposite stack
//!   before the error propagates; consistency of the stacks takes priority
//!   over one faulty closure.
//!
//! # Example
//!
//! ```rust
//! use scene_core::history::History;
//! use scene_core::scene::{LayerKind, SceneState};
//!
//! let mut scene = SceneState::new(4, 4);
//! let base = scene.add_layer("Base", LayerKind::Tilemap);
//!
//! let mut history = History::new();
//! history.push(scene.snapshot_tilemap(&base).unwrap());
//! scene.tile_grid_mut(&base).unwrap().set(1, 1, Some("#ff00ff".to_string()));
//!
//! assert!(history.undo(&mut scene).unwrap());
//! assert_eq!(scene.tile_grid(&base).unwrap().painted_count(), 0);
//! assert!(history.redo(&mut scene).unwrap());
//! assert_eq!(scene.tile_grid(&base).unwrap().painted_count(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::scene::{
    AssetEntry, LayerMeta, PlacedObject, RasterBlob, TileGrid, Token, ToolSettings, ViewState,
};
use crate::schema::{CommandKind, CommandPayload};

/// Maximum number of entries retained on the undo stack; the oldest entry is
/// dropped when a push would exceed it.
pub const MAX_HISTORY_DEPTH: usize = 100;

/// Failure raised while applying an entry during undo/redo.
///
/// The stack transition completes before this propagates, so stack counts
/// stay consistent even when editor state may not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ApplyError(String);

impl ApplyError {
    /// Create an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Capability of applying one direction of a recorded command.
///
/// Command entries carry their undo/redo as values implementing this trait
/// rather than raw function pointers; any `FnMut() -> Result<(), ApplyError>`
/// closure qualifies.
pub trait Undoable {
    /// Apply this direction's state change.
    fn apply(&mut self) -> Result<(), ApplyError>;
}

impl<F> Undoable for F
where
    F: FnMut() -> Result<(), ApplyError>,
{
    fn apply(&mut self) -> Result<(), ApplyError> {
        self()
    }
}

/// A recorded command with its semantic inverse, produced only by the
/// command-bus path.
pub struct CommandStep {
    /// The command kind that was executed.
    pub kind: CommandKind,
    /// The validated payload the handler received.
    pub payload: CommandPayload,
    /// Optional human-readable label for history UIs.
    pub label: Option<String>,
    /// Reverses the edit.
    pub undo: Box<dyn Undoable>,
    /// Re-applies the edit.
    pub redo: Box<dyn Undoable>,
}

impl fmt::Debug for CommandStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStep")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// One undoable/redoable unit on the stack.
///
/// All cases except [`HistoryEntry::Command`] mean "restore the captured
/// state"; `Command` carries a semantic inverse instead.
pub enum HistoryEntry {
    /// Tile content of one tilemap layer.
    Tilemap {
        /// Owning layer id.
        layer_id: String,
        /// Deep copy of the grid at capture time.
        grid: TileGrid,
    },
    /// Encoded raster of one canvas layer.
    Canvas {
        /// Owning layer id.
        layer_id: String,
        /// Opaque serialized bitmap at capture time.
        raster: RasterBlob,
    },
    /// Placed stamps of one objects layer.
    Objects {
        /// Owning layer id.
        layer_id: String,
        /// Deep copy of the object list at capture time.
        objects: Vec<PlacedObject>,
    },
    /// The global token list.
    Tokens {
        /// Deep copy of the token list at capture time.
        tokens: Vec<Token>,
    },
    /// The editor-tool settings bundle.
    Settings {
        /// Settings at capture time.
        settings: ToolSettings,
    },
    /// The camera state. Replay is a direct assignment of the recorded
    /// absolute values; no recomputation.
    View {
        /// Camera state at capture time.
        view: ViewState,
    },
    /// Combined change spanning the asset catalog and one layer's objects.
    Bundle {
        /// Owning layer id for the object list part.
        layer_id: String,
        /// Asset catalog at capture time, if the edit touched it.
        assets: Option<Vec<AssetEntry>>,
        /// Object list at capture time, if the edit touched it.
        objects: Option<Vec<PlacedObject>>,
    },
    /// The layer structure: order, active layer, and visibility flags.
    Layers {
        /// Ordered layer list at capture time.
        layers: Vec<LayerMeta>,
        /// Active layer id at capture time.
        current_layer_id: Option<String>,
        /// Per-layer visibility at capture time.
        visibility: HashMap<String, bool>,
    },
    /// A recorded command with its semantic inverse.
    Command(CommandStep),
}

impl HistoryEntry {
    /// The tag of this entry, for events and logging.
    pub fn entry_kind(&self) -> EntryKind {
        match self {
            HistoryEntry::Tilemap { .. } => EntryKind::Tilemap,
            HistoryEntry::Canvas { .. } => EntryKind::Canvas,
            HistoryEntry::Objects { .. } => EntryKind::Objects,
            HistoryEntry::Tokens { .. } => EntryKind::Tokens,
            HistoryEntry::Settings { .. } => EntryKind::Settings,
            HistoryEntry::View { .. } => EntryKind::View,
            HistoryEntry::Bundle { .. } => EntryKind::Bundle,
            HistoryEntry::Layers { .. } => EntryKind::Layers,
            HistoryEntry::Command(_) => EntryKind::Command,
        }
    }
}

impl fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEntry::Tilemap { layer_id, grid } => f
                .debug_struct("Tilemap")
                .field("layer_id", layer_id)
                .field("rows", &grid.rows())
                .field("cols", &grid.cols())
                .finish(),
            HistoryEntry::Canvas { layer_id, raster } => f
                .debug_struct("Canvas")
                .field("layer_id", layer_id)
                .field("raster", raster)
                .finish(),
            HistoryEntry::Objects { layer_id, objects } => f
                .debug_struct("Objects")
                .field("layer_id", layer_id)
                .field("count", &objects.len())
                .finish(),
            HistoryEntry::Tokens { tokens } => f
                .debug_struct("Tokens")
                .field("count", &tokens.len())
                .finish(),
            HistoryEntry::Settings { settings } => {
                f.debug_struct("Settings").field("settings", settings).finish()
            }
            HistoryEntry::View { view } => f.debug_struct("View").field("view", view).finish(),
            HistoryEntry::Bundle { layer_id, .. } => {
                f.debug_struct("Bundle").field("layer_id", layer_id).finish()
            }
            HistoryEntry::Layers { layers, .. } => f
                .debug_struct("Layers")
                .field("count", &layers.len())
                .finish(),
            HistoryEntry::Command(step) => step.fmt(f),
        }
    }
}

/// Discriminant of a [`HistoryEntry`], carried by events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Tilemap snapshot.
    Tilemap,
    /// Canvas raster snapshot.
    Canvas,
    /// Object-list snapshot.
    Objects,
    /// Token-list snapshot.
    Tokens,
    /// Settings snapshot.
    Settings,
    /// Camera snapshot.
    View,
    /// Asset-catalog + object-list bundle snapshot.
    Bundle,
    /// Layer-structure snapshot.
    Layers,
    /// Recorded command.
    Command,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::Tilemap => "tilemap",
            EntryKind::Canvas => "canvas",
            EntryKind::Objects => "objects",
            EntryKind::Tokens => "tokens",
            EntryKind::Settings => "settings",
            EntryKind::View => "view",
            EntryKind::Bundle => "bundle",
            EntryKind::Layers => "layers",
            EntryKind::Command => "command",
        };
        f.write_str(name)
    }
}

/// What mutated the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEventKind {
    /// A new entry was recorded.
    Push,
    /// An entry was undone.
    Undo,
    /// An entry was redone.
    Redo,
    /// Both stacks were cleared.
    Clear,
    /// Replay of the current counts, delivered once on subscription.
    Sync,
}

/// Lifecycle event delivered to history subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEvent {
    /// What happened.
    pub kind: HistoryEventKind,
    /// The tag of the affected entry, absent for `Clear` and `Sync`.
    pub entry: Option<EntryKind>,
    /// Undo stack depth after the mutation.
    pub undo_count: usize,
    /// Redo stack depth after the mutation.
    pub redo_count: usize,
}

/// Seam between the history stack and the live scene: capturing the current
/// counterpart of a snapshot entry and restoring entries during replay.
pub trait SceneStore {
    /// Capture the current state of the entity a snapshot entry refers to,
    /// as a new entry of the same kind. `None` when the entity no longer
    /// exists (or for command entries, which carry their own inverse).
    fn capture_counterpart(&self, entry: &HistoryEntry) -> Option<HistoryEntry>;

    /// Write a snapshot entry back into the live scene.
    fn restore(&mut self, entry: &HistoryEntry) -> Result<(), ApplyError>;
}

/// Handle for removing a history subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

type Listener = Box<dyn FnMut(&HistoryEvent)>;

/// The undo/redo stack pair, the sole mutable core of the undo/redo model.
///
/// Constructed once per editing session and torn down with it; holds no
/// cross-session state. Single-threaded by design: callers with concurrent
/// event sources must serialize access themselves.
#[derive(Default)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there is anything to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether there is anything to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo stack depth.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Redo stack depth.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// The most recently recorded entry, if any.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.undo_stack.last()
    }

    /// Record a new entry. Clears the redo stack and drops the oldest entry
    /// once the depth cap is reached.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();
        if self.undo_stack.len() >= MAX_HISTORY_DEPTH {
            self.undo_stack.remove(0);
        }
        let kind = entry.entry_kind();
        self.undo_stack.push(entry);
        debug!(entry = %kind, depth = self.undo_stack.len(), "recorded history entry");
        self.emit(HistoryEventKind::Push, Some(kind));
    }

    /// Undo the most recent entry. Returns `Ok(false)` when the undo stack is
    /// empty. On apply failure the entry still moves to the redo stack before
    /// the error propagates.
    pub fn undo(&mut self, scene: &mut dyn SceneStore) -> Result<bool, ApplyError> {
        let Some(mut entry) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let kind = entry.entry_kind();
        let (counterpart, result) = match &mut entry {
            HistoryEntry::Command(step) => (None, step.undo.apply()),
            snapshot => {
                // Capture before restoring: the inverse of "go to snapshot A"
                // is "go to whatever state existed just before".
                let counterpart = scene.capture_counterpart(snapshot);
                (counterpart, scene.restore(snapshot))
            }
        };
        if let Err(error) = &result {
            warn!(entry = %kind, %error, "undo application failed, stack transition kept");
        }
        self.redo_stack.push(counterpart.unwrap_or(entry));
        self.emit(HistoryEventKind::Undo, Some(kind));
        result.map(|()| true)
    }

    /// Redo the most recently undone entry. Symmetric to
    /// [`undo`](History::undo).
    pub fn redo(&mut self, scene: &mut dyn SceneStore) -> Result<bool, ApplyError> {
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let kind = entry.entry_kind();
        let (counterpart, result) = match &mut entry {
            HistoryEntry::Command(step) => (None, step.redo.apply()),
            snapshot => {
                let counterpart = scene.capture_counterpart(snapshot);
                (counterpart, scene.restore(snapshot))
            }
        };
        if let Err(error) = &result {
            warn!(entry = %kind, %error, "redo application failed, stack transition kept");
        }
        self.undo_stack.push(counterpart.unwrap_or(entry));
        self.emit(HistoryEventKind::Redo, Some(kind));
        result.map(|()| true)
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.emit(HistoryEventKind::Clear, None);
    }

    /// Subscribe to lifecycle events. The listener immediately receives one
    /// `Sync` event with the current counts, then an event per mutation.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriberId
    where
        F: FnMut(&HistoryEvent) + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        let mut listener: Listener = Box::new(listener);
        listener(&HistoryEvent {
            kind: HistoryEventKind::Sync,
            entry: None,
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
        });
        self.listeners.push((id, listener));
        SubscriberId(id)
    }

    /// Remove a subscription. Returns `false` if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id.0);
        self.listeners.len() != before
    }

    fn emit(&mut self, kind: HistoryEventKind, entry: Option<EntryKind>) {
        let event = HistoryEvent {
            kind,
            entry,
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
        };
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
