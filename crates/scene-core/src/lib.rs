#![warn(missing_docs)]
//! Scene Core - Headless Map/Scene Editor Engine
//!
//! # Overview
//!
//! `scene-core` is the command execution and undo/redo history engine of an
//! interactive, multi-layer map editor. It enforces the invariants about
//! *what changed, in what order, and how to reverse it*, and nothing else:
//! canvas rendering, asset library UI, persistence, and all visual chrome are
//! external collaborators that call into this engine and apply the resulting
//! state back to their own stores.
//!
//! # Core Features
//!
//! - **Validated Command Bus**: typed command kinds, schema-checked payloads,
//!   a last-writer-wins handler registry with ownership-safe unregistration
//! - **Polymorphic History**: one undo/redo stack whose entries are a tagged
//!   union over semantic commands and heterogeneous state snapshots
//! - **Scene Snapshots**: deep-copy snapshot takers for tile grids, raster
//!   layers, object lists, tokens, settings, camera, and layer structure
//! - **Viewport Recentering**: the pure zoom-to-rect algorithm shared by the
//!   gesture and by view-entry replay
//! - **Session State Machine**: explicit load-phase bracketing instead of
//!   timer-cleared loading flags, plus a bounded diagnostics command log
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Editing Session (phase machine, log)       │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Command Bus (validate → dispatch → record) │  ← Atomic edits
//! ├─────────────────────────────────────────────┤
//! │  History Stack (undo/redo, events)          │  ← Reversibility
//! ├─────────────────────────────────────────────┤
//! │  Scene Snapshots (deep copies, restore)     │  ← State capture
//! ├─────────────────────────────────────────────┤
//! │  Schema Registry & Viewport Geometry        │  ← Pure functions
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Using the Command Bus
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use scene_core::{CommandBus, CommandKind, CommandPayload, HandlerOutcome};
//!
//! let mut bus = CommandBus::new();
//! let opacity = Rc::new(Cell::new(1.0f32));
//!
//! let state = opacity.clone();
//! bus.register(CommandKind::SetLayerOpacity, move |payload| {
//!     let CommandPayload::SetLayerOpacity { opacity: next, .. } = payload else {
//!         return None;
//!     };
//!     let (prev, next) = (state.get(), *next);
//!     state.set(next);
//!     let (undo_state, redo_state) = (state.clone(), state.clone());
//!     Some(
//!         HandlerOutcome::new(
//!             move || {
//!                 undo_state.set(prev);
//!                 Ok(())
//!             },
//!             move || {
//!                 redo_state.set(next);
//!                 Ok(())
//!             },
//!         )
//!         .with_label("Set layer opacity"),
//!     )
//! });
//!
//! let executed = bus
//!     .execute(CommandPayload::SetLayerOpacity {
//!         layer_id: "base".to_string(),
//!         opacity: 0.5,
//!     })
//!     .unwrap();
//! assert!(executed);
//! assert_eq!(opacity.get(), 0.5);
//! ```
//!
//! ## Using Snapshot History
//!
//! ```rust
//! use scene_core::{EditorSession, LayerKind, SceneState};
//!
//! let mut scene = SceneState::new(16, 16);
//! let base = scene.add_layer("Base", LayerKind::Tilemap);
//! let mut session = EditorSession::with_scene(scene);
//!
//! // Snapshot before the edit, then mutate freely.
//! let before = session.scene().snapshot_tilemap(&base).unwrap();
//! session.push_snapshot(before);
//! session
//!     .scene_mut()
//!     .tile_grid_mut(&base)
//!     .unwrap()
//!     .set(2, 3, Some("#336699".to_string()));
//!
//! session.undo().unwrap();
//! assert_eq!(session.scene().tile_grid(&base).unwrap().painted_count(), 0);
//! session.redo().unwrap();
//! assert_eq!(session.scene().tile_grid(&base).unwrap().painted_count(), 1);
//! ```
//!
//! # Module Description
//!
//! - [`schema`] - Command kinds, typed payloads, structural validation
//! - [`command`] - Handler table and the command bus
//! - [`history`] - The undo/redo stack, entry union, and lifecycle events
//! - [`scene`] - Scene entities, the snapshot taker, and snapshot restore
//! - [`viewport`] - The pure zoom-to-rect recentering algorithm
//! - [`session`] - The per-session wrapper: phase machine, command log
//!
//! # Concurrency Model
//!
//! Single-threaded, synchronous, cooperative. Every operation runs to
//! completion on the calling thread; there is no internal locking, awaiting,
//! or cancellation. Callers with multiple event sources must serialize calls
//! into the bus and history themselves.

pub mod command;
pub mod history;
pub mod scene;
pub mod schema;
pub mod session;
pub mod viewport;

pub use command::{CommandBus, Handler, HandlerOutcome, HandlerToken};
pub use history::{
    ApplyError, CommandStep, EntryKind, History, HistoryEntry, HistoryEvent, HistoryEventKind,
    MAX_HISTORY_DEPTH, SceneStore, SubscriberId, Undoable,
};
pub use scene::{
    AssetEntry, BrushSettings, GridOverlaySettings, LayerKind, LayerMeta, PlacedObject,
    RasterBlob, RasterCodec, SceneState, TileGrid, Token, ToolSettings, ViewState,
};
pub use schema::{
    CommandKind, CommandPayload, GRID_MAX, GRID_MIN, ResizeAnchor, TileUpdate, ValidationError,
    validate,
};
pub use session::{
    COMMAND_LOG_CAPACITY, CommandLog, CommandLogEntry, EditorSession, HistoryState, SessionPhase,
};
pub use viewport::{
    GridDims, MAX_TILE_SIZE, MIN_TILE_SIZE, TILE_SNAP_STEP, ViewportGeometry, ZoomOptions,
    ZoomRect, ZoomTarget, compute_zoom_to_rect,
};
