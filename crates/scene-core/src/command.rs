//! Command Bus & Handler Table
//!
//! The main external entry point for atomic, schema-governed edits. A call to
//! [`CommandBus::execute`] validates the payload, dispatches it to the single
//! active handler for its kind, and records the handler's reversible outcome
//! into history.
//!
//! # Handler ownership
//!
//! Editor features register handlers as they mount and unregister them as
//! they unmount, independently of each other. Registration is last-writer-
//! wins, and the token returned by [`CommandBus::register`] only removes the
//! handler while it is still the most recently registered one for its kind,
//! so a stale unregister can never delete a handler installed later by a
//! different owner.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use scene_core::command::{CommandBus, HandlerOutcome};
//! use scene_core::schema::{CommandKind, CommandPayload};
//!
//! let mut bus = CommandBus::new();
//! let rows = Rc::new(Cell::new(10usize));
//!
//! let state = rows.clone();
//! bus.register(CommandKind::SetGridSize, move |payload| {
//!     let CommandPayload::SetGridSize { rows: next, .. } = payload else {
//!         return None;
//!     };
//!     let (prev, next) = (state.get(), *next);
//!     if prev == next {
//!         return None;
//!     }
//!     state.set(next);
//!     let (undo_state, redo_state) = (state.clone(), state.clone());
//!     Some(HandlerOutcome::new(
//!         move || {
//!             undo_state.set(prev);
//!             Ok(())
//!         },
//!         move || {
//!             redo_state.set(next);
//!             Ok(())
//!         },
//!     ))
//! });
//!
//! let executed = bus
//!     .execute(CommandPayload::SetGridSize { rows: 30, cols: 30, anchor: None })
//!     .unwrap();
//! assert!(executed);
//! assert_eq!(rows.get(), 30);
//! assert!(bus.history().can_undo());
//! ```

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::history::{CommandStep, History, HistoryEntry, Undoable};
use crate::schema::{self, CommandKind, CommandPayload, ValidationError};

/// A handler's reversible outcome: the undo/redo pair to record, an optional
/// label for history UIs, and whether recording should be skipped.
pub struct HandlerOutcome {
    /// Reverses the edit.
    pub undo: Box<dyn Undoable>,
    /// Re-applies the edit.
    pub redo: Box<dyn Undoable>,
    /// Optional human-readable label.
    pub label: Option<String>,
    /// Skip history recording (transient/preview edits).
    pub skip_history: bool,
}

impl HandlerOutcome {
    /// Build an outcome from an undo/redo pair.
    pub fn new(undo: impl Undoable + 'static, redo: impl Undoable + 'static) -> Self {
        Self {
            undo: Box::new(undo),
            redo: Box::new(redo),
            label: None,
            skip_history: false,
        }
    }

    /// Attach a label for history UIs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Mark the edit as transient: it executed, but nothing is recorded.
    pub fn transient(mut self) -> Self {
        self.skip_history = true;
        self
    }
}

/// The function registered for a command kind. Returning `None` signals
/// "no-op, nothing to record".
pub type Handler = Box<dyn FnMut(&CommandPayload) -> Option<HandlerOutcome>>;

/// Token returned by [`CommandBus::register`]; passing it back to
/// [`CommandBus::unregister`] removes the handler only while it is still the
/// current one for its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerToken {
    kind: CommandKind,
    generation: u64,
}

struct RegisteredHandler {
    handler: Handler,
    generation: u64,
}

/// What one `execute` call did, for callers that track recording precisely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExecuteStatus {
    /// A handler ran and produced an effect.
    pub executed: bool,
    /// A command entry was pushed onto history.
    pub recorded: bool,
}

/// Orchestrates validate, dispatch, and record for schema-governed commands,
/// and owns the [`History`] both execution paths converge on.
#[derive(Default)]
pub struct CommandBus {
    handlers: HashMap<CommandKind, RegisteredHandler>,
    next_generation: u64,
    history: History,
}

impl CommandBus {
    /// Create a bus with an empty handler table and history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler for a kind, replacing any current one.
    pub fn register<F>(&mut self, kind: CommandKind, handler: F) -> HandlerToken
    where
        F: FnMut(&CommandPayload) -> Option<HandlerOutcome> + 'static,
    {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.handlers.insert(
            kind,
            RegisteredHandler {
                handler: Box::new(handler),
                generation,
            },
        );
        trace!(%kind, generation, "registered command handler");
        HandlerToken { kind, generation }
    }

    /// Remove the handler a token refers to. A no-op returning `false` when
    /// the handler has been superseded since registration.
    pub fn unregister(&mut self, token: HandlerToken) -> bool {
        let current = self
            .handlers
            .get(&token.kind)
            .is_some_and(|entry| entry.generation == token.generation);
        if current {
            self.handlers.remove(&token.kind);
            trace!(kind = %token.kind, "unregistered command handler");
        }
        current
    }

    /// Whether a handler is currently installed for a kind.
    pub fn has_handler(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Validate, dispatch, and record a command.
    ///
    /// Returns `Ok(true)` when a handler ran and produced an effect,
    /// `Ok(false)` when no handler is registered or the handler declined, and
    /// `Err` when the payload fails its schema (in which case no handler runs
    /// and history is untouched). Exactly one handler invocation and at most
    /// one history push happen per call.
    pub fn execute(&mut self, payload: CommandPayload) -> Result<bool, ValidationError> {
        self.execute_inner(payload, true).map(|status| status.executed)
    }

    /// Like [`execute`](CommandBus::execute), but never records into history.
    /// Used while external defaults are being applied to the session.
    pub fn execute_unrecorded(&mut self, payload: CommandPayload) -> Result<bool, ValidationError> {
        self.execute_inner(payload, false).map(|status| status.executed)
    }

    pub(crate) fn execute_inner(
        &mut self,
        payload: CommandPayload,
        record: bool,
    ) -> Result<ExecuteStatus, ValidationError> {
        schema::validate(&payload)?;
        let kind = payload.kind();
        let Some(registered) = self.handlers.get_mut(&kind) else {
            // Expected during feature mount races; the edit is silently
            // ignored rather than treated as an error.
            debug!(%kind, "no handler registered, command ignored");
            return Ok(ExecuteStatus {
                executed: false,
                recorded: false,
            });
        };
        let Some(outcome) = (registered.handler)(&payload) else {
            trace!(%kind, "handler declined command");
            return Ok(ExecuteStatus {
                executed: false,
                recorded: false,
            });
        };
        if !record || outcome.skip_history {
            debug!(%kind, "executed command without recording");
            return Ok(ExecuteStatus {
                executed: true,
                recorded: false,
            });
        }
        debug!(%kind, label = outcome.label.as_deref(), "executed command");
        self.history.push(HistoryEntry::Command(CommandStep {
            kind,
            payload,
            label: outcome.label,
            undo: outcome.undo,
            redo: outcome.redo,
        }));
        Ok(ExecuteStatus {
            executed: true,
            recorded: true,
        })
    }

    /// The history both execution paths converge on.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Mutable access to the history, for the direct snapshot-push path.
    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }
}
