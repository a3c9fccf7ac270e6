//! Command Schema Layer
//!
//! Defines the closed set of command kinds, their typed payloads, and the
//! structural validation gate that protects handlers from malformed input.
//!
//! # Overview
//!
//! Every command dispatched through the [`CommandBus`](crate::CommandBus) is a
//! [`CommandPayload`] value. Validation is purely structural: numeric bounds,
//! non-empty strings and lists, and color literal syntax. A payload that fails
//! [`validate`] never reaches a handler and never enters history.
//!
//! # Example
//!
//! ```rust
//! use scene_core::schema::{validate, CommandPayload, ValidationError};
//!
//! let ok = CommandPayload::SetGridSize { rows: 30, cols: 30, anchor: None };
//! assert!(validate(&ok).is_ok());
//!
//! let too_big = CommandPayload::SetGridSize { rows: 4096, cols: 30, anchor: None };
//! assert!(matches!(
//!     validate(&too_big),
//!     Err(ValidationError::GridSizeOutOfRange { .. })
//! ));
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::LayerKind;

/// Minimum grid dimension accepted by [`CommandPayload::SetGridSize`].
pub const GRID_MIN: usize = 1;
/// Maximum grid dimension accepted by [`CommandPayload::SetGridSize`], and the
/// exclusive upper bound for tile coordinates in a paint stroke.
pub const GRID_MAX: usize = 512;

/// The closed enumeration of schema-governed command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Resize the tile grid.
    SetGridSize,
    /// Append a new layer to the layer list.
    AddLayer,
    /// Change the opacity of an existing layer.
    SetLayerOpacity,
    /// Apply a batch of tile updates produced by one paint stroke.
    PaintStrokeBatch,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::SetGridSize => "SetGridSize",
            CommandKind::AddLayer => "AddLayer",
            CommandKind::SetLayerOpacity => "SetLayerOpacity",
            CommandKind::PaintStrokeBatch => "PaintStrokeBatch",
        };
        f.write_str(name)
    }
}

/// Which corner (or the center) of the existing grid is kept fixed when the
/// grid is resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeAnchor {
    /// Keep the top-left corner fixed; grow/shrink toward bottom-right.
    TopLeft,
    /// Keep the top-right corner fixed.
    TopRight,
    /// Keep the bottom-left corner fixed.
    BottomLeft,
    /// Keep the bottom-right corner fixed.
    BottomRight,
    /// Keep the center fixed; grow/shrink outward on all sides.
    Center,
}

/// One tile write within a paint stroke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileUpdate {
    /// Zero-based row of the tile.
    pub row: usize,
    /// Zero-based column of the tile.
    pub col: usize,
    /// New tile color (`#RRGGBB` or `#RRGGBBAA`), or `None` to erase.
    pub color: Option<String>,
}

/// A typed command payload, one variant per [`CommandKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandPayload {
    /// Resize the tile grid to `rows` x `cols`.
    SetGridSize {
        /// New row count, in `[GRID_MIN, GRID_MAX]`.
        rows: usize,
        /// New column count, in `[GRID_MIN, GRID_MAX]`.
        cols: usize,
        /// Which part of the old grid stays fixed. Defaults to top-left.
        anchor: Option<ResizeAnchor>,
    },
    /// Append a new layer.
    AddLayer {
        /// Display name of the layer (non-empty).
        name: String,
        /// What kind of content the layer holds.
        kind: LayerKind,
    },
    /// Change a layer's opacity.
    SetLayerOpacity {
        /// Target layer id (non-empty).
        layer_id: String,
        /// New opacity in `[0, 1]`.
        opacity: f32,
    },
    /// Apply one paint stroke as a batch of tile updates.
    PaintStrokeBatch {
        /// Target layer id (non-empty).
        layer_id: String,
        /// Tile writes, at least one.
        updates: Vec<TileUpdate>,
    },
}

impl CommandPayload {
    /// The command kind this payload belongs to.
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandPayload::SetGridSize { .. } => CommandKind::SetGridSize,
            CommandPayload::AddLayer { .. } => CommandKind::AddLayer,
            CommandPayload::SetLayerOpacity { .. } => CommandKind::SetLayerOpacity,
            CommandPayload::PaintStrokeBatch { .. } => CommandKind::PaintStrokeBatch,
        }
    }
}

/// Structural validation failure for a command payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A grid dimension is outside `[GRID_MIN, GRID_MAX]`.
    #[error("grid {axis} must be in [{GRID_MIN}, {GRID_MAX}], got {value}")]
    GridSizeOutOfRange {
        /// Which dimension failed (`"rows"` or `"cols"`).
        axis: &'static str,
        /// The rejected value.
        value: usize,
    },
    /// An opacity value is not a finite number in `[0, 1]`.
    #[error("opacity must be a finite value in [0, 1], got {value}")]
    OpacityOutOfRange {
        /// The rejected value.
        value: f32,
    },
    /// A required string field is empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A paint stroke carried no tile updates.
    #[error("paint stroke batch must contain at least one update")]
    EmptyStrokeBatch,
    /// A tile coordinate is outside the addressable grid range.
    #[error("tile ({row}, {col}) is outside the addressable range [0, {GRID_MAX})")]
    TileOutOfRange {
        /// The rejected row.
        row: usize,
        /// The rejected column.
        col: usize,
    },
    /// A color literal is not `#RRGGBB` or `#RRGGBBAA`.
    #[error("invalid color literal {color:?}, expected #RRGGBB or #RRGGBBAA")]
    InvalidColor {
        /// The rejected literal.
        color: String,
    },
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new("^#[0-9a-fA-F]{6}([0-9a-fA-F]{2})?$").expect("color pattern is valid")
    })
}

fn check_color(color: &str) -> Result<(), ValidationError> {
    if color_pattern().is_match(color) {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor {
            color: color.to_string(),
        })
    }
}

fn check_grid_axis(axis: &'static str, value: usize) -> Result<(), ValidationError> {
    if (GRID_MIN..=GRID_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::GridSizeOutOfRange { axis, value })
    }
}

fn check_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField { field })
    } else {
        Ok(())
    }
}

/// Validate a command payload against its kind's schema.
///
/// This is the single gate protecting handlers: the bus calls it before any
/// dispatch, and a failure means no handler runs and history is untouched.
pub fn validate(payload: &CommandPayload) -> Result<(), ValidationError> {
    match payload {
        CommandPayload::SetGridSize { rows, cols, .. } => {
            check_grid_axis("rows", *rows)?;
            check_grid_axis("cols", *cols)
        }
        CommandPayload::AddLayer { name, .. } => check_non_empty("layer name", name),
        CommandPayload::SetLayerOpacity { layer_id, opacity } => {
            check_non_empty("layer id", layer_id)?;
            if opacity.is_finite() && (0.0..=1.0).contains(opacity) {
                Ok(())
            } else {
                Err(ValidationError::OpacityOutOfRange { value: *opacity })
            }
        }
        CommandPayload::PaintStrokeBatch { layer_id, updates } => {
            check_non_empty("layer id", layer_id)?;
            if updates.is_empty() {
                return Err(ValidationError::EmptyStrokeBatch);
            }
            for update in updates {
                if update.row >= GRID_MAX || update.col >= GRID_MAX {
                    return Err(ValidationError::TileOutOfRange {
                        row: update.row,
                        col: update.col,
                    });
                }
                if let Some(color) = &update.color {
                    check_color(color)?;
                }
            }
            Ok(())
        }
    }
}
