//! Scene Entities & Snapshot Taker
//!
//! Value types for everything the editor can snapshot (tile grids, raster
//! layers, placed objects, tokens, tool settings, camera state, layer
//! structure, the asset catalog), plus [`SceneState`], the in-memory store
//! that produces [`HistoryEntry`] snapshots and restores them during
//! undo/redo.
//!
//! Snapshots are plain deep copies: mutating the live scene after taking one
//! never affects the returned value, and snapshotting an unchanged entity
//! twice yields values that compare equal.
//!
//! # Example
//!
//! ```rust
//! use scene_core::history::HistoryEntry;
//! use scene_core::scene::{LayerKind, SceneState};
//!
//! let mut scene = SceneState::new(8, 8);
//! let base = scene.add_layer("Base", LayerKind::Tilemap);
//!
//! let before = scene.snapshot_tilemap(&base).unwrap();
//! scene.tile_grid_mut(&base).unwrap().set(0, 0, Some("#336699".to_string()));
//!
//! // The live edit does not leak into the earlier snapshot.
//! let HistoryEntry::Tilemap { grid, .. } = &before else {
//!     unreachable!();
//! };
//! assert_eq!(grid.painted_count(), 0);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::history::{ApplyError, HistoryEntry, SceneStore};
use crate::schema::ResizeAnchor;

/// What kind of content a layer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    /// A grid of colored tiles.
    Tilemap,
    /// A freehand raster painting surface.
    Canvas,
    /// An ordered list of placed object stamps.
    Objects,
}

/// Metadata for one layer in the ordered layer list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMeta {
    /// Stable layer id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Content kind.
    pub kind: LayerKind,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f32,
}

/// An immutable-by-convention 2D grid of nullable tile colors, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<String>>,
}

impl TileGrid {
    /// Create an empty grid of the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    /// Row count.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Tile color at `(row, col)`, or `None` for empty or out-of-range cells.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells[row * self.cols + col].as_deref()
    }

    /// Write one tile. Returns `false` if the coordinate is out of range.
    pub fn set(&mut self, row: usize, col: usize, color: Option<String>) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.cells[row * self.cols + col] = color;
        true
    }

    /// Count of non-empty tiles.
    pub fn painted_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Produce a resized copy, keeping the anchored corner (or center) of the
    /// existing content fixed. Cells that fall outside the new bounds are
    /// dropped; new cells start empty.
    pub fn resize_anchored(&self, rows: usize, cols: usize, anchor: ResizeAnchor) -> TileGrid {
        let (row_shift, col_shift) = match anchor {
            ResizeAnchor::Center => (
                center_shift(self.rows, rows),
                center_shift(self.cols, cols),
            ),
            _ => (
                anchor_shift(self.rows, rows, anchor_keeps_end_rows(anchor)),
                anchor_shift(self.cols, cols, anchor_keeps_end_cols(anchor)),
            ),
        };

        let mut next = TileGrid::new(rows, cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let Some(color) = self.get(row, col) else {
                    continue;
                };
                let new_row = row as isize + row_shift;
                let new_col = col as isize + col_shift;
                if new_row < 0 || new_col < 0 {
                    continue;
                }
                next.set(new_row as usize, new_col as usize, Some(color.to_string()));
            }
        }
        next
    }
}

fn anchor_keeps_end_rows(anchor: ResizeAnchor) -> bool {
    matches!(anchor, ResizeAnchor::BottomLeft | ResizeAnchor::BottomRight)
}

fn anchor_keeps_end_cols(anchor: ResizeAnchor) -> bool {
    matches!(anchor, ResizeAnchor::TopRight | ResizeAnchor::BottomRight)
}

fn anchor_shift(old: usize, new: usize, keep_end: bool) -> isize {
    if keep_end {
        new as isize - old as isize
    } else {
        0
    }
}

fn center_shift(old: usize, new: usize) -> isize {
    (new as isize - old as isize) / 2
}

/// One placed stamp on an objects layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    /// Stable object id.
    pub id: String,
    /// Id of the catalog asset this stamp instantiates.
    pub asset_id: String,
    /// Tile row of the top-left corner.
    pub row: usize,
    /// Tile column of the top-left corner.
    pub col: usize,
    /// Width in tiles.
    pub w_tiles: usize,
    /// Height in tiles.
    pub h_tiles: usize,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Horizontal mirror.
    pub flip_x: bool,
    /// Vertical mirror.
    pub flip_y: bool,
    /// Stamp opacity in `[0, 1]`.
    pub opacity: f32,
}

/// An interactive marker. Tokens are global, not bound to a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Stable token id.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Tile row.
    pub row: usize,
    /// Tile column.
    pub col: usize,
    /// Optional marker color (`#RRGGBB`).
    pub color: Option<String>,
}

/// Brush parameters for the paint tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    /// Brush diameter in tiles.
    pub size: u32,
    /// Active paint color.
    pub color: String,
    /// Brush opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 1,
            color: "#000000".to_string(),
            opacity: 1.0,
        }
    }
}

/// Grid-overlay parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOverlaySettings {
    /// Whether grid lines are drawn.
    pub show_grid: bool,
    /// Whether placement snaps to tile boundaries.
    pub snap_to_grid: bool,
}

impl Default for GridOverlaySettings {
    fn default() -> Self {
        Self {
            show_grid: true,
            snap_to_grid: true,
        }
    }
}

/// The bundle of editor-tool parameters captured by a settings snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Brush parameters.
    pub brush: BrushSettings,
    /// Grid-overlay parameters.
    pub grid: GridOverlaySettings,
    /// Whether freehand strokes use natural (pressure-weighted) smoothing.
    pub natural_drawing: bool,
}

/// Camera state: zoom level (as tile size in pixels) and scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Tile size in pixels; doubles as the zoom level.
    pub tile_size: u32,
    /// Horizontal scroll offset in pixels.
    pub scroll_left: f64,
    /// Vertical scroll offset in pixels.
    pub scroll_top: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            tile_size: 32,
            scroll_left: 0.0,
            scroll_top: 0.0,
        }
    }
}

/// One entry in the asset catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Stable asset id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Where the asset content comes from; opaque to this engine.
    pub source: String,
    /// Default stamp width in tiles.
    pub w_tiles: usize,
    /// Default stamp height in tiles.
    pub h_tiles: usize,
}

/// An opaque serialized raster for a freehand paint layer.
///
/// The engine never inspects the bytes; encoding and decoding belong to the
/// rendering collaborator via [`RasterCodec`].
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RasterBlob(pub Vec<u8>);

impl RasterBlob {
    /// Byte length of the encoded raster.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the blob is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RasterBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterBlob({} bytes)", self.0.len())
    }
}

/// Capability implemented by the rendering collaborator that owns the live
/// raster surface of a canvas layer.
pub trait RasterCodec {
    /// Serialize the current surface into an opaque blob.
    fn encode(&self) -> RasterBlob;
    /// Replace the current surface with the contents of `blob`.
    fn decode(&mut self, blob: &RasterBlob) -> Result<(), ApplyError>;
}

/// The in-memory scene: layers, per-layer content, global tokens, the asset
/// catalog, tool settings, and camera state.
///
/// `SceneState` is the concrete [`SceneStore`] used by undo/redo: it takes
/// snapshots of its entities as [`HistoryEntry`] values and restores them
/// when entries are replayed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneState {
    /// Ordered layer list, bottom first.
    pub layers: Vec<LayerMeta>,
    /// Id of the active layer, if any.
    pub current_layer_id: Option<String>,
    /// Per-layer visibility flags.
    pub visibility: HashMap<String, bool>,
    /// Tile content of tilemap layers, keyed by layer id.
    pub tile_grids: HashMap<String, TileGrid>,
    /// Encoded raster content of canvas layers, keyed by layer id.
    pub rasters: HashMap<String, RasterBlob>,
    /// Placed stamps of object layers, keyed by layer id.
    pub objects: HashMap<String, Vec<PlacedObject>>,
    /// Global interactive markers.
    pub tokens: Vec<Token>,
    /// The asset catalog.
    pub assets: Vec<AssetEntry>,
    /// Editor-tool parameters.
    pub settings: ToolSettings,
    /// Camera state.
    pub view: ViewState,
    grid_rows: usize,
    grid_cols: usize,
    next_layer_seq: u64,
}

impl SceneState {
    /// Create an empty scene whose tilemap layers use a `rows` x `cols` grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            grid_rows: rows,
            grid_cols: cols,
            ..Self::default()
        }
    }

    /// Grid dimensions used for new tilemap layers, as `(rows, cols)`.
    pub fn grid_size(&self) -> (usize, usize) {
        (self.grid_rows, self.grid_cols)
    }

    /// Resize every tilemap layer, keeping the anchored region fixed.
    pub fn resize_grid(&mut self, rows: usize, cols: usize, anchor: ResizeAnchor) {
        self.grid_rows = rows;
        self.grid_cols = cols;
        for grid in self.tile_grids.values_mut() {
            *grid = grid.resize_anchored(rows, cols, anchor);
        }
    }

    /// Append a layer and create its content container. Returns the new
    /// layer's id. The first layer added becomes current.
    pub fn add_layer(&mut self, name: &str, kind: LayerKind) -> String {
        self.next_layer_seq += 1;
        let id = format!("layer-{}", self.next_layer_seq);
        self.layers.push(LayerMeta {
            id: id.clone(),
            name: name.to_string(),
            kind,
            opacity: 1.0,
        });
        self.visibility.insert(id.clone(), true);
        match kind {
            LayerKind::Tilemap => {
                self.tile_grids
                    .insert(id.clone(), TileGrid::new(self.grid_rows, self.grid_cols));
            }
            LayerKind::Canvas => {
                self.rasters.insert(id.clone(), RasterBlob::default());
            }
            LayerKind::Objects => {
                self.objects.insert(id.clone(), Vec::new());
            }
        }
        if self.current_layer_id.is_none() {
            self.current_layer_id = Some(id.clone());
        }
        id
    }

    /// Remove a layer and its content. Returns `false` if the id is unknown.
    pub fn remove_layer(&mut self, layer_id: &str) -> bool {
        let Some(index) = self.layers.iter().position(|l| l.id == layer_id) else {
            return false;
        };
        self.layers.remove(index);
        self.visibility.remove(layer_id);
        self.tile_grids.remove(layer_id);
        self.rasters.remove(layer_id);
        self.objects.remove(layer_id);
        if self.current_layer_id.as_deref() == Some(layer_id) {
            self.current_layer_id = self.layers.first().map(|l| l.id.clone());
        }
        true
    }

    /// Layer metadata by id.
    pub fn layer(&self, layer_id: &str) -> Option<&LayerMeta> {
        self.layers.iter().find(|l| l.id == layer_id)
    }

    /// Mutable layer metadata by id.
    pub fn layer_mut(&mut self, layer_id: &str) -> Option<&mut LayerMeta> {
        self.layers.iter_mut().find(|l| l.id == layer_id)
    }

    /// Tile grid of a tilemap layer.
    pub fn tile_grid(&self, layer_id: &str) -> Option<&TileGrid> {
        self.tile_grids.get(layer_id)
    }

    /// Mutable tile grid of a tilemap layer.
    pub fn tile_grid_mut(&mut self, layer_id: &str) -> Option<&mut TileGrid> {
        self.tile_grids.get_mut(layer_id)
    }

    /// Encode the live raster surface of a canvas layer into the scene via
    /// the collaborator-supplied codec. Returns `false` for unknown layers.
    pub fn capture_raster(&mut self, layer_id: &str, codec: &dyn RasterCodec) -> bool {
        if !self.rasters.contains_key(layer_id) {
            return false;
        }
        self.rasters.insert(layer_id.to_string(), codec.encode());
        true
    }

    /// Decode the stored raster of a canvas layer back into a live surface.
    pub fn apply_raster(
        &self,
        layer_id: &str,
        codec: &mut dyn RasterCodec,
    ) -> Result<(), ApplyError> {
        let blob = self
            .rasters
            .get(layer_id)
            .ok_or_else(|| ApplyError::new(format!("no raster for layer {layer_id:?}")))?;
        codec.decode(blob)
    }

    // --- Snapshot taker -----------------------------------------------------
    //
    // Each method deep-copies one entity kind into a HistoryEntry. Callers
    // push the result before mutating the live entity.

    /// Snapshot the tile content of a tilemap layer.
    pub fn snapshot_tilemap(&self, layer_id: &str) -> Option<HistoryEntry> {
        self.tile_grids.get(layer_id).map(|grid| HistoryEntry::Tilemap {
            layer_id: layer_id.to_string(),
            grid: grid.clone(),
        })
    }

    /// Snapshot the encoded raster of a canvas layer.
    pub fn snapshot_canvas(&self, layer_id: &str) -> Option<HistoryEntry> {
        self.rasters.get(layer_id).map(|raster| HistoryEntry::Canvas {
            layer_id: layer_id.to_string(),
            raster: raster.clone(),
        })
    }

    /// Snapshot the placed objects of an objects layer.
    pub fn snapshot_objects(&self, layer_id: &str) -> Option<HistoryEntry> {
        self.objects.get(layer_id).map(|objects| HistoryEntry::Objects {
            layer_id: layer_id.to_string(),
            objects: objects.clone(),
        })
    }

    /// Snapshot the global token list.
    pub fn snapshot_tokens(&self) -> HistoryEntry {
        HistoryEntry::Tokens {
            tokens: self.tokens.clone(),
        }
    }

    /// Snapshot the editor-tool settings bundle.
    pub fn snapshot_settings(&self) -> HistoryEntry {
        HistoryEntry::Settings {
            settings: self.settings.clone(),
        }
    }

    /// Snapshot the camera state.
    pub fn snapshot_view(&self) -> HistoryEntry {
        HistoryEntry::View { view: self.view }
    }

    /// Snapshot the asset catalog together with a layer's object list, for
    /// edits that create an asset and assign it in one step.
    pub fn snapshot_bundle(
        &self,
        layer_id: &str,
        include_assets: bool,
        include_objects: bool,
    ) -> Option<HistoryEntry> {
        let objects = if include_objects {
            Some(self.objects.get(layer_id)?.clone())
        } else {
            None
        };
        let assets = include_assets.then(|| self.assets.clone());
        Some(HistoryEntry::Bundle {
            layer_id: layer_id.to_string(),
            assets,
            objects,
        })
    }

    /// Snapshot the layer structure: order, active layer, and visibility.
    pub fn snapshot_layers(&self) -> HistoryEntry {
        HistoryEntry::Layers {
            layers: self.layers.clone(),
            current_layer_id: self.current_layer_id.clone(),
            visibility: self.visibility.clone(),
        }
    }

    fn restore_entry(&mut self, entry: &HistoryEntry) -> Result<(), ApplyError> {
        match entry {
            HistoryEntry::Tilemap { layer_id, grid } => {
                let slot = self.tile_grids.get_mut(layer_id).ok_or_else(|| {
                    ApplyError::new(format!("unknown tilemap layer {layer_id:?}"))
                })?;
                *slot = grid.clone();
                Ok(())
            }
            HistoryEntry::Canvas { layer_id, raster } => {
                let slot = self.rasters.get_mut(layer_id).ok_or_else(|| {
                    ApplyError::new(format!("unknown canvas layer {layer_id:?}"))
                })?;
                *slot = raster.clone();
                Ok(())
            }
            HistoryEntry::Objects { layer_id, objects } => {
                let slot = self.objects.get_mut(layer_id).ok_or_else(|| {
                    ApplyError::new(format!("unknown objects layer {layer_id:?}"))
                })?;
                *slot = objects.clone();
                Ok(())
            }
            HistoryEntry::Tokens { tokens } => {
                self.tokens = tokens.clone();
                Ok(())
            }
            HistoryEntry::Settings { settings } => {
                self.settings = settings.clone();
                Ok(())
            }
            HistoryEntry::View { view } => {
                self.view = *view;
                Ok(())
            }
            HistoryEntry::Bundle {
                layer_id,
                assets,
                objects,
            } => {
                if let Some(assets) = assets {
                    self.assets = assets.clone();
                }
                if let Some(objects) = objects {
                    let slot = self.objects.get_mut(layer_id).ok_or_else(|| {
                        ApplyError::new(format!("unknown objects layer {layer_id:?}"))
                    })?;
                    *slot = objects.clone();
                }
                Ok(())
            }
            HistoryEntry::Layers {
                layers,
                current_layer_id,
                visibility,
            } => {
                self.layers = layers.clone();
                self.current_layer_id = current_layer_id.clone();
                self.visibility = visibility.clone();
                Ok(())
            }
            HistoryEntry::Command(step) => Err(ApplyError::new(format!(
                "command entry {} is not a restorable snapshot",
                step.kind
            ))),
        }
    }
}

impl SceneStore for SceneState {
    fn capture_counterpart(&self, entry: &HistoryEntry) -> Option<HistoryEntry> {
        match entry {
            HistoryEntry::Tilemap { layer_id, .. } => self.snapshot_tilemap(layer_id),
            HistoryEntry::Canvas { layer_id, .. } => self.snapshot_canvas(layer_id),
            HistoryEntry::Objects { layer_id, .. } => self.snapshot_objects(layer_id),
            HistoryEntry::Tokens { .. } => Some(self.snapshot_tokens()),
            HistoryEntry::Settings { .. } => Some(self.snapshot_settings()),
            HistoryEntry::View { .. } => Some(self.snapshot_view()),
            HistoryEntry::Bundle {
                layer_id,
                assets,
                objects,
            } => self.snapshot_bundle(layer_id, assets.is_some(), objects.is_some()),
            HistoryEntry::Layers { .. } => Some(self.snapshot_layers()),
            HistoryEntry::Command(_) => None,
        }
    }

    fn restore(&mut self, entry: &HistoryEntry) -> Result<(), ApplyError> {
        self.restore_entry(entry)
    }
}
