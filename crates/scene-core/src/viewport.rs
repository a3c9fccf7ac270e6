//! Viewport Recenter Algorithm
//!
//! Pure geometry: compute the zoom level (tile size) and scroll offset that
//! fit a target rectangle into the viewport. Applying the result to an actual
//! scrollable element or camera is the collaborator's responsibility, with a
//! two-phase contract: apply the tile size synchronously, then apply the
//! scroll offset after layout has reflowed (scroll clamping depends on the
//! post-resize layout).
//!
//! A recorded [`View`](crate::HistoryEntry::View) history entry stores the
//! absolute state actually reached, so replaying it is a direct assignment;
//! only new zoom-to-rect gestures route through [`compute_zoom_to_rect`].

/// Smallest tile size in pixels (fully zoomed out).
pub const MIN_TILE_SIZE: u32 = 8;
/// Largest tile size in pixels (fully zoomed in).
pub const MAX_TILE_SIZE: u32 = 128;
/// Tile sizes snap to multiples of this so grid lines stay on integer pixel
/// boundaries.
pub const TILE_SNAP_STEP: u32 = 4;

/// Margin applied when zooming in, leaving some air around the target rect.
const ZOOM_IN_MARGIN: f64 = 0.92;
/// Looser margin applied when zooming out.
const ZOOM_OUT_MARGIN: f64 = 0.98;
/// Rectangles with either side below this many pixels are not meaningful
/// zoom targets.
const MIN_TARGET_RECT_PX: f64 = 8.0;
/// Forced step when a zoom-to-rect gesture would otherwise not zoom in.
const FORCED_ZOOM_IN_STEP: u32 = 8;

/// A target rectangle in content pixels (at the current tile size).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Measurements of the scrollable viewport the content lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    /// Viewport width in pixels.
    pub container_width: f64,
    /// Viewport height in pixels.
    pub container_height: f64,
    /// Fixed chrome (toolbars etc.) subtracted from the usable height.
    pub chrome_inset: f64,
    /// Current horizontal scroll offset.
    pub scroll_left: f64,
    /// Current vertical scroll offset.
    pub scroll_top: f64,
}

/// Grid dimensions in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub cols: usize,
}

/// Options for a zoom-to-rect gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoomOptions {
    /// Allow the computed tile size to be smaller than the current one.
    /// When false (the default gesture), the result always zooms in by at
    /// least one step.
    pub allow_zoom_out: bool,
}

/// The computed view: new tile size and the scroll offset that keeps the
/// target rectangle centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTarget {
    /// New tile size in pixels.
    pub tile_size: u32,
    /// New horizontal scroll offset.
    pub scroll_left: f64,
    /// New vertical scroll offset.
    pub scroll_top: f64,
}

impl ZoomTarget {
    /// Whether this target differs from the given current view.
    pub fn changed(&self, current_tile_size: u32, scroll_left: f64, scroll_top: f64) -> bool {
        self.tile_size != current_tile_size
            || self.scroll_left != scroll_left
            || self.scroll_top != scroll_top
    }
}

fn snap_tile_size(raw: f64) -> u32 {
    let step = f64::from(TILE_SNAP_STEP);
    let snapped = (raw / step).round() * step;
    snapped.max(0.0) as u32
}

/// Compute the zoom level and scroll offset that center `rect` in the
/// viewport.
///
/// Degenerate rectangles (either side below 8 px) return the unchanged view.
/// The new tile size is the fit scale shrunk by a small visual margin,
/// snapped to multiples of [`TILE_SNAP_STEP`] and clamped to
/// `[MIN_TILE_SIZE, MAX_TILE_SIZE]`; unless
/// [`allow_zoom_out`](ZoomOptions::allow_zoom_out) is set, a gesture that
/// would not zoom in is forced up by one step instead. The scroll offset is
/// chosen so the point at the rectangle's center, expressed as a fraction of
/// the previous content size, stays centered at the new tile size.
pub fn compute_zoom_to_rect(
    rect: &ZoomRect,
    geometry: &ViewportGeometry,
    grid: GridDims,
    current_tile_size: u32,
    opts: ZoomOptions,
) -> ZoomTarget {
    let unchanged = ZoomTarget {
        tile_size: current_tile_size,
        scroll_left: geometry.scroll_left,
        scroll_top: geometry.scroll_top,
    };
    if rect.width < MIN_TARGET_RECT_PX || rect.height < MIN_TARGET_RECT_PX {
        return unchanged;
    }

    let available_height = (geometry.container_height - geometry.chrome_inset).max(1.0);
    let scale_x = geometry.container_width / rect.width;
    let scale_y = available_height / rect.height;
    let fit = scale_x.min(scale_y);
    let margin = if fit > 1.0 {
        ZOOM_IN_MARGIN
    } else {
        ZOOM_OUT_MARGIN
    };
    let target_scale = fit * margin;

    let snapped = snap_tile_size(f64::from(current_tile_size) * target_scale);
    let mut tile_size = snapped.clamp(MIN_TILE_SIZE, MAX_TILE_SIZE);
    if !opts.allow_zoom_out && tile_size <= current_tile_size {
        tile_size = (current_tile_size + FORCED_ZOOM_IN_STEP).clamp(MIN_TILE_SIZE, MAX_TILE_SIZE);
    }

    // The rectangle's center as a fraction of the previous content size.
    let prev_width = (grid.cols as f64 * f64::from(current_tile_size)).max(1.0);
    let prev_height = (grid.rows as f64 * f64::from(current_tile_size)).max(1.0);
    let rx = ((rect.left + rect.width / 2.0) / prev_width).clamp(0.0, 1.0);
    let ry = ((rect.top + rect.height / 2.0) / prev_height).clamp(0.0, 1.0);

    let next_width = grid.cols as f64 * f64::from(tile_size);
    let next_height = grid.rows as f64 * f64::from(tile_size);

    // Content narrower than the viewport sits centered inside it; that offset
    // shifts where a content-relative point lands on screen.
    let offset_x = ((geometry.container_width - next_width) / 2.0).max(0.0);
    let offset_y = ((available_height - next_height) / 2.0).max(0.0);

    let max_scroll_x = (next_width + offset_x * 2.0 - geometry.container_width).max(0.0);
    let max_scroll_y = (next_height + offset_y * 2.0 - available_height).max(0.0);

    let scroll_left =
        (rx * next_width + offset_x - geometry.container_width / 2.0).clamp(0.0, max_scroll_x);
    let scroll_top =
        (ry * next_height + offset_y - available_height / 2.0).clamp(0.0, max_scroll_y);

    ZoomTarget {
        tile_size,
        scroll_left,
        scroll_top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> ViewportGeometry {
        ViewportGeometry {
            container_width: 800.0,
            container_height: 600.0,
            chrome_inset: 0.0,
            scroll_left: 120.0,
            scroll_top: 40.0,
        }
    }

    #[test]
    fn test_tile_size_snaps_to_step() {
        for raw in [9.0, 10.0, 11.9] {
            assert_eq!(snap_tile_size(raw) % TILE_SNAP_STEP, 0, "raw={raw}");
        }
        assert_eq!(snap_tile_size(9.0), 8);
        assert_eq!(snap_tile_size(14.0), 16);
    }

    #[test]
    fn test_small_rect_returns_unchanged_view() {
        let rect = ZoomRect {
            left: 0.0,
            top: 0.0,
            width: 4.0,
            height: 16.0,
        };
        let target = compute_zoom_to_rect(
            &rect,
            &geometry(),
            GridDims { rows: 20, cols: 20 },
            24,
            ZoomOptions::default(),
        );
        assert_eq!(target.tile_size, 24);
        assert_eq!(target.scroll_left, 120.0);
        assert_eq!(target.scroll_top, 40.0);
    }

    #[test]
    fn test_zoom_in_is_clamped_to_max() {
        let rect = ZoomRect {
            left: 0.0,
            top: 0.0,
            width: 10.0,
            height: 10.0,
        };
        let target = compute_zoom_to_rect(
            &rect,
            &geometry(),
            GridDims { rows: 20, cols: 20 },
            64,
            ZoomOptions::default(),
        );
        assert_eq!(target.tile_size, MAX_TILE_SIZE);
    }

    #[test]
    fn test_scroll_is_non_negative() {
        let rect = ZoomRect {
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 100.0,
        };
        let target = compute_zoom_to_rect(
            &rect,
            &geometry(),
            GridDims { rows: 40, cols: 40 },
            16,
            ZoomOptions::default(),
        );
        assert!(target.scroll_left >= 0.0);
        assert!(target.scroll_top >= 0.0);
    }
}
