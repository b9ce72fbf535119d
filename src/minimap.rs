/// Vertical pixels the minimap concedes to surrounding chrome when picking
/// its scale.
const RESERVED_MARGIN: f64 = 450.0;

/// Natural rendered height of one source line.
const NATURAL_LINE_HEIGHT: f64 = 21.0;

const MIN_SCALE: f64 = 0.1;
const MAX_SCALE: f64 = 1.0;

/// The viewport indicator never shrinks below this, so it stays grabbable.
const MIN_INDICATOR_HEIGHT: f64 = 10.0;

/// Live measurements of the scrolled content pane, sampled per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub total_height: f64,
}

/// Derived minimap layout for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapGeometry {
    pub scale: f64,
    pub row_height: f64,
    pub content_height: f64,
    pub indicator_height: f64,
    pub indicator_top: f64,
    pub max_scroll: f64,
}

/// An in-progress indicator drag. Anchoring to the gesture's start keeps
/// long drags from accumulating rounding drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    start_y: f64,
    start_scroll_top: f64,
}

/// Pure mapping between document space and minimap space.
///
/// All formulas are total: zero-height viewports and single-line documents
/// produce degenerate but finite geometry, never division by zero.
#[derive(Debug, Clone, Copy)]
pub struct MinimapMapper {
    line_count: usize,
    line_height: f64,
}

impl MinimapMapper {
    pub fn new(line_count: usize) -> Self {
        Self {
            line_count: line_count.max(1),
            line_height: NATURAL_LINE_HEIGHT,
        }
    }

    pub fn with_line_height(line_count: usize, line_height: f64) -> Self {
        Self {
            line_count: line_count.max(1),
            line_height,
        }
    }

    pub fn geometry(&self, viewport: ViewportMetrics) -> MinimapGeometry {
        let total_lines = self.line_count as f64;
        let natural_height = total_lines * self.line_height;

        let scale = if natural_height > 0.0 {
            ((viewport.viewport_height - RESERVED_MARGIN) / natural_height)
                .clamp(MIN_SCALE, MAX_SCALE)
        } else {
            MIN_SCALE
        };
        let row_height = (self.line_height * scale).max(1.0);
        let content_height = total_lines * row_height;

        let safe_viewport = viewport.viewport_height.max(1.0);
        let safe_total = viewport.total_height.max(1.0);
        let viewport_ratio = safe_viewport / safe_total;
        let indicator_height =
            (content_height * viewport_ratio).min(content_height).max(MIN_INDICATOR_HEIGHT);

        let max_scroll = (safe_total - safe_viewport).max(0.0);
        let scroll_ratio = if max_scroll > 0.0 {
            (viewport.scroll_top / max_scroll).min(1.0)
        } else {
            0.0
        };
        let indicator_top = scroll_ratio * (content_height - indicator_height).max(0.0);

        MinimapGeometry {
            scale,
            row_height,
            content_height,
            indicator_height,
            indicator_top,
            max_scroll,
        }
    }

    /// Maps a click at `y` within the minimap strip to a scroll target that
    /// centers the clicked region in the viewport.
    pub fn scroll_for_click(&self, y: f64, viewport: ViewportMetrics) -> f64 {
        let geometry = self.geometry(viewport);
        let click_ratio = y / geometry.content_height.max(1.0);
        let target = click_ratio * viewport.total_height - viewport.viewport_height / 2.0;
        target.clamp(0.0, geometry.max_scroll)
    }

    pub fn begin_drag(&self, y: f64, viewport: ViewportMetrics) -> DragSession {
        DragSession {
            start_y: y,
            start_scroll_top: viewport.scroll_top,
        }
    }

    /// Maps the current pointer position of an indicator drag to a scroll
    /// target, relative to where the gesture started.
    pub fn scroll_for_drag(
        &self,
        session: DragSession,
        y: f64,
        viewport: ViewportMetrics,
    ) -> f64 {
        let geometry = self.geometry(viewport);
        let delta_ratio = (y - session.start_y) / geometry.content_height.max(1.0);
        let delta_scroll = delta_ratio * viewport.total_height;
        (session.start_scroll_top + delta_scroll).clamp(0.0, geometry.max_scroll)
    }
}
