use tracing::debug;

use crate::{
    overlay::MaskOverlay,
    types::{Brush, ImageDimensions, Point},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawState {
    Idle,
    /// A stroke is in progress; `last` is where the next segment starts
    Drawing { last: Point },
}

/// Freehand eraser bound 1:1 to a normalized image.
///
/// Pointer positions arrive in display space and are mapped onto the overlay,
/// whose size always matches the image it was created for.
#[derive(Debug, Clone)]
pub struct MaskCanvas {
    overlay: MaskOverlay,
    brush: Brush,
    state: DrawState,
    display: ImageDimensions,
}

impl MaskCanvas {
    pub fn new(dimensions: ImageDimensions) -> Self {
        Self::with_brush(dimensions, Brush::default())
    }

    pub fn with_brush(dimensions: ImageDimensions, brush: Brush) -> Self {
        Self {
            overlay: MaskOverlay::new(dimensions.width, dimensions.height),
            brush,
            state: DrawState::Idle,
            display: dimensions,
        }
    }

    pub fn overlay(&self) -> &MaskOverlay {
        &self.overlay
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing { .. })
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    /// Record the on-screen size the canvas is stretched to.
    /// Zero-sized displays are ignored.
    pub fn set_display_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!("Ignoring empty display size {}x{}", width, height);
            return;
        }
        self.display = ImageDimensions { width, height };
    }

    /// Map a display-space position to overlay pixel space
    pub fn to_canvas(&self, point: Point) -> Point {
        let canvas = self.overlay.dimensions();
        Point {
            x: point.x * canvas.width as f32 / self.display.width as f32,
            y: point.y * canvas.height as f32 / self.display.height as f32,
        }
    }

    /// Begin a new path. Nothing is painted until the pointer moves.
    /// Non-finite positions are ignored.
    pub fn pointer_down(&mut self, point: Point) {
        let start = self.to_canvas(point);
        if !start.is_finite() {
            debug!("Ignoring non-finite pointer down at ({}, {})", point.x, point.y);
            return;
        }
        debug!("Stroke started at ({:.1}, {:.1})", start.x, start.y);
        self.state = DrawState::Drawing { last: start };
    }

    /// Extend the current path and paint the new segment.
    /// Ignored while idle or when the position is not finite.
    pub fn pointer_move(&mut self, point: Point) {
        let DrawState::Drawing { last } = self.state else {
            return;
        };
        let next = self.to_canvas(point);
        if !next.is_finite() {
            debug!("Ignoring non-finite pointer move to ({}, {})", point.x, point.y);
            return;
        }
        self.overlay.erase_segment(last, next, &self.brush);
        self.state = DrawState::Drawing { last: next };
    }

    /// Finish the current path
    pub fn pointer_up(&mut self) {
        if self.is_drawing() {
            debug!("Stroke finished, {} pixels erased so far", self.overlay.erased_pixel_count());
        }
        self.state = DrawState::Idle;
    }

    /// Convenience for replaying a whole polyline as down / move... / up
    pub fn stroke(&mut self, points: &[Point]) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.pointer_down(*first);
        for point in rest {
            self.pointer_move(*point);
        }
        self.pointer_up();
    }
}
