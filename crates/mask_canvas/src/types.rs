use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Pointer position in canvas pixel space. Fractional offsets are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema, TS)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub(crate) fn as_tuple(self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Eraser tip used when painting strokes onto the overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
pub struct Brush {
    /// Stroke width in pixels. A width of 1 erases exactly the line path.
    #[schemars(range(min = 1, max = 512))]
    pub width: u32,
}

impl Brush {
    pub fn new(width: u32) -> Self {
        Self { width: width.max(1) }
    }

    /// Radius of the disc stamped along the path, 0 for a single pixel tip
    pub fn radius(&self) -> i32 {
        (self.width / 2) as i32
    }
}

impl Default for Brush {
    fn default() -> Self {
        // Same as the 2D canvas default line width
        Self { width: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Everything the remote edit call needs, encoded as data URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct EditPayload {
    /// The normalized square image as a PNG data URL
    pub image: String,
    /// Overlay with erased (transparent) pixels marking the editable region.
    /// Absent when nothing has been erased.
    pub mask: Option<String>,
    /// Natural-language description of the desired edit
    pub prompt: String,
}
