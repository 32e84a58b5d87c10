use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, info, warn};

use crate::{
    canvas::MaskCanvas,
    error::{CanvasError, Result},
    io::decode_data_url,
    normalize::{NormalizedImage, normalize},
    types::{Brush, EditPayload, Point},
};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum EditorMessage {
    /// Replace the current image with a newly uploaded one
    #[serde(rename = "upload")]
    Upload {
        /// Image bytes as a data URL or bare base64
        data: String,
    },

    /// Pointer pressed on the canvas
    #[serde(rename = "pointer_down")]
    PointerDown { x: f32, y: f32 },

    /// Pointer moved over the canvas
    #[serde(rename = "pointer_move")]
    PointerMove { x: f32, y: f32 },

    /// Pointer released
    #[serde(rename = "pointer_up")]
    PointerUp,

    /// Change the eraser width for the following strokes
    #[serde(rename = "set_brush")]
    SetBrush {
        #[schemars(range(min = 1, max = 512))]
        width: u32,
    },

    /// The canvas was laid out at a new on-screen size
    #[serde(rename = "resize_display")]
    ResizeDisplay {
        #[schemars(range(min = 1))]
        width: u32,
        #[schemars(range(min = 1))]
        height: u32,
    },
}

impl EditorMessage {
    /// Get the JSON schema for all messages
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EditorMessage)
    }

    /// Get a list of all available message names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Upload { .. } => "Normalize an uploaded image and reset the mask",
            Self::PointerDown { .. } => "Start a new eraser stroke",
            Self::PointerMove { .. } => "Extend the current stroke, ignored when not drawing",
            Self::PointerUp => "Finish the current stroke",
            Self::SetBrush { .. } => "Set the eraser width in pixels for the next strokes",
            Self::ResizeDisplay { .. } => "Set the on-screen canvas size used to map pointer positions",
        }
    }
}

/// Top-level view state: the current image and the mask drawn over it.
///
/// Owned by a single caller and only changed through [`EditorState::update`].
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    image: Option<NormalizedImage>,
    canvas: Option<MaskCanvas>,
    brush: Brush,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brush(brush: Brush) -> Self {
        Self {
            brush,
            ..Self::default()
        }
    }

    pub fn image(&self) -> Option<&NormalizedImage> {
        self.image.as_ref()
    }

    pub fn canvas(&self) -> Option<&MaskCanvas> {
        self.canvas.as_ref()
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.set_brush(brush);
        }
    }

    /// Normalize `bytes` and swap it in with a fresh overlay.
    /// On failure the previous image and mask are kept.
    pub fn upload_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let image = normalize(bytes)?;
        info!("Uploaded image replaced, mask reset to {}x{}", image.side(), image.side());
        self.canvas = Some(MaskCanvas::with_brush(image.dimensions(), self.brush));
        self.image = Some(image);
        Ok(())
    }

    pub fn update(&mut self, message: EditorMessage) -> Result<()> {
        debug!("Editor message: {}", message);
        match message {
            EditorMessage::Upload { data } => {
                let bytes = decode_data_url(&data)?;
                self.upload_bytes(&bytes)
            }
            EditorMessage::PointerDown { x, y } => {
                self.with_canvas(|canvas| canvas.pointer_down(Point::new(x, y)));
                Ok(())
            }
            EditorMessage::PointerMove { x, y } => {
                self.with_canvas(|canvas| canvas.pointer_move(Point::new(x, y)));
                Ok(())
            }
            EditorMessage::PointerUp => {
                self.with_canvas(MaskCanvas::pointer_up);
                Ok(())
            }
            EditorMessage::SetBrush { width } => {
                self.set_brush(Brush::new(width));
                Ok(())
            }
            EditorMessage::ResizeDisplay { width, height } => {
                self.with_canvas(|canvas| canvas.set_display_size(width, height));
                Ok(())
            }
        }
    }

    /// Encode the image, and the mask when anything was erased, for the edit call
    pub fn edit_payload(&self, prompt: impl Into<String>) -> Result<EditPayload> {
        let image = self.image.as_ref().ok_or(CanvasError::NoImageLoaded)?;
        let mask = match self.canvas.as_ref().map(MaskCanvas::overlay) {
            Some(overlay) if !overlay.is_untouched() => Some(overlay.to_data_url()?),
            _ => {
                warn!("No pixels erased, the edit request will carry no mask");
                None
            }
        };

        Ok(EditPayload {
            image: image.to_data_url()?,
            mask,
            prompt: prompt.into(),
        })
    }

    fn with_canvas(&mut self, apply: impl FnOnce(&mut MaskCanvas)) {
        match self.canvas.as_mut() {
            Some(canvas) => apply(canvas),
            None => debug!("No image loaded, pointer event ignored"),
        }
    }
}
