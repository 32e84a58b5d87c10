//! # Mask Canvas
//!
//! Client-side half of the image-edit flow: square-crop an uploaded image,
//! erase a region of an overlay bound to it, and package both for a remote
//! edit call.
//!
//! ## Core Features
//!
//! - **Normalization**: decode any supported raster and crop the centered square
//! - **Erase Compositing**: freehand strokes punch transparent holes in the overlay
//! - **Message-driven State**: the editor is updated through serializable messages
//! - **Data URLs**: PNG encoding to and from `data:image/png;base64,` strings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask_canvas::{EditorMessage, EditorState};
//!
//! let mut editor = EditorState::new();
//! editor.upload_bytes(&std::fs::read("photo.jpg")?)?;
//!
//! editor.update(EditorMessage::PointerDown { x: 10.0, y: 10.0 })?;
//! editor.update(EditorMessage::PointerMove { x: 50.0, y: 50.0 })?;
//! editor.update(EditorMessage::PointerUp)?;
//!
//! let payload = editor.edit_payload("a flamingo in the pool")?;
//! assert!(payload.mask.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod canvas;
pub mod editor;
pub mod error;
pub mod io;
pub mod normalize;
pub mod overlay;
pub mod types;

pub use canvas::{DrawState, MaskCanvas};
pub use editor::{EditorMessage, EditorState};
pub use error::{CanvasError, Result};
pub use io::*;
pub use normalize::{NormalizedImage, centered_square, normalize, normalize_rgba};
pub use overlay::MaskOverlay;
pub use types::{Brush, EditPayload, ImageDimensions, Point};
