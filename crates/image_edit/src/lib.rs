//! # Image Edit
//!
//! Server half of the image-edit flow: validates `{image, mask, prompt}`
//! payloads produced by [`mask_canvas`], forwards them to a hosted image edits
//! endpoint, and exposes the whole router as MCP tools.
//!
//! Authentication and persistence are reached through the [`SessionProvider`]
//! and [`ExampleStore`] traits; in-memory implementations are provided.
//!
//! ```rust,no_run
//! use image_edit::{EditOptions, EditRequest, ImageEditClient};
//! use mask_canvas::EditorState;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut editor = EditorState::new();
//! editor.upload_bytes(&std::fs::read("photo.png")?)?;
//! let payload = editor.edit_payload("a sunlit indoor lounge area with a pool")?;
//!
//! let client = ImageEditClient::from_env()?;
//! let request = EditRequest::from_payload(&payload, EditOptions::default())?;
//! let response = client.edit(&request).await?;
//! println!("{} images", response.data.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod request;
pub mod store;

pub use auth::{InMemorySessions, Session, SessionProvider, User};
pub use client::ImageEditClient;
pub use config::ClientConfig;
pub use error::{EditError, Result};
pub use mcp::ImageEditServer;
pub use request::{EditOptions, EditRequest, EditResponse, EditedImage, ImageSize, ResponseFormat};
pub use store::{Example, ExampleStore, InMemoryExampleStore};
