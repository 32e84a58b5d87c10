use image_edit::{EditOptions, ImageSize, ResponseFormat};
use mask_canvas::{Brush, CanvasError, EditorMessage, EditorState};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    CanvasError(#[from] CanvasError),
    #[error("Missing 'prompt' field")]
    MissingPrompt,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One freehand eraser stroke as a polyline in display coordinates
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Stroke {
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

fn default_n() -> u8 {
    1
}

fn default_brush_width() -> u32 {
    1
}

/// Everything needed to mask an image and request an edit
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EditJob {
    /// Path of the source image
    pub image: String,
    pub output_dir: String,
    pub prompt: Option<String>,
    #[serde(default)]
    pub size: ImageSize,
    #[serde(default = "default_n")]
    pub n: u8,
    #[serde(default = "default_brush_width")]
    pub brush_width: u32,
    /// On-screen size the strokes were drawn at, if not the image's own size
    #[serde(default)]
    pub display: Option<DisplaySize>,
    #[serde(default)]
    pub strokes: Vec<Stroke>,
}

impl EditJob {
    /// Load EditJob configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, JobError> {
        Ok(toml::from_str(content)?)
    }

    /// Load EditJob configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, JobError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(JobError::UnsupportedFileFormat),
        }
    }

    /// Save EditJob configuration to a file, format chosen by extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), JobError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(&self)?,
            Some("json") => serde_json::to_string_pretty(&self)?,
            _ => return Err(JobError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        Path::new(&self.output_dir).join(file_name)
    }

    pub fn prompt(&self) -> Result<&str, JobError> {
        self.prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(JobError::MissingPrompt)
    }

    pub fn edit_options(&self) -> EditOptions {
        EditOptions {
            size: self.size,
            n: self.n,
            response_format: ResponseFormat::B64Json,
        }
    }

    /// Pointer messages replaying every stroke, preceded by the display size when set
    pub fn messages(&self) -> Vec<EditorMessage> {
        let mut messages = Vec::new();
        if let Some(DisplaySize { width, height }) = self.display {
            messages.push(EditorMessage::ResizeDisplay { width, height });
        }
        for stroke in &self.strokes {
            let Some((&[x, y], rest)) = stroke.points.split_first() else {
                continue;
            };
            messages.push(EditorMessage::PointerDown { x, y });
            messages.extend(rest.iter().map(|&[x, y]| EditorMessage::PointerMove { x, y }));
            messages.push(EditorMessage::PointerUp);
        }
        messages
    }

    /// Load the image, then replay the strokes over it
    pub fn run_editor(&self, base_dir: &Path) -> Result<EditorState, JobError> {
        let bytes = fs::read(base_dir.join(&self.image))?;
        let mut editor = EditorState::with_brush(Brush::new(self.brush_width));
        editor.upload_bytes(&bytes)?;
        for message in self.messages() {
            editor.update(message)?;
        }
        Ok(editor)
    }
}
