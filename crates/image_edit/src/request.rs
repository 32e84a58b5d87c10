use mask_canvas::{EditPayload, ImageDimensions, decode_data_url};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use ts_rs::TS;

use crate::error::{EditError, Result};

pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MAX_IMAGES: u8 = 10;

/// Output sizes accepted by the edits endpoint
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema, TS,
    Display, EnumString, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
pub enum ImageSize {
    #[serde(rename = "256x256")]
    #[strum(serialize = "256x256")]
    Small,
    #[serde(rename = "512x512")]
    #[strum(serialize = "512x512")]
    Medium,
    #[default]
    #[serde(rename = "1024x1024")]
    #[strum(serialize = "1024x1024")]
    Large,
}

#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema, TS,
    Display, EnumString, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Url,
    B64Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EditOptions {
    pub size: ImageSize,
    #[schemars(range(min = 1, max = 10))]
    pub n: u8,
    pub response_format: ResponseFormat,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            size: ImageSize::default(),
            n: 1,
            response_format: ResponseFormat::default(),
        }
    }
}

/// A validated, decoded edit request ready to be posted
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub image: Vec<u8>,
    pub mask: Option<Vec<u8>>,
    pub prompt: String,
    pub options: EditOptions,
}

impl EditRequest {
    /// Decode the payload's data URLs and check them against the endpoint's rules
    pub fn from_payload(payload: &EditPayload, options: EditOptions) -> Result<Self> {
        let image = decode_data_url(&payload.image)?;
        let mask = payload.mask.as_deref().map(decode_data_url).transpose()?;
        Self::new(image, mask, payload.prompt.clone(), options)
    }

    pub fn new(image: Vec<u8>, mask: Option<Vec<u8>>, prompt: String, options: EditOptions) -> Result<Self> {
        let prompt_chars = prompt.trim().chars().count();
        if prompt_chars == 0 {
            return Err(EditError::InvalidRequest("prompt must not be empty".to_string()));
        }
        if prompt_chars > MAX_PROMPT_CHARS {
            return Err(EditError::InvalidRequest(format!(
                "prompt is {} characters, the limit is {}",
                prompt_chars, MAX_PROMPT_CHARS
            )));
        }
        if options.n == 0 || options.n > MAX_IMAGES {
            return Err(EditError::InvalidRequest(format!(
                "n must be between 1 and {}, got {}",
                MAX_IMAGES, options.n
            )));
        }

        let image_dims = dimensions_of(&image, "image")?;
        if image_dims.width != image_dims.height {
            return Err(EditError::InvalidRequest(format!(
                "image must be square, got {}x{}",
                image_dims.width, image_dims.height
            )));
        }
        if let Some(mask) = &mask {
            let mask_dims = dimensions_of(mask, "mask")?;
            if mask_dims != image_dims {
                return Err(EditError::InvalidRequest(format!(
                    "mask is {}x{} but image is {}x{}",
                    mask_dims.width, mask_dims.height, image_dims.width, image_dims.height
                )));
            }
        }

        Ok(Self {
            image,
            mask,
            prompt,
            options,
        })
    }
}

fn dimensions_of(bytes: &[u8], field: &str) -> Result<ImageDimensions> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| EditError::InvalidRequest(format!("{} is not a decodable image: {}", field, e)))?;
    Ok(ImageDimensions {
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// One generated image. The endpoint fills either `url` or `b64_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct EditedImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct EditResponse {
    pub created: u64,
    pub data: Vec<EditedImage>,
}
