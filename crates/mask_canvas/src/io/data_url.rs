use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbaImage};

use crate::error::{CanvasError, Result};

pub const PNG_MIME: &str = "image/png";

/// Encode an RGBA buffer as PNG bytes
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(CanvasError::Encode)?;
    Ok(buffer)
}

/// Wrap encoded bytes in a `data:<mime>;base64,` URL
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Decode either a base64 data URL or a bare base64 string into raw bytes.
pub fn decode_data_url(input: &str) -> Result<Vec<u8>> {
    let input = input.trim();
    let encoded = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| CanvasError::InvalidDataUrl("missing ',' separator".to_string()))?;
            if !header.ends_with(";base64") {
                return Err(CanvasError::InvalidDataUrl(format!(
                    "only base64 data URLs are supported, got '{}'",
                    header
                )));
            }
            payload
        }
        None => input,
    };

    Ok(STANDARD.decode(encoded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_data_url_decodes_back_to_same_pixels() {
        let mut image = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        image.put_pixel(1, 1, Rgba([0, 0, 0, 0]));

        let url = to_data_url(&encode_png(&image).unwrap(), PNG_MIME);
        assert!(url.starts_with("data:image/png;base64,"));

        let bytes = decode_data_url(&url).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_bare_base64_is_accepted() {
        let bytes = decode_data_url("aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_non_base64_data_url_is_rejected() {
        let err = decode_data_url("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, CanvasError::InvalidDataUrl(_)));

        let err = decode_data_url("data:image/png;base64").unwrap_err();
        assert!(matches!(err, CanvasError::InvalidDataUrl(_)));
    }

    #[test]
    fn test_garbage_payload_is_a_base64_error() {
        let err = decode_data_url("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, CanvasError::Base64(_)));
    }
}
