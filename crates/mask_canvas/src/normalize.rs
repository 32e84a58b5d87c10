use image::{GenericImageView, RgbaImage, imageops::crop_imm};
use tracing::{debug, info};

use crate::{
    error::{CanvasError, Result},
    io::{PNG_MIME, encode_png, to_data_url},
    types::ImageDimensions,
};

/// A centered square crop of an uploaded image
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pixels: RgbaImage,
    source: ImageDimensions,
    offset: (u32, u32),
}

impl NormalizedImage {
    /// Side length of the square
    pub fn side(&self) -> u32 {
        self.pixels.width()
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }

    /// Dimensions of the image before cropping
    pub fn source_dimensions(&self) -> ImageDimensions {
        self.source
    }

    /// Top-left corner of the crop within the source image
    pub fn offset(&self) -> (u32, u32) {
        self.offset
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.pixels)
    }

    pub fn to_data_url(&self) -> Result<String> {
        Ok(to_data_url(&self.encode_png()?, PNG_MIME))
    }
}

/// Offsets and side length of the centered square inside a `width` x `height` image
pub fn centered_square(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}

/// Decode raw image bytes and crop them to a centered square.
///
/// The format is sniffed from the content. Anything the decoder rejects is a
/// [`CanvasError::Decode`].
pub fn normalize(bytes: &[u8]) -> Result<NormalizedImage> {
    let decoded = image::load_from_memory(bytes).map_err(CanvasError::Decode)?;
    let (width, height) = decoded.dimensions();
    debug!("Decoded {} bytes into a {}x{} image", bytes.len(), width, height);
    normalize_rgba(&decoded.to_rgba8())
}

/// Crop an already decoded image to a centered square
pub fn normalize_rgba(image: &RgbaImage) -> Result<NormalizedImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CanvasError::EmptyImage { width, height });
    }

    let (x, y, side) = centered_square(width, height);
    let pixels = crop_imm(image, x, y, side, side).to_image();
    info!("Normalized {}x{} image to {}x{} at offset ({}, {})", width, height, side, side, x, y);

    Ok(NormalizedImage {
        pixels,
        source: ImageDimensions { width, height },
        offset: (x, y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Each pixel encodes its own coordinates so crops can be located
    fn create_test_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, (x / 256) as u8, 255])
        })
    }

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        encode_png(image).unwrap()
    }

    #[test]
    fn test_landscape_is_cropped_horizontally() {
        let source = create_test_image(400, 300);
        let normalized = normalize(&png_bytes(&source)).unwrap();

        assert_eq!(normalized.side(), 300);
        assert_eq!(normalized.dimensions(), ImageDimensions { width: 300, height: 300 });
        assert_eq!(normalized.offset(), (50, 0));
        assert_eq!(normalized.source_dimensions(), ImageDimensions { width: 400, height: 300 });
        assert_eq!(normalized.pixels().get_pixel(0, 0), source.get_pixel(50, 0));
        assert_eq!(normalized.pixels().get_pixel(299, 299), source.get_pixel(349, 299));
    }

    #[test]
    fn test_portrait_is_cropped_vertically() {
        let source = create_test_image(120, 200);
        let normalized = normalize(&png_bytes(&source)).unwrap();

        assert_eq!(normalized.side(), 120);
        assert_eq!(normalized.offset(), (0, 40));
        assert_eq!(normalized.pixels().get_pixel(5, 0), source.get_pixel(5, 40));
    }

    #[test]
    fn test_square_is_unchanged() {
        let source = create_test_image(64, 64);
        let normalized = normalize(&png_bytes(&source)).unwrap();

        assert_eq!(normalized.offset(), (0, 0));
        assert_eq!(normalized.pixels(), &source);
    }

    #[test]
    fn test_odd_difference_rounds_offset_down() {
        assert_eq!(centered_square(101, 50), (25, 0, 50));
        assert_eq!(centered_square(7, 10), (0, 1, 7));
    }

    #[test]
    fn test_side_is_always_min_dimension() {
        for (width, height) in [(1, 1), (1, 9), (9, 1), (33, 17), (256, 255)] {
            let (x, y, side) = centered_square(width, height);
            assert_eq!(side, width.min(height));
            assert_eq!(x, (width - side) / 2);
            assert_eq!(y, (height - side) / 2);
        }
    }

    #[test]
    fn test_jpeg_input_is_accepted() {
        let source = image::DynamicImage::ImageRgba8(create_test_image(40, 20)).to_rgb8();
        let mut bytes = Vec::new();
        source
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();

        let normalized = normalize(&bytes).unwrap();
        assert_eq!(normalized.side(), 20);
        assert_eq!(normalized.offset(), (10, 0));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CanvasError::Decode(_)));
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let err = normalize_rgba(&RgbaImage::new(0, 10)).unwrap_err();
        assert!(matches!(err, CanvasError::EmptyImage { width: 0, height: 10 }));
    }

    #[test]
    fn test_data_url_is_png() {
        let normalized = normalize_rgba(&create_test_image(10, 12)).unwrap();
        let url = normalized.to_data_url().unwrap();
        let bytes = crate::io::decode_data_url(&url).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
        assert_eq!(image::load_from_memory(&bytes).unwrap().to_rgba8(), *normalized.pixels());
    }
}
