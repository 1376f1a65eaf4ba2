//! Image payload decoding: data-URI stripping, base64, raster decode.

use base64::Engine;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unrecognized image data: {0}")]
    Raster(#[from] image::ImageError),
}

/// A decoded RGB raster owned by a single request.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    image: RgbImage,
}

impl PixelBuffer {
    pub fn from_rgb(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel data in RGB channel order.
    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }
}

/// Strip an optional `<scheme>,` data-URI prefix and return the base64 body.
fn strip_data_uri(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, body)) => body,
        None => payload,
    }
}

/// Decode a base64 (optionally data-URI wrapped) image payload into RGB pixels.
pub fn decode_payload(payload: &str) -> Result<PixelBuffer, DecodeError> {
    let body = strip_data_uri(payload).trim();
    let bytes = base64::engine::general_purpose::STANDARD.decode(body)?;
    decode_bytes(&bytes)
}

/// Decode raw encoded image bytes (PNG, JPEG, ...) into RGB pixels.
pub fn decode_bytes(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    let image = image::load_from_memory(bytes)?.to_rgb8();
    tracing::trace!(
        width = image.width(),
        height = image.height(),
        "decoded image"
    );
    Ok(PixelBuffer { image })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 60]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    }

    #[test]
    fn test_decode_plain_base64() {
        let pixels = decode_payload(&png_base64(8, 4)).unwrap();
        assert_eq!(pixels.width(), 8);
        assert_eq!(pixels.height(), 4);
    }

    #[test]
    fn test_decode_data_uri() {
        let payload = format!("data:image/png;base64,{}", png_base64(3, 5));
        let pixels = decode_payload(&payload).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (3, 5));
    }

    #[test]
    fn test_decode_preserves_rgb_order() {
        let pixels = decode_payload(&png_base64(2, 2)).unwrap();
        assert_eq!(pixels.as_rgb().get_pixel(0, 0), &Rgb([200, 30, 60]));
    }

    #[test]
    fn test_invalid_base64() {
        let err = decode_payload("data:image/png;base64,@@not base64@@").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_valid_base64_but_not_an_image() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"fake_image");
        let err = decode_payload(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::Raster(_)));
    }

    #[test]
    fn test_empty_payload() {
        assert!(decode_payload("").is_err());
        assert!(decode_payload("data:image/jpeg;base64,").is_err());
    }

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(strip_data_uri("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("QUJD"), "QUJD");
    }
}
