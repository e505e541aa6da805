// Frame encoding - camera buffer to RGB image, JPEG compression and hex wire encoding

use crate::models::capture::{ColorFrame, PixelFormat};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fmt::Write;

/// Convert a camera frame to an RGB image, swapping channels for BGR input
pub fn to_rgb_image(frame: ColorFrame) -> EncodeResult<RgbImage> {
    frame
        .validate()
        .map_err(|e| EncodeError::InvalidBuffer(e.to_string()))?;

    let ColorFrame {
        width,
        height,
        mut data,
        format,
        ..
    } = frame;

    if format == PixelFormat::Bgr8 {
        for pixel in data.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }
    }

    RgbImage::from_raw(width, height, data).ok_or_else(|| {
        EncodeError::InvalidBuffer(format!("buffer does not fit a {}x{} RGB image", width, height))
    })
}

/// Compress an RGB image to JPEG. Quality is clamped to 1..=100.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> EncodeResult<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(image)?;
    Ok(buffer)
}

/// Lowercase hexadecimal encoding used for the frame field of stream messages
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing to a String cannot fail
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Invalid frame buffer: {0}")]
    InvalidBuffer(String),

    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

pub type EncodeResult<T> = Result<T, EncodeError>;
