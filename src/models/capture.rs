// Data structures for color/depth frames delivered by the camera

use serde::{Deserialize, Serialize};

/// A color frame from the camera, tightly packed 3 bytes per pixel
#[derive(Debug, Clone)]
pub struct ColorFrame {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

impl ColorFrame {
    /// Expected buffer length for the declared dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    pub fn validate(&self) -> CaptureResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidFrame(format!(
                "zero-sized frame {}x{}",
                self.width, self.height
            )));
        }
        if self.data.len() != self.expected_len() {
            return Err(CaptureError::InvalidFrame(format!(
                "buffer holds {} bytes, expected {} for {}x{}",
                self.data.len(),
                self.expected_len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// A depth frame aligned to the color stream, one 16-bit value per pixel
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
}

/// Pixel format of color frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Bgr8,
    Rgb8,
}

/// One acquisition from the camera. `None` means "not ready yet", not an error.
#[derive(Debug, Clone, Default)]
pub struct FramePair {
    pub color: Option<ColorFrame>,
    pub depth: Option<DepthFrame>,
}

impl FramePair {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Camera status for the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSourceStatus {
    pub is_streaming: bool,
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Error types for frame acquisition
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
