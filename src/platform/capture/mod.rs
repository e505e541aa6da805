// Camera frame sources
// Every source implements FrameSource; a device driver (RealSense, V4L2, ...) plugs in here

pub mod synthetic;

pub use synthetic::{IdleFrameSource, SyntheticFrameSource};

use crate::models::capture::{CaptureResult, FramePair, FrameSourceStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Platform-agnostic camera trait
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Start streaming from the device
    async fn start(&self) -> CaptureResult<()>;

    /// Stop streaming
    async fn stop(&self) -> CaptureResult<()>;

    /// Latest color/depth pair. Empty when the device is stopped or a frame is not ready yet.
    async fn get_frames(&self) -> FramePair;

    /// Current device status
    fn status(&self) -> FrameSourceStatus;
}

/// Which frame source the server binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSourceKind {
    /// Never produces frames
    Idle,
    /// Generated test pattern
    Synthetic,
}

/// Factory function to create the configured frame source
pub fn create_frame_source(kind: FrameSourceKind, width: u32, height: u32, fps: u32) -> Arc<dyn FrameSource> {
    match kind {
        FrameSourceKind::Idle => Arc::new(IdleFrameSource::new(width, height, fps)),
        FrameSourceKind::Synthetic => Arc::new(SyntheticFrameSource::new(width, height, fps)),
    }
}
