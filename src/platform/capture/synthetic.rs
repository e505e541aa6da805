// Device-free frame sources: an idle source and a moving test pattern

use super::FrameSource;
use crate::models::capture::{
    CaptureResult, ColorFrame, DepthFrame, FramePair, FrameSourceStatus, PixelFormat,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Frame source that starts and stops but never has a frame ready
pub struct IdleFrameSource {
    is_streaming: AtomicBool,
    width: u32,
    height: u32,
    fps: u32,
}

impl IdleFrameSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            is_streaming: AtomicBool::new(false),
            width,
            height,
            fps,
        }
    }
}

#[async_trait]
impl FrameSource for IdleFrameSource {
    async fn start(&self) -> CaptureResult<()> {
        self.is_streaming.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> CaptureResult<()> {
        self.is_streaming.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn get_frames(&self) -> FramePair {
        FramePair::empty()
    }

    fn status(&self) -> FrameSourceStatus {
        FrameSourceStatus {
            is_streaming: self.is_streaming.load(Ordering::SeqCst),
            source: "idle".to_string(),
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}

/// BGR test pattern with an aligned flat depth frame. The pattern shifts one
/// step per delivered frame so consumers can tell frames apart.
pub struct SyntheticFrameSource {
    is_streaming: AtomicBool,
    frame_counter: AtomicU64,
    width: u32,
    height: u32,
    fps: u32,
}

/// Depth reported for every pixel of the synthetic depth frame, in millimetres
const SYNTHETIC_DEPTH_MM: u16 = 1500;

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            is_streaming: AtomicBool::new(false),
            frame_counter: AtomicU64::new(0),
            width,
            height,
            fps,
        }
    }

    fn render(&self, frame_number: u64) -> ColorFrame {
        let (width, height) = (self.width as usize, self.height as usize);
        let shift = (frame_number % 256) as usize;
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let blue = ((x * 255) / width.max(1) + shift) % 256;
                let green = ((y * 255) / height.max(1)) % 256;
                let red = ((x + y + shift) / 8 % 2) * 255;
                data.extend_from_slice(&[blue as u8, green as u8, red as u8]);
            }
        }

        ColorFrame {
            timestamp: chrono::Utc::now().timestamp_millis(),
            width: self.width,
            height: self.height,
            data,
            format: PixelFormat::Bgr8,
        }
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frame_counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn start(&self) -> CaptureResult<()> {
        if !self.is_streaming.swap(true, Ordering::SeqCst) {
            tracing::info!(
                "Synthetic camera started: {}x{}@{}fps",
                self.width,
                self.height,
                self.fps
            );
        }
        Ok(())
    }

    async fn stop(&self) -> CaptureResult<()> {
        if self.is_streaming.swap(false, Ordering::SeqCst) {
            tracing::info!("Synthetic camera stopped");
        }
        Ok(())
    }

    async fn get_frames(&self) -> FramePair {
        if !self.is_streaming.load(Ordering::SeqCst) || self.width == 0 || self.height == 0 {
            return FramePair::empty();
        }

        let frame_number = self.frame_counter.fetch_add(1, Ordering::SeqCst);
        let color = self.render(frame_number);
        let depth = DepthFrame {
            width: self.width,
            height: self.height,
            data: vec![SYNTHETIC_DEPTH_MM; self.width as usize * self.height as usize],
        };

        FramePair {
            color: Some(color),
            depth: Some(depth),
        }
    }

    fn status(&self) -> FrameSourceStatus {
        FrameSourceStatus {
            is_streaming: self.is_streaming.load(Ordering::SeqCst),
            source: "synthetic".to_string(),
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}
