// Publish loop - per-session acquisition, inference, analysis, encoding and push at a fixed cadence

use crate::core::config::StreamConfig;
use crate::core::frame_analyzer::FrameAnalyzer;
use crate::core::frame_encoder::{self, EncodeResult};
use crate::models::analysis::{FrameAnalysis, StreamMessage};
use crate::models::capture::ColorFrame;
use crate::models::pose::{DetectionBox, LandmarkSet, PoseError, PoseResult};
use crate::platform::capture::FrameSource;
use crate::platform::pose::InferenceBridge;
use crate::platform::transport::StreamTransport;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinError;
use tokio::time::Instant;

// ==============================================================================
// States and Reports
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Connected,
    Streaming,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Cancellation was requested by the session owner
    Cancelled,
    /// The client went away or a push failed
    TransportFailed(String),
}

/// Counters reported when a session ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub frames_published: u64,
    /// Frames dropped because they could not be safely redacted or encoded
    pub frames_withheld: u64,
    /// Frames without a pose that were not published
    pub frames_skipped: u64,
    pub ticks_without_frame: u64,
    pub close_reason: CloseReason,
}

/// What happened to one acquired frame
#[derive(Debug)]
enum FrameOutcome {
    Publish(StreamMessage),
    Skip,
    Withhold(String),
}

/// Result of the analysis worker, after failure policy is applied
#[derive(Debug)]
pub(crate) enum RenderOutcome {
    Rendered {
        analysis: Option<FrameAnalysis>,
        jpeg: Vec<u8>,
    },
    /// The worker failed and no faces were present; publish the raw frame
    PassThrough,
    Withhold(String),
}

/// Collaborators a publish loop needs
pub struct LoopDependencies {
    pub source: Arc<dyn FrameSource>,
    pub bridge: Arc<dyn InferenceBridge>,
    pub analyzer: Arc<FrameAnalyzer>,
    pub settings: StreamConfig,
}

// ==============================================================================
// Publish Loop
// ==============================================================================

pub struct PublishLoop {
    session_id: String,
    deps: LoopDependencies,
    transport: Box<dyn StreamTransport>,
    cancel: watch::Receiver<bool>,
    state: watch::Sender<LoopState>,
    /// One in-flight call per model per session; a call that overran its deadline holds its slot
    pose_slot: Arc<Semaphore>,
    face_slot: Arc<Semaphore>,
    frames_published: u64,
    frames_withheld: u64,
    frames_skipped: u64,
    ticks_without_frame: u64,
}

impl PublishLoop {
    pub fn new(
        session_id: String,
        deps: LoopDependencies,
        transport: Box<dyn StreamTransport>,
        cancel: watch::Receiver<bool>,
        state: watch::Sender<LoopState>,
    ) -> Self {
        state.send_replace(LoopState::Connected);
        Self {
            session_id,
            deps,
            transport,
            cancel,
            state,
            pose_slot: Arc::new(Semaphore::new(1)),
            face_slot: Arc::new(Semaphore::new(1)),
            frames_published: 0,
            frames_withheld: 0,
            frames_skipped: 0,
            ticks_without_frame: 0,
        }
    }

    /// Stream until cancelled or the transport fails, then close the transport once
    pub async fn run(mut self) -> SessionReport {
        self.state.send_replace(LoopState::Streaming);
        tracing::info!(
            "Streaming session {} at {} fps",
            self.session_id,
            self.deps.settings.target_fps
        );

        let reason = self.stream().await;
        self.close(reason).await
    }

    async fn stream(&mut self) -> CloseReason {
        let tick = self.deps.settings.tick_interval();
        let warn_ticks = self.deps.settings.frame_wait_warn_ticks as u64;
        let mut consecutive_misses: u64 = 0;

        loop {
            if *self.cancel.borrow() {
                return CloseReason::Cancelled;
            }
            let tick_started = Instant::now();

            let pair = tokio::select! {
                pair = self.deps.source.get_frames() => pair,
                _ = cancelled(&mut self.cancel) => return CloseReason::Cancelled,
            };

            let color = match pair.color {
                Some(color) => color,
                None => {
                    self.ticks_without_frame += 1;
                    consecutive_misses += 1;
                    if warn_ticks > 0 && consecutive_misses % warn_ticks == 0 {
                        tracing::warn!(
                            "Session {}: no camera frame for {} consecutive ticks",
                            self.session_id,
                            consecutive_misses
                        );
                    }
                    if self.sleep_or_cancel(tick).await {
                        return CloseReason::Cancelled;
                    }
                    continue;
                }
            };
            consecutive_misses = 0;

            match self.process_frame(color).await {
                FrameOutcome::Publish(message) => match message.to_json() {
                    Ok(text) => {
                        // A consumer that stops draining must not block cancellation
                        let pushed = tokio::select! {
                            pushed = self.transport.send_text(text) => pushed,
                            _ = cancelled(&mut self.cancel) => return CloseReason::Cancelled,
                        };
                        if let Err(e) = pushed {
                            tracing::error!("Session {}: push failed: {}", self.session_id, e);
                            return CloseReason::TransportFailed(e.to_string());
                        }
                        self.frames_published += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Session {}: message serialization failed: {}", self.session_id, e);
                        self.frames_withheld += 1;
                    }
                },
                FrameOutcome::Skip => self.frames_skipped += 1,
                FrameOutcome::Withhold(reason) => {
                    tracing::warn!("Session {}: frame withheld: {}", self.session_id, reason);
                    self.frames_withheld += 1;
                }
            }

            let elapsed = tick_started.elapsed();
            tracing::debug!("Session {}: tick took {:?}", self.session_id, elapsed);
            let remaining = tick.saturating_sub(elapsed);
            if !remaining.is_zero() && self.sleep_or_cancel(remaining).await {
                return CloseReason::Cancelled;
            }
        }
    }

    /// Inference, analysis and encoding for one acquired frame
    async fn process_frame(&self, color: ColorFrame) -> FrameOutcome {
        let image = match frame_encoder::to_rgb_image(color) {
            Ok(image) => Arc::new(image),
            Err(e) => return FrameOutcome::Withhold(e.to_string()),
        };

        let timeout = self.deps.settings.inference_timeout();
        let pose_task = {
            let bridge = self.deps.bridge.clone();
            let image = image.clone();
            run_inference(&self.pose_slot, timeout, move || bridge.detect_pose(&image))
        };
        let face_task = {
            let bridge = self.deps.bridge.clone();
            let image = image.clone();
            run_inference(&self.face_slot, timeout, move || bridge.detect_faces(&image))
        };
        let (pose, faces) = tokio::join!(pose_task, face_task);

        let keypoints: Option<LandmarkSet> = match pose {
            Ok(keypoints) => keypoints,
            Err(e) => {
                tracing::debug!("Session {}: pose unavailable: {}", self.session_id, e);
                None
            }
        };

        // Decided before any rendering work is queued
        if keypoints.is_none() && !self.deps.settings.publish_frames_without_pose {
            return FrameOutcome::Skip;
        }

        // A frame whose faces could not be located is never published
        let faces: Vec<DetectionBox> = match faces {
            Ok(faces) => faces,
            Err(e) => return FrameOutcome::Withhold(format!("face detection unavailable: {}", e)),
        };

        let quality = self.deps.settings.jpeg_quality;
        let faces_detected = !faces.is_empty();
        let worker = {
            let analyzer = self.deps.analyzer.clone();
            let image = image.clone();
            tokio::task::spawn_blocking(move || {
                let (analysis, rendered) = analyzer.analyze(&image, keypoints.as_ref(), &faces);
                frame_encoder::encode_jpeg(&rendered, quality).map(|jpeg| (analysis, jpeg))
            })
            .await
        };

        let (analysis, jpeg) = match resolve_render(worker, faces_detected) {
            RenderOutcome::Rendered { analysis, jpeg } => (analysis, jpeg),
            RenderOutcome::PassThrough => {
                let image = image.clone();
                match tokio::task::spawn_blocking(move || frame_encoder::encode_jpeg(&image, quality)).await {
                    Ok(Ok(jpeg)) => (None, jpeg),
                    Ok(Err(e)) => return FrameOutcome::Withhold(e.to_string()),
                    Err(e) => return FrameOutcome::Withhold(format!("encoder worker failed: {}", e)),
                }
            }
            RenderOutcome::Withhold(reason) => return FrameOutcome::Withhold(reason),
        };

        FrameOutcome::Publish(StreamMessage {
            frame: jpeg,
            analysis,
            timestamp: Utc::now(),
            session_id: self.session_id.clone(),
        })
    }

    /// Sleep for `duration`; true if cancellation arrived first
    async fn sleep_or_cancel(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = cancelled(&mut self.cancel) => true,
        }
    }

    async fn close(mut self, reason: CloseReason) -> SessionReport {
        self.state.send_replace(LoopState::Closed);
        if let Err(e) = self.transport.close().await {
            tracing::debug!("Session {}: transport close: {}", self.session_id, e);
        }

        let report = SessionReport {
            session_id: self.session_id,
            frames_published: self.frames_published,
            frames_withheld: self.frames_withheld,
            frames_skipped: self.frames_skipped,
            ticks_without_frame: self.ticks_without_frame,
            close_reason: reason,
        };
        tracing::info!(
            "Session {} closed ({:?}): {} published, {} withheld",
            report.session_id,
            report.close_reason,
            report.frames_published,
            report.frames_withheld
        );
        report
    }
}

/// Resolves once cancellation is requested or every cancel handle is dropped
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Run a model call on the blocking pool under a deadline.
/// A call that overruns keeps running in the background and keeps `slot`
/// until it returns, so no new call starts while it is stuck.
async fn run_inference<T, F>(slot: &Arc<Semaphore>, timeout: Duration, call: F) -> PoseResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> PoseResult<T> + Send + 'static,
{
    let permit = slot.clone().try_acquire_owned().map_err(|_| PoseError::Busy)?;
    let worker = tokio::task::spawn_blocking(move || {
        let result = call();
        drop(permit);
        result
    });

    match tokio::time::timeout(timeout, worker).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(PoseError::InferenceFailed(format!("inference worker failed: {}", e))),
        Err(_) => Err(PoseError::Timeout(timeout.as_millis() as u64)),
    }
}

/// Failure policy for the analysis worker: a crashed worker may only pass the
/// raw frame through when there was nothing to redact.
pub(crate) fn resolve_render(
    worker: Result<EncodeResult<(Option<FrameAnalysis>, Vec<u8>)>, JoinError>,
    faces_detected: bool,
) -> RenderOutcome {
    match worker {
        Ok(Ok((analysis, jpeg))) => RenderOutcome::Rendered { analysis, jpeg },
        Ok(Err(e)) => RenderOutcome::Withhold(e.to_string()),
        Err(e) if faces_detected => RenderOutcome::Withhold(format!("analysis worker failed: {}", e)),
        Err(e) => {
            tracing::warn!("Analysis worker failed, passing frame through: {}", e);
            RenderOutcome::PassThrough
        }
    }
}
