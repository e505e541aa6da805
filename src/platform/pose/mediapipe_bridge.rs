// MediaPipe integration bridge
// Abstraction over the external pose-landmark and face-detection models.
// A real backend (ONNX Runtime, a Python sidecar, ...) implements InferenceBridge.

use crate::models::pose::{DetectionBox, LandmarkSet, PoseConfig, PoseError, PoseResult};
use image::RgbImage;

/// Inference bridge trait
///
/// Calls are synchronous and may be slow; the publish loop runs them on a
/// blocking worker under a timeout, so implementations only need to be
/// `Send + Sync`.
pub trait InferenceBridge: Send + Sync {
    /// Initialize the models
    fn new(config: &PoseConfig) -> PoseResult<Self>
    where
        Self: Sized;

    /// Body landmarks for the most prominent person, or `None` when no body is visible
    fn detect_pose(&self, image: &RgbImage) -> PoseResult<Option<LandmarkSet>>;

    /// Face boxes, normalized to the image dimensions
    fn detect_faces(&self, image: &RgbImage) -> PoseResult<Vec<DetectionBox>>;

    /// Check if models are loaded
    fn is_initialized(&self) -> bool;

    /// Get model info
    fn model_info(&self) -> String;
}

/// Reject configurations no model backend could honour
pub fn validate_config(config: &PoseConfig) -> PoseResult<()> {
    let thresholds = [
        ("min_detection_confidence", config.min_detection_confidence),
        ("min_tracking_confidence", config.min_tracking_confidence),
        ("face_min_detection_confidence", config.face_min_detection_confidence),
    ];
    for (name, value) in thresholds {
        if !(0.0..=1.0).contains(&value) {
            return Err(PoseError::InvalidConfig(format!(
                "{} must be between 0.0 and 1.0, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

// ==============================================================================
// Dummy Implementation (no models linked)
// ==============================================================================

/// Placeholder backend: never reports a body or a face
pub struct DummyMediaPipe {
    config: PoseConfig,
}

impl InferenceBridge for DummyMediaPipe {
    fn new(config: &PoseConfig) -> PoseResult<Self> {
        validate_config(config)?;
        tracing::warn!("Using dummy MediaPipe implementation (no inference)");
        Ok(Self {
            config: config.clone(),
        })
    }

    fn detect_pose(&self, _image: &RgbImage) -> PoseResult<Option<LandmarkSet>> {
        Ok(None)
    }

    fn detect_faces(&self, _image: &RgbImage) -> PoseResult<Vec<DetectionBox>> {
        Ok(vec![])
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn model_info(&self) -> String {
        format!(
            "Dummy MediaPipe (no ML inference, complexity {:?})",
            self.config.model_complexity
        )
    }
}

// ==============================================================================
// Default Backend Selection
// ==============================================================================

pub type DefaultMediaPipe = DummyMediaPipe;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_reports_nothing() {
        let bridge = DefaultMediaPipe::new(&PoseConfig::default()).unwrap();
        let image = RgbImage::new(8, 8);

        assert!(bridge.detect_pose(&image).unwrap().is_none());
        assert!(bridge.detect_faces(&image).unwrap().is_empty());
        assert!(!bridge.is_initialized());
        assert!(bridge.model_info().contains("Dummy"));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = PoseConfig {
            face_min_detection_confidence: 1.5,
            ..PoseConfig::default()
        };
        assert!(matches!(
            DummyMediaPipe::new(&config),
            Err(PoseError::InvalidConfig(_))
        ));
    }
}
