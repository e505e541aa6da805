// Frame analyzer - metrics, redaction and overlay for a single frame

use crate::core::{frame_quality, geometry, overlay_renderer, privacy_redactor};
use crate::models::analysis::FrameAnalysis;
use crate::models::pose::{DetectionBox, LandmarkSet};
use chrono::Utc;
use image::RgbImage;

/// Stateless per-frame pipeline: geometry, quality, face redaction and overlay.
///
/// Redaction runs whenever faces were detected, independent of pose. The
/// overlay is drawn on top of the redacted image only when landmarks exist.
#[derive(Debug, Clone, Default)]
pub struct FrameAnalyzer;

impl FrameAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        image: &RgbImage,
        keypoints: Option<&LandmarkSet>,
        faces: &[DetectionBox],
    ) -> (Option<FrameAnalysis>, RgbImage) {
        let redacted = privacy_redactor::redact_faces(image, faces);

        let keypoints = match keypoints {
            Some(keypoints) => keypoints,
            None => return (None, redacted),
        };

        let analysis = FrameAnalysis {
            keypoints: keypoints.clone(),
            angles: geometry::joint_angles(keypoints),
            symmetry: geometry::body_symmetry(keypoints),
            quality: frame_quality::quality(keypoints),
            timestamp: Utc::now(),
        };

        let rendered = overlay_renderer::render_overlay(&redacted, Some(keypoints), &analysis.angles);
        (Some(analysis), rendered)
    }
}
