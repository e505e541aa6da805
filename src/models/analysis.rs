// Per-frame posture analysis results and the stream message pushed to clients

use crate::models::pose::LandmarkSet;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Margin around a joint's normal range inside which an angle is a caution, not an anomaly
pub const CAUTION_MARGIN_DEGREES: f64 = 20.0;

// ==============================================================================
// Measurements
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Caution,
    Anomalous,
}

impl Severity {
    /// Classify an angle against a normal range.
    ///
    /// The caution band contains the normal band, so the tightest band is tested first:
    /// strictly inside `(min, max)` is normal, strictly inside
    /// `(min - margin, max + margin)` is caution, anything else is anomalous.
    pub fn classify(angle_degrees: f64, normal_range: (f64, f64)) -> Self {
        let (min, max) = normal_range;
        if min < angle_degrees && angle_degrees < max {
            Severity::Normal
        } else if min - CAUTION_MARGIN_DEGREES < angle_degrees
            && angle_degrees < max + CAUTION_MARGIN_DEGREES
        {
            Severity::Caution
        } else {
            Severity::Anomalous
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleMeasurement {
    pub joint_name: String,
    pub angle_degrees: f64,
    pub normal_range: (f64, f64),
}

impl AngleMeasurement {
    pub fn severity(&self) -> Severity {
        Severity::classify(self.angle_degrees, self.normal_range)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetryMeasurement {
    pub body_part: String,
    pub asymmetry_value: f64,
}

// ==============================================================================
// Frame Analysis
// ==============================================================================

/// Posture metrics for a single frame. Constructed and discarded per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    pub keypoints: LandmarkSet,
    pub angles: BTreeMap<String, AngleMeasurement>,
    pub symmetry: BTreeMap<String, SymmetryMeasurement>,
    pub quality: f32,
    pub timestamp: DateTime<Utc>,
}

/// A processed frame ready to be pushed to the transport
#[derive(Debug, Clone)]
pub struct StreamMessage {
    pub frame: Vec<u8>,
    pub analysis: Option<FrameAnalysis>,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
}

impl StreamMessage {
    /// Serialize to the JSON wire schema
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&StreamMessageDto::from(self))
    }
}

pub fn iso_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ==============================================================================
// DTOs (wire schema)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDto {
    pub keypoints: LandmarkSet,
    pub angles: BTreeMap<String, f64>,
    pub symmetry: BTreeMap<String, f64>,
    pub frame_quality: f32,
    pub timestamp: String,
}

impl From<&FrameAnalysis> for AnalysisDto {
    fn from(analysis: &FrameAnalysis) -> Self {
        Self {
            keypoints: analysis.keypoints.clone(),
            angles: analysis
                .angles
                .iter()
                .map(|(name, m)| (name.clone(), m.angle_degrees))
                .collect(),
            symmetry: analysis
                .symmetry
                .iter()
                .map(|(part, m)| (part.clone(), m.asymmetry_value))
                .collect(),
            frame_quality: analysis.quality,
            timestamp: iso_timestamp(&analysis.timestamp),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessageDto {
    pub frame: String, // hex-encoded JPEG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisDto>,
    pub timestamp: String,
    pub session_id: String,
}

impl From<&StreamMessage> for StreamMessageDto {
    fn from(message: &StreamMessage) -> Self {
        Self {
            frame: crate::core::frame_encoder::hex_encode(&message.frame),
            analysis: message.analysis.as_ref().map(AnalysisDto::from),
            timestamp: iso_timestamp(&message.timestamp),
            session_id: message.session_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::{BodyLandmark, Landmark};

    #[test]
    fn test_severity_tightest_band_wins() {
        let range = (160.0, 200.0);
        assert_eq!(Severity::classify(170.0, range), Severity::Normal);
        assert_eq!(Severity::classify(150.0, range), Severity::Caution);
        assert_eq!(Severity::classify(160.0, range), Severity::Caution);
        assert_eq!(Severity::classify(140.0, range), Severity::Anomalous);
        assert_eq!(Severity::classify(90.0, range), Severity::Anomalous);
    }

    #[test]
    fn test_message_without_analysis_omits_field() {
        let message = StreamMessage {
            frame: vec![0xff, 0xd8, 0x0a],
            analysis: None,
            timestamp: Utc::now(),
            session_id: "visit-1".to_string(),
        };

        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(json["frame"], "ffd80a");
        assert_eq!(json["session_id"], "visit-1");
        assert!(json.get("analysis").is_none());
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_message_with_analysis_matches_wire_schema() {
        let mut angles = BTreeMap::new();
        angles.insert(
            "right_elbow".to_string(),
            AngleMeasurement {
                joint_name: "right_elbow".to_string(),
                angle_degrees: 90.0,
                normal_range: (160.0, 200.0),
            },
        );
        let mut symmetry = BTreeMap::new();
        symmetry.insert(
            "shoulder".to_string(),
            SymmetryMeasurement {
                body_part: "shoulder".to_string(),
                asymmetry_value: 0.5,
            },
        );
        let analysis = FrameAnalysis {
            keypoints: LandmarkSet::new().with(BodyLandmark::Nose, Landmark::new(0.5, 0.25, 0.0, 1.0)),
            angles,
            symmetry,
            quality: 1.0,
            timestamp: Utc::now(),
        };
        let message = StreamMessage {
            frame: vec![],
            analysis: Some(analysis),
            timestamp: Utc::now(),
            session_id: "visit-2".to_string(),
        };

        let json: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        let analysis = &json["analysis"];
        assert_eq!(analysis["angles"]["right_elbow"], 90.0);
        assert_eq!(analysis["symmetry"]["shoulder"], 0.5);
        assert_eq!(analysis["frame_quality"], 1.0);
        assert_eq!(analysis["keypoints"]["NOSE"]["y"], 0.25);
        assert!(analysis["timestamp"].is_string());
    }
}
