// Geometry engine - joint angles and left/right symmetry from body landmarks

use crate::models::analysis::{AngleMeasurement, SymmetryMeasurement};
use crate::models::pose::{BodyLandmark, Landmark, LandmarkSet};
use std::collections::BTreeMap;

/// Normal range used for every joint until per-joint clinical ranges are configured
pub const DEFAULT_NORMAL_RANGE: (f64, f64) = (160.0, 200.0);

/// A joint angle measured at `points[1]` between the rays to `points[0]` and `points[2]`
#[derive(Debug, Clone, Copy)]
pub struct JointDefinition {
    pub name: &'static str,
    pub points: [BodyLandmark; 3],
    pub normal_range: (f64, f64),
}

/// A left/right landmark pair compared for symmetry
#[derive(Debug, Clone, Copy)]
pub struct SymmetryPair {
    pub body_part: &'static str,
    pub left: BodyLandmark,
    pub right: BodyLandmark,
}

pub const JOINT_ANGLES: [JointDefinition; 8] = [
    JointDefinition {
        name: "right_shoulder",
        points: [BodyLandmark::RightElbow, BodyLandmark::RightShoulder, BodyLandmark::RightHip],
        normal_range: DEFAULT_NORMAL_RANGE,
    },
    JointDefinition {
        name: "left_shoulder",
        points: [BodyLandmark::LeftElbow, BodyLandmark::LeftShoulder, BodyLandmark::LeftHip],
        normal_range: DEFAULT_NORMAL_RANGE,
    },
    JointDefinition {
        name: "right_elbow",
        points: [BodyLandmark::RightWrist, BodyLandmark::RightElbow, BodyLandmark::RightShoulder],
        normal_range: DEFAULT_NORMAL_RANGE,
    },
    JointDefinition {
        name: "left_elbow",
        points: [BodyLandmark::LeftWrist, BodyLandmark::LeftElbow, BodyLandmark::LeftShoulder],
        normal_range: DEFAULT_NORMAL_RANGE,
    },
    JointDefinition {
        name: "right_hip",
        points: [BodyLandmark::RightShoulder, BodyLandmark::RightHip, BodyLandmark::RightKnee],
        normal_range: DEFAULT_NORMAL_RANGE,
    },
    JointDefinition {
        name: "left_hip",
        points: [BodyLandmark::LeftShoulder, BodyLandmark::LeftHip, BodyLandmark::LeftKnee],
        normal_range: DEFAULT_NORMAL_RANGE,
    },
    JointDefinition {
        name: "right_knee",
        points: [BodyLandmark::RightHip, BodyLandmark::RightKnee, BodyLandmark::RightAnkle],
        normal_range: DEFAULT_NORMAL_RANGE,
    },
    JointDefinition {
        name: "left_knee",
        points: [BodyLandmark::LeftHip, BodyLandmark::LeftKnee, BodyLandmark::LeftAnkle],
        normal_range: DEFAULT_NORMAL_RANGE,
    },
];

pub const SYMMETRY_PAIRS: [SymmetryPair; 4] = [
    SymmetryPair {
        body_part: "shoulder",
        left: BodyLandmark::LeftShoulder,
        right: BodyLandmark::RightShoulder,
    },
    SymmetryPair {
        body_part: "hip",
        left: BodyLandmark::LeftHip,
        right: BodyLandmark::RightHip,
    },
    SymmetryPair {
        body_part: "knee",
        left: BodyLandmark::LeftKnee,
        right: BodyLandmark::RightKnee,
    },
    SymmetryPair {
        body_part: "ankle",
        left: BodyLandmark::LeftAnkle,
        right: BodyLandmark::RightAnkle,
    },
];

/// Angle at vertex `b` between rays `b->a` and `b->c`, in degrees.
///
/// A zero-length ray yields 0.0. The cosine is clamped to [-1, 1] before `acos`
/// so rounding at the boundary can never produce NaN.
pub fn angle<const N: usize>(a: [f64; N], b: [f64; N], c: [f64; N]) -> f64 {
    let mut dot = 0.0;
    let mut norm_ba = 0.0;
    let mut norm_bc = 0.0;
    for i in 0..N {
        let ba = a[i] - b[i];
        let bc = c[i] - b[i];
        dot += ba * bc;
        norm_ba += ba * ba;
        norm_bc += bc * bc;
    }

    let norm_ba = norm_ba.sqrt();
    let norm_bc = norm_bc.sqrt();
    if norm_ba == 0.0 || norm_bc == 0.0 {
        return 0.0;
    }

    let cosine = (dot / (norm_ba * norm_bc)).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

/// Euclidean distance between a left and right landmark in (x, y, z); 0.0 if either is absent
pub fn symmetry(left: Option<&Landmark>, right: Option<&Landmark>) -> f64 {
    match (left, right) {
        (Some(left), Some(right)) => {
            let l = left.xyz();
            let r = right.xyz();
            l.iter()
                .zip(r.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt()
        }
        _ => 0.0,
    }
}

/// Angles for every joint whose three landmarks are present
pub fn joint_angles(keypoints: &LandmarkSet) -> BTreeMap<String, AngleMeasurement> {
    JOINT_ANGLES
        .iter()
        .filter_map(|joint| {
            let [a, b, c] = joint.points;
            let (a, b, c) = (keypoints.get(a)?, keypoints.get(b)?, keypoints.get(c)?);
            let measurement = AngleMeasurement {
                joint_name: joint.name.to_string(),
                angle_degrees: angle(a.xy(), b.xy(), c.xy()),
                normal_range: joint.normal_range,
            };
            Some((joint.name.to_string(), measurement))
        })
        .collect()
}

/// Symmetry measurement for every configured left/right pair
pub fn body_symmetry(keypoints: &LandmarkSet) -> BTreeMap<String, SymmetryMeasurement> {
    SYMMETRY_PAIRS
        .iter()
        .map(|pair| {
            let measurement = SymmetryMeasurement {
                body_part: pair.body_part.to_string(),
                asymmetry_value: symmetry(keypoints.get(pair.left), keypoints.get(pair.right)),
            };
            (pair.body_part.to_string(), measurement)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_right_angle() {
        let result = angle([0.0, 0.0], [1.0, 0.0], [1.0, 1.0]);
        assert!((result - 90.0).abs() < EPSILON, "got {}", result);
    }

    #[test]
    fn test_straight_and_folded_angles() {
        assert!((angle([0.0, 0.0], [1.0, 0.0], [2.0, 0.0]) - 180.0).abs() < EPSILON);
        assert!(angle([2.0, 0.0], [0.0, 0.0], [1.0, 0.0]).abs() < EPSILON);
    }

    #[test]
    fn test_degenerate_vertex_is_zero() {
        let p = [0.3, 0.7];
        assert_eq!(angle(p, p, [0.9, 0.1]), 0.0);
        assert_eq!(angle([0.9, 0.1], p, p), 0.0);
    }

    #[test]
    fn test_angle_in_three_dimensions() {
        let result = angle([1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        assert!((result - 90.0).abs() < EPSILON);
    }

    #[test]
    fn test_symmetry_absent_landmark_is_zero() {
        let lm = Landmark::new(0.1, 0.2, 0.3, 1.0);
        assert_eq!(symmetry(Some(&lm), None), 0.0);
        assert_eq!(symmetry(None, Some(&lm)), 0.0);
        assert_eq!(symmetry(None, None), 0.0);
    }

    #[test]
    fn test_symmetry_distance() {
        let left = Landmark::new(0.0, 0.0, 0.0, 1.0);
        let right = Landmark::new(3.0, 4.0, 0.0, 1.0);
        assert!((symmetry(Some(&left), Some(&right)) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_joint_angles_only_for_complete_triples() {
        let keypoints = LandmarkSet::new()
            .with(BodyLandmark::RightElbow, Landmark::new(0.5, 0.7, 0.0, 1.0))
            .with(BodyLandmark::RightShoulder, Landmark::new(0.5, 0.4, 0.0, 1.0))
            .with(BodyLandmark::RightHip, Landmark::new(0.5, 0.9, 0.0, 1.0));

        let angles = joint_angles(&keypoints);
        assert_eq!(angles.len(), 1);
        let shoulder = &angles["right_shoulder"];
        assert!(shoulder.angle_degrees.abs() < 1e-4);
        assert_eq!(shoulder.normal_range, DEFAULT_NORMAL_RANGE);
    }

    #[test]
    fn test_body_symmetry_reports_every_pair() {
        let keypoints = LandmarkSet::new()
            .with(BodyLandmark::LeftShoulder, Landmark::new(0.4, 0.3, 0.0, 1.0))
            .with(BodyLandmark::RightShoulder, Landmark::new(0.6, 0.3, 0.0, 1.0));

        let result = body_symmetry(&keypoints);
        assert_eq!(result.len(), SYMMETRY_PAIRS.len());
        assert!((result["shoulder"].asymmetry_value - 0.2).abs() < 1e-6);
        assert_eq!(result["hip"].asymmetry_value, 0.0);
    }

    fn landmark_strategy() -> impl Strategy<Value = Landmark> {
        (0.0f32..1.0, 0.0f32..1.0, -1.0f32..1.0, 0.0f32..=1.0)
            .prop_map(|(x, y, z, v)| Landmark::new(x, y, z, v))
    }

    proptest! {
        #[test]
        fn prop_angle_within_range(
            a in prop::array::uniform2(-10.0f64..10.0),
            b in prop::array::uniform2(-10.0f64..10.0),
            c in prop::array::uniform2(-10.0f64..10.0),
        ) {
            let result = angle(a, b, c);
            prop_assert!(result.is_finite());
            prop_assert!(result >= 0.0 && result <= 180.0 + 1e-9, "angle {} out of range", result);
        }

        #[test]
        fn prop_symmetry_commutes(left in landmark_strategy(), right in landmark_strategy()) {
            prop_assert_eq!(symmetry(Some(&left), Some(&right)), symmetry(Some(&right), Some(&left)));
        }
    }
}
