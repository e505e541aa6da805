// Frame quality scoring from landmark visibility

use crate::models::pose::LandmarkSet;

/// Mean visibility across all landmarks in the set; 0.0 for an empty set
pub fn quality(keypoints: &LandmarkSet) -> f32 {
    if keypoints.is_empty() {
        return 0.0;
    }

    let total: f32 = keypoints.iter().map(|(_, lm)| lm.visibility).sum();
    total / keypoints.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::{BodyLandmark, Landmark};

    #[test]
    fn test_empty_set_scores_zero() {
        assert_eq!(quality(&LandmarkSet::new()), 0.0);
    }

    #[test]
    fn test_mean_visibility() {
        let keypoints = LandmarkSet::new()
            .with(BodyLandmark::Nose, Landmark::new(0.5, 0.5, 0.0, 1.0))
            .with(BodyLandmark::LeftShoulder, Landmark::new(0.4, 0.6, 0.0, 0.5))
            .with(BodyLandmark::RightShoulder, Landmark::new(0.6, 0.6, 0.0, 0.0));

        assert!((quality(&keypoints) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_full_schema_fully_visible() {
        let output = vec![Landmark::new(0.5, 0.5, 0.0, 1.0); BodyLandmark::COUNT];
        let keypoints = LandmarkSet::from_model_output(output);
        assert_eq!(quality(&keypoints), 1.0);
    }
}
