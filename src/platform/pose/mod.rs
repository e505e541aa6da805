// Pose estimation platform integration
// Provides the inference bridge contract and the placeholder backend

pub mod mediapipe_bridge;

pub use mediapipe_bridge::{DefaultMediaPipe, DummyMediaPipe, InferenceBridge};
