// Data models for frames, landmarks, posture analysis and stream messages

pub mod analysis;
pub mod capture;
pub mod pose;
