pub mod config;
pub mod logging;

// Per-frame analysis
pub mod geometry;
pub mod frame_quality;
pub mod privacy_redactor;
pub mod glyphs;
pub mod overlay_renderer;
pub mod frame_analyzer;
pub mod frame_encoder;

// Streaming sessions
pub mod publish_loop;
pub mod session;
