//! Encoding sinks.
//!
//! Sinks consume rendered frames in timeline order and are driven by
//! [`render_to_sink`](crate::render_to_sink).

/// `ffmpeg`-based sink (video output via the system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
