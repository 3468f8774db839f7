//! zoomreel turns a single still image into a fixed-length video with a smooth zoom-in.
//!
//! # Pipeline overview
//!
//! 1. **Load**: decode the source image into straight RGBA8 ([`load_source_image`])
//! 2. **Plan**: derive per-frame scale and crop geometry from [`ZoomParams`] ([`ZoomPlan`])
//! 3. **Render**: shrink the whole image, pad it with black, resample back to the source size
//! 4. **Encode**: stream frames in order into a [`FrameSink`]; [`FfmpegSink`] pipes them to the
//!    system `ffmpeg` binary
//!
//! Scale grows linearly from `1.0` on the first frame to `zoom_factor` on the last one. Every
//! frame has exactly the source image's dimensions.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let stats = zoomreel::generate(
//!     Path::new("image.jpg"),
//!     Path::new("output_video.mp4"),
//!     &zoomreel::ZoomParams::default(),
//! )?;
//! println!("wrote {} frames", stats.frames_written);
//! # Ok::<(), zoomreel::ReelError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod effects;
mod encode;
mod foundation;
mod render;

pub use assets::decode::{decode_image, load_source_image};
pub use effects::zoom::{FrameGeometry, ZoomParams, ZoomPlan};
pub use encode::ffmpeg::{
    FfmpegSink, FfmpegSinkOpts, VideoCodec, ensure_parent_dir, is_encoder_available,
    is_ffmpeg_on_path,
};
pub use encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use foundation::core::{Canvas, FrameIndex, frames_for_duration};
pub use foundation::error::{ReelError, ReelResult};
pub use render::pipeline::{
    RenderStats, generate, generate_with_opts, render_frame, render_to_sink,
};
