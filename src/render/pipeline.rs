use std::path::Path;
use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::{
    assets::decode::load_source_image,
    effects::zoom::{ZoomParams, ZoomPlan},
    encode::{
        ffmpeg::{FfmpegSink, FfmpegSinkOpts},
        sink::{FrameSink, SinkConfig},
    },
    foundation::{
        core::{Canvas, FrameIndex},
        error::{ReelError, ReelResult},
    },
};

/// Summary of a finished render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderStats {
    /// Frame dimensions (equal to the source image).
    pub canvas: Canvas,
    /// Frames pushed to the sink.
    pub frames_written: u64,
    /// Wall-clock time spent rendering and encoding.
    pub elapsed: Duration,
}

/// Render a single zoom frame without opening any output.
///
/// Useful for previews; produces exactly the pixels [`render_to_sink`] would push for `frame`.
pub fn render_frame(
    source: &RgbaImage,
    params: &ZoomParams,
    frame: FrameIndex,
) -> ReelResult<RgbaImage> {
    let plan = ZoomPlan::new(source_canvas(source)?, params)?;
    let geom = plan.geometry(frame)?;
    plan.render_frame(source, &geom)
}

/// Render every frame of the zoom into `sink`.
///
/// Once `sink.begin` succeeds, `sink.end` is called exactly once whether or not every frame made
/// it through. On a mid-stream failure the first error is returned and the partial output is
/// left finalized; if finalizing fails too, its message is appended to that error.
#[tracing::instrument(skip(source, sink), fields(width = source.width(), height = source.height()))]
pub fn render_to_sink(
    source: &RgbaImage,
    params: &ZoomParams,
    sink: &mut dyn FrameSink,
) -> ReelResult<RenderStats> {
    let started = Instant::now();
    let plan = ZoomPlan::new(source_canvas(source)?, params)?;
    let canvas = plan.canvas();

    sink.begin(SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps: params.fps,
        num_frames: plan.num_frames(),
    })?;

    let pushed = push_frames(source, &plan, sink);
    let ended = sink.end();

    let frames_written = match (pushed, ended) {
        (Ok(n), Ok(())) => n,
        (Ok(_), Err(e)) => return Err(e),
        (Err(e), Ok(())) => return Err(e),
        (Err(e), Err(end_err)) => {
            tracing::warn!(error = %end_err, "finalizing output after failure also failed");
            return Err(e.with_finalize_error(&end_err));
        }
    };

    let stats = RenderStats {
        canvas,
        frames_written,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        frames = stats.frames_written,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "render finished"
    );
    Ok(stats)
}

fn push_frames(source: &RgbaImage, plan: &ZoomPlan, sink: &mut dyn FrameSink) -> ReelResult<u64> {
    let total = plan.num_frames();
    let report_every = (total / 10).max(1);
    let mut written = 0u64;

    for geom in plan.frames() {
        tracing::debug!(
            frame = geom.index.0,
            scale = geom.scale,
            crop_w = geom.crop_width,
            crop_h = geom.crop_height,
            "frame geometry"
        );
        let frame = plan.render_frame(source, &geom)?;
        sink.push_frame(geom.index, &frame)?;
        written += 1;

        if written % report_every == 0 || written == total {
            tracing::info!(done = written, total, "rendering");
        }
    }

    Ok(written)
}

/// Generate a zoom video from the image at `input` into `output` using default sink options
/// (`mp4v`, overwrite).
pub fn generate(input: &Path, output: &Path, params: &ZoomParams) -> ReelResult<RenderStats> {
    generate_with_opts(input, params, FfmpegSinkOpts::new(output))
}

/// Generate a zoom video with explicit [`FfmpegSinkOpts`].
///
/// Parameters are validated first and the image is decoded before the output is touched, so a
/// bad input never creates or truncates the output file.
#[tracing::instrument(skip(params, opts), fields(out = %opts.out_path.display()))]
pub fn generate_with_opts(
    input: &Path,
    params: &ZoomParams,
    opts: FfmpegSinkOpts,
) -> ReelResult<RenderStats> {
    params.validate()?;
    let source = load_source_image(input)?;

    tracing::info!(
        width = source.width(),
        height = source.height(),
        frames = params.num_frames(),
        fps = params.fps,
        zoom = params.zoom_factor,
        codec = opts.codec.fourcc(),
        "starting zoom render"
    );

    let mut sink = FfmpegSink::new(opts);
    render_to_sink(&source, params, &mut sink)
}

fn source_canvas(source: &RgbaImage) -> ReelResult<Canvas> {
    Canvas::new(source.width(), source.height())
        .map_err(|e| ReelError::validation(format!("source image: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
