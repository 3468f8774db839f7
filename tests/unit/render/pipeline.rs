use std::path::PathBuf;

use image::Rgba;

use super::*;
use crate::encode::sink::InMemorySink;

fn checker(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Rgba([240, 240, 240, 255])
        } else {
            Rgba([20, 40, 60, 255])
        }
    })
}

/// Sink that fails on a chosen frame and records how it was driven.
#[derive(Default)]
struct FailingSink {
    fail_at: u64,
    fail_end: bool,
    begun: u32,
    pushed: u64,
    ended: u32,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> ReelResult<()> {
        self.begun += 1;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &RgbaImage) -> ReelResult<()> {
        if idx.0 == self.fail_at {
            return Err(ReelError::frame_write("partial.mp4", idx.0, "Broken pipe"));
        }
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.ended += 1;
        if self.fail_end {
            return Err(ReelError::encode(
                "partial.mp4",
                "ffmpeg exited with status 1: Invalid argument",
            ));
        }
        Ok(())
    }
}

struct RefusingSink {
    ended: bool,
}

impl FrameSink for RefusingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> ReelResult<()> {
        Err(ReelError::output_open("nowhere.mp4", "refused"))
    }

    fn push_frame(&mut self, _idx: FrameIndex, _frame: &RgbaImage) -> ReelResult<()> {
        panic!("push_frame after failed begin");
    }

    fn end(&mut self) -> ReelResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[test]
fn render_to_sink_pushes_every_frame_at_source_size() {
    let src = checker(64, 48);
    let params = ZoomParams {
        duration_sec: 1.0,
        fps: 12,
        zoom_factor: 1.5,
    };
    let mut sink = InMemorySink::new();
    let stats = render_to_sink(&src, &params, &mut sink).unwrap();

    assert_eq!(stats.frames_written, 12);
    assert_eq!(stats.canvas, Canvas { width: 64, height: 48 });
    assert!(sink.is_finished());

    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height, cfg.fps, cfg.num_frames), (64, 48, 12, 12));

    let frames = sink.frames();
    assert_eq!(frames.len(), 12);
    for (i, (idx, frame)) in frames.iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        assert_eq!(frame.dimensions(), (64, 48));
    }
    // No zoom yet on the first frame.
    assert_eq!(frames[0].1, src);
    // The last frame has a black border.
    assert_eq!(frames[11].1.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
}

#[test]
fn render_to_sink_matches_single_frame_preview() {
    let src = checker(40, 30);
    let params = ZoomParams {
        duration_sec: 0.5,
        fps: 10,
        zoom_factor: 1.8,
    };
    let mut sink = InMemorySink::new();
    render_to_sink(&src, &params, &mut sink).unwrap();

    let preview = render_frame(&src, &params, FrameIndex(3)).unwrap();
    assert_eq!(sink.frames()[3].1, preview);
    assert!(render_frame(&src, &params, FrameIndex(5)).is_err());
}

#[test]
fn mid_stream_failure_still_finalizes_once() {
    let src = checker(16, 16);
    let params = ZoomParams {
        duration_sec: 1.0,
        fps: 10,
        zoom_factor: 2.0,
    };
    let mut sink = FailingSink {
        fail_at: 4,
        ..FailingSink::default()
    };

    let err = render_to_sink(&src, &params, &mut sink).unwrap_err();
    assert!(matches!(err, ReelError::FrameWrite { frame: 4, .. }));
    assert!(!err.to_string().contains("finalizing"));
    assert_eq!(sink.begun, 1);
    assert_eq!(sink.pushed, 4);
    assert_eq!(sink.ended, 1);
}

#[test]
fn failed_finalize_after_failed_push_reports_both() {
    let src = checker(16, 16);
    let params = ZoomParams {
        duration_sec: 1.0,
        fps: 10,
        zoom_factor: 2.0,
    };
    let mut sink = FailingSink {
        fail_at: 2,
        fail_end: true,
        ..FailingSink::default()
    };

    let err = render_to_sink(&src, &params, &mut sink).unwrap_err();
    match &err {
        ReelError::FrameWrite { path, frame, .. } => {
            assert_eq!(path, &PathBuf::from("partial.mp4"));
            assert_eq!(*frame, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("'partial.mp4'"), "{msg}");
    assert!(msg.contains("Broken pipe"), "{msg}");
    assert!(msg.contains("ffmpeg exited with status 1: Invalid argument"), "{msg}");
    assert_eq!(sink.ended, 1);
}

#[test]
fn failed_begin_pushes_nothing_and_skips_end() {
    let src = checker(8, 8);
    let mut sink = RefusingSink { ended: false };
    let err = render_to_sink(&src, &ZoomParams::default(), &mut sink).unwrap_err();
    assert!(matches!(err, ReelError::OutputOpen { .. }));
    assert!(!sink.ended);
}

#[test]
fn invalid_params_fail_before_begin() {
    let src = checker(8, 8);
    let mut sink = InMemorySink::new();
    let params = ZoomParams {
        duration_sec: 0.01,
        fps: 30,
        zoom_factor: 1.05,
    };
    assert!(matches!(
        render_to_sink(&src, &params, &mut sink),
        Err(ReelError::Validation(_))
    ));
    assert!(sink.config().is_none());
}

#[test]
fn generate_with_missing_input_does_not_touch_output() {
    let dir = PathBuf::from("target").join("unit_pipeline");
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("never_created.mp4");
    let _ = std::fs::remove_file(&out);

    let err = generate(
        &dir.join("no_such_image.png"),
        &out,
        &ZoomParams::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::ImageLoad { .. }));
    assert!(!out.exists());
}
