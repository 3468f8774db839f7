use image::RgbaImage;

use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: u32,
    /// Number of frames the caller intends to push.
    pub num_frames: u64,
}

impl SinkConfig {
    /// Frame dimensions as a [`Canvas`].
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// `begin` is called once, then `push_frame` in strictly increasing [`FrameIndex`] order, then
/// `end` exactly once. `end` is also called after a failed `push_frame`, so implementations must
/// tolerate finalizing a partial stream.
pub trait FrameSink: Send {
    /// Open the output. Failures here mean nothing was written.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame; its dimensions must match the configured size.
    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> ReelResult<()>;
    /// Flush and close the output.
    fn end(&mut self) -> ReelResult<()>;
}

/// In-memory sink for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, RgbaImage)>,
    finished: bool,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured frames in timeline order.
    pub fn frames(&self) -> &[(FrameIndex, RgbaImage)] {
        &self.frames
    }

    /// Whether `end` has been called since the last `begin`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::validation("in-memory sink not started"))?;
        if self.finished {
            return Err(ReelError::validation("in-memory sink is already finalized"));
        }
        if let Some((last, _)) = self.frames.last()
            && idx <= *last
        {
            return Err(ReelError::validation("in-memory sink received out-of-order frame"));
        }
        check_frame_size(cfg, frame)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.finished = true;
        Ok(())
    }
}

pub(crate) fn check_frame_size(cfg: &SinkConfig, frame: &RgbaImage) -> ReelResult<()> {
    if frame.width() != cfg.width || frame.height() != cfg.height {
        return Err(ReelError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width(),
            frame.height(),
            cfg.width,
            cfg.height
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
