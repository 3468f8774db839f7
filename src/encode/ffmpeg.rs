use std::fs::OpenOptions;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use image::RgbaImage;

use crate::encode::sink::{FrameSink, SinkConfig, check_frame_size};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};

/// Video compression format written by [`FfmpegSink`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// MPEG-4 Part 2 tagged `mp4v`.
    #[default]
    Mp4v,
    /// H.264 via libx264, tagged `avc1`.
    H264,
}

impl VideoCodec {
    /// Four-character code identifying the format in the container.
    pub fn fourcc(self) -> &'static str {
        match self {
            Self::Mp4v => "mp4v",
            Self::H264 => "avc1",
        }
    }

    /// Name of the ffmpeg encoder backing this codec.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Mp4v => "mpeg4",
            Self::H264 => "libx264",
        }
    }

    /// Whether the encoder refuses odd frame sizes.
    pub fn requires_even_dimensions(self) -> bool {
        matches!(self, Self::H264)
    }

    fn output_args(self) -> Vec<&'static str> {
        let mut args = vec![
            "-c:v",
            self.ffmpeg_encoder(),
            "-tag:v",
            self.fourcc(),
            "-pix_fmt",
            "yuv420p",
        ];
        if self == Self::Mp4v {
            // mpeg4 defaults to 200 kb/s; use a fixed quantizer instead.
            args.extend(["-q:v", "2"]);
        }
        args
    }
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output video file path. The extension selects the container.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Compression format.
    pub codec: VideoCodec,
    /// Background used to flatten translucent pixels (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Default options for writing to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            codec: VideoCodec::default(),
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw RGBA frames to its stdin.
///
/// Dropping a started sink without calling [`FrameSink::end`] still closes stdin and reaps the
/// child, so no ffmpeg process outlives the sink.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a sink; nothing is opened until [`FrameSink::begin`].
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    /// Output path this sink writes to.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    fn open_error(&self, msg: impl Into<String>) -> ReelError {
        ReelError::output_open(&self.opts.out_path, msg)
    }

    fn encode_error(&self, msg: impl Into<String>) -> ReelError {
        ReelError::encode(&self.opts.out_path, msg)
    }

    fn reap(&mut self) -> ReelResult<(std::process::ExitStatus, Vec<u8>)> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| self.encode_error("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| self.encode_error(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| self.encode_error("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| self.encode_error(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        Ok((status, stderr_bytes))
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if self.child.is_some() {
            return Err(ReelError::validation("ffmpeg sink already started"));
        }
        if cfg.fps == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        let frame_len = cfg.canvas().rgba8_len()?;
        if frame_len == 0 {
            return Err(ReelError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }

        let codec = self.opts.codec;
        if codec.requires_even_dimensions()
            && (!cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2))
        {
            return Err(self.open_error(format!(
                "codec {} needs even width/height, got {}x{}",
                codec.fourcc(),
                cfg.width,
                cfg.height
            )));
        }

        let out_path = self.opts.out_path.clone();
        if !self.opts.overwrite && out_path.exists() {
            return Err(self.open_error("file already exists"));
        }
        if !is_ffmpeg_on_path() {
            return Err(self.open_error(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }
        if !is_encoder_available(codec.ffmpeg_encoder()) {
            return Err(self.open_error(format!(
                "ffmpeg encoder '{}' for codec {} is not available",
                codec.ffmpeg_encoder(),
                codec.fourcc()
            )));
        }

        // No truncate: an existing file keeps its bytes until ffmpeg replaces it.
        ensure_parent_dir(&out_path).map_err(|e| self.open_error(format!("{e:#}")))?;
        let created = !out_path.exists();
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&out_path)
            .map_err(|e| self.open_error(e.to_string()))?;
        let discard_claim = |err: ReelError| {
            if created && let Err(e) = std::fs::remove_file(&out_path) {
                tracing::warn!(
                    path = %out_path.display(),
                    error = %e,
                    "failed to remove empty output"
                );
            }
            err
        };

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // The path was checked above; ffmpeg replaces whatever is there.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
        ])
        .args(codec.output_args());
        if is_mov_family(&out_path) {
            cmd.args(["-movflags", "+faststart"]);
        }
        cmd.arg(&out_path);

        tracing::debug!(?cmd, "spawning ffmpeg");
        let mut child = cmd.spawn().map_err(|e| {
            discard_claim(self.open_error(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            )))
        })?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(discard_claim(
                self.open_error("failed to open ffmpeg stdin (unexpected)"),
            ));
        };
        let Some(mut stderr) = child.stderr.take() else {
            drop(stdin);
            let _ = child.kill();
            let _ = child.wait();
            return Err(discard_claim(
                self.open_error("failed to open ffmpeg stderr (unexpected)"),
            ));
        };
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; frame_len];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RgbaImage) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::validation("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(ReelError::validation(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        check_frame_size(cfg, frame)?;
        self.last_idx = Some(idx);

        flatten_to_opaque_rgba8(&mut self.scratch, frame.as_raw(), self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::validation("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            ReelError::frame_write(
                &self.opts.out_path,
                idx.0,
                format!("ffmpeg stdin closed early: {e}"),
            )
        })?;
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        let (status, stderr_bytes) = self.reap()?;
        self.cfg = None;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(self.encode_error(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            tracing::warn!(
                path = %self.opts.out_path.display(),
                "ffmpeg sink dropped without end(); closing stream"
            );
            if let Err(e) = self.reap() {
                tracing::warn!(error = %e, "failed to reap ffmpeg");
            }
        }
    }
}

fn is_mov_family(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "mp4" | "m4v" | "mov"))
        .unwrap_or(false)
}

fn flatten_to_opaque_rgba8(dst: &mut [u8], src: &[u8], bg_rgba: [u8; 4]) -> ReelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        let r = mul_div255(s[0] as u16, a) + mul_div255(bg_r, inv);
        let g = mul_div255(s[1] as u16, a) + mul_div255(bg_g, inv);
        let b = mul_div255(s[2] as u16, a) + mul_div255(bg_b, inv);

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when the `ffmpeg` on `PATH` lists `name` among its encoders.
pub fn is_encoder_available(name: &str) -> bool {
    let Ok(output) = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    else {
        return false;
    };
    output.status.success() && encoder_listed(&String::from_utf8_lossy(&output.stdout), name)
}

fn encoder_listed(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(name))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
