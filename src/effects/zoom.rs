use image::{
    Rgba, RgbaImage,
    imageops::{self, FilterType},
};

use crate::foundation::{
    core::{Canvas, FrameIndex, frames_for_duration},
    error::{ReelError, ReelResult},
};

/// Fill color for the border around the shrunken image.
const PAD_RGBA: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Bilinear resampling in the `image` crate.
const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

/// User-facing parameters of the zoom effect.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoomParams {
    /// Output length in seconds.
    pub duration_sec: f64,
    /// Output frame rate.
    pub fps: u32,
    /// Magnification reached at the last frame (`1.0` means no zoom).
    pub zoom_factor: f64,
}

impl Default for ZoomParams {
    fn default() -> Self {
        Self {
            duration_sec: 5.0,
            fps: 30,
            zoom_factor: 1.05,
        }
    }
}

impl ZoomParams {
    /// Check ranges and that at least one frame would be produced.
    pub fn validate(&self) -> ReelResult<()> {
        if !self.duration_sec.is_finite() || self.duration_sec <= 0.0 {
            return Err(ReelError::validation(format!(
                "duration_sec must be a positive number, got {}",
                self.duration_sec
            )));
        }
        if self.fps == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        if !self.zoom_factor.is_finite() || self.zoom_factor < 1.0 {
            return Err(ReelError::validation(format!(
                "zoom_factor must be >= 1.0, got {}",
                self.zoom_factor
            )));
        }
        if self.num_frames() == 0 {
            return Err(ReelError::validation(format!(
                "duration_sec * fps must cover at least one frame ({}s at {} fps)",
                self.duration_sec, self.fps
            )));
        }
        Ok(())
    }

    /// `floor(duration_sec * fps)`.
    pub fn num_frames(&self) -> u64 {
        frames_for_duration(self.duration_sec, self.fps)
    }
}

/// Resolved per-frame geometry of the zoom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameGeometry {
    /// Frame this geometry belongs to.
    pub index: FrameIndex,
    /// Effective magnification, from `1.0` to the zoom factor.
    pub scale: f64,
    /// Width the whole source is shrunk to.
    pub crop_width: u32,
    /// Height the whole source is shrunk to.
    pub crop_height: u32,
    /// Black columns added on the left and on the right.
    pub x_border: u32,
    /// Black rows added on the top and on the bottom.
    pub y_border: u32,
}

impl FrameGeometry {
    /// Size of the shrunken image after symmetric padding, before the final resample.
    pub fn padded_size(&self) -> (u32, u32) {
        (
            self.crop_width + 2 * self.x_border,
            self.crop_height + 2 * self.y_border,
        )
    }
}

/// Frame schedule for one source image and one set of [`ZoomParams`].
///
/// Scale grows linearly from `1.0` at frame 0 to `zoom_factor` at the last frame. A one-frame
/// plan renders that frame at scale `1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomPlan {
    canvas: Canvas,
    num_frames: u64,
    zoom_factor: f64,
}

impl ZoomPlan {
    /// Build a plan for a source of size `canvas`.
    pub fn new(canvas: Canvas, params: &ZoomParams) -> ReelResult<Self> {
        params.validate()?;
        let canvas = Canvas::new(canvas.width, canvas.height)?;
        Ok(Self {
            canvas,
            num_frames: params.num_frames(),
            zoom_factor: params.zoom_factor,
        })
    }

    /// Output (and source) dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Total number of frames.
    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }

    /// Linear progress `i / (n - 1)` in `[0, 1]`.
    pub fn progress(&self, idx: FrameIndex) -> f64 {
        if self.num_frames <= 1 {
            return 0.0;
        }
        let last = self.num_frames - 1;
        (idx.0.min(last) as f64) / (last as f64)
    }

    /// Magnification at `idx`.
    pub fn scale_at(&self, idx: FrameIndex) -> f64 {
        if self.num_frames > 1 && idx.0 >= self.num_frames - 1 {
            // `1 + (z - 1)` can round away from `z` for z > 2.
            return self.zoom_factor;
        }
        1.0 + (self.zoom_factor - 1.0) * self.progress(idx)
    }

    /// Geometry for frame `idx`.
    pub fn geometry(&self, idx: FrameIndex) -> ReelResult<FrameGeometry> {
        if idx.0 >= self.num_frames {
            return Err(ReelError::validation(format!(
                "frame {} out of range (plan has {} frames)",
                idx.0, self.num_frames
            )));
        }
        Ok(self.geometry_unchecked(idx))
    }

    /// Geometry of every frame, in timeline order.
    pub fn frames(&self) -> impl Iterator<Item = FrameGeometry> + '_ {
        (0..self.num_frames).map(move |i| self.geometry_unchecked(FrameIndex(i)))
    }

    fn geometry_unchecked(&self, idx: FrameIndex) -> FrameGeometry {
        let scale = self.scale_at(idx);
        let Canvas { width, height } = self.canvas;
        let crop_width = shrink(width, scale);
        let crop_height = shrink(height, scale);

        FrameGeometry {
            index: idx,
            scale,
            crop_width,
            crop_height,
            x_border: (width - crop_width) / 2,
            y_border: (height - crop_height) / 2,
        }
    }

    /// Render one frame: shrink the whole source, pad it with black, resample to the canvas.
    pub fn render_frame(&self, source: &RgbaImage, geom: &FrameGeometry) -> ReelResult<RgbaImage> {
        let Canvas { width, height } = self.canvas;
        if source.dimensions() != (width, height) {
            return Err(ReelError::validation(format!(
                "source size mismatch: got {}x{}, plan expects {}x{}",
                source.width(),
                source.height(),
                width,
                height
            )));
        }

        let shrunk = resample(source, geom.crop_width, geom.crop_height);

        let (padded_w, padded_h) = geom.padded_size();
        let mut padded = RgbaImage::from_pixel(padded_w, padded_h, PAD_RGBA);
        imageops::replace(
            &mut padded,
            &shrunk,
            i64::from(geom.x_border),
            i64::from(geom.y_border),
        );

        // Flooring in `shrink` and in the border halving can leave the padded image one pixel
        // short of the canvas; the encoder only accepts exact sizes.
        let frame = resample(&padded, width, height);
        debug_assert_eq!(frame.dimensions(), (width, height));
        Ok(frame)
    }
}

fn shrink(extent: u32, scale: f64) -> u32 {
    ((f64::from(extent) / scale).floor() as u32).clamp(1, extent)
}

fn resample(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, RESAMPLE_FILTER)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/zoom.rs"]
mod tests;
