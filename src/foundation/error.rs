use std::path::{Path, PathBuf};

/// Result alias used across the crate.
pub type ReelResult<T> = Result<T, ReelError>;

/// Errors surfaced by zoom video generation.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid parameters or mismatched frame data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The source image could not be read or decoded.
    #[error("failed to load image '{}': {message}", path.display())]
    ImageLoad {
        /// Offending input path.
        path: PathBuf,
        /// Underlying cause.
        message: String,
    },

    /// The output stream could not be created.
    #[error("failed to open output '{}': {message}", path.display())]
    OutputOpen {
        /// Offending output path.
        path: PathBuf,
        /// Underlying cause.
        message: String,
    },

    /// A frame could not be written after the output was opened.
    #[error("failed to write frame {frame} to '{}': {message}", path.display())]
    FrameWrite {
        /// Output being written.
        path: PathBuf,
        /// Zero-based index of the failing frame.
        frame: u64,
        /// Underlying cause.
        message: String,
    },

    /// The encoder failed while finalizing the output.
    #[error("failed to encode '{}': {message}", path.display())]
    Encode {
        /// Output being finalized.
        path: PathBuf,
        /// Underlying cause, including the encoder's own diagnostics.
        message: String,
    },

    /// Any other error, with its context chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::ImageLoad`] for `path`.
    pub fn image_load(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::ImageLoad {
            path: path.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    /// Build a [`ReelError::OutputOpen`] for `path`.
    pub fn output_open(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::OutputOpen {
            path: path.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    /// Build a [`ReelError::FrameWrite`] for frame `frame` of `path`.
    pub fn frame_write(path: impl AsRef<Path>, frame: u64, msg: impl Into<String>) -> Self {
        Self::FrameWrite {
            path: path.as_ref().to_path_buf(),
            frame,
            message: msg.into(),
        }
    }

    /// Build a [`ReelError::Encode`] for `path`.
    pub fn encode(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::Encode {
            path: path.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    /// Append the error raised while finalizing the output to this one.
    ///
    /// A frame write usually fails because the encoder already quit; its reason only shows up
    /// once the output is finalized.
    pub fn with_finalize_error(self, end_err: &ReelError) -> Self {
        let note = format!("; finalizing the output also failed: {end_err}");
        match self {
            Self::Validation(msg) => Self::Validation(msg + &note),
            Self::ImageLoad { path, message } => Self::ImageLoad {
                path,
                message: message + &note,
            },
            Self::OutputOpen { path, message } => Self::OutputOpen {
                path,
                message: message + &note,
            },
            Self::FrameWrite {
                path,
                frame,
                message,
            } => Self::FrameWrite {
                path,
                frame,
                message: message + &note,
            },
            Self::Encode { path, message } => Self::Encode {
                path,
                message: message + &note,
            },
            Self::Other(err) => {
                let msg = format!("{err}{note}");
                Self::Other(err.context(msg))
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
