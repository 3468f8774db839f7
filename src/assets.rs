//! Source image loading.

pub mod decode;
