//! Per-frame image effects.

pub mod zoom;
