//! Frame loop driving a [`FrameSink`](crate::FrameSink).

pub mod pipeline;
