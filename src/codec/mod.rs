//! Safe Rust wrappers for the FFmpeg primitives the pipeline consumes
//!
//! This module provides RAII wrappers around FFmpeg's C structures,
//! ensuring proper resource cleanup and memory safety.

pub mod demuxer;
pub mod frame;
pub mod muxer;
pub mod packet;
pub mod scaler;

pub use demuxer::{DecodeStreamArgs, DemuxerContext, ReadStatus};
pub use frame::RawFrame;
pub use muxer::{ContainerFormat, EncodeContextArgs, MuxerContext};
pub use packet::Packet;
pub use scaler::Scaler;

/// Outcome of a send/receive call against a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
  /// Data was accepted or produced
  Frame,
  /// The codec wants the other side of the pipe serviced first
  Again,
  /// The codec is fully drained
  Eof,
}
