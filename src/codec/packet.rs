//! Safe wrapper around FFmpeg AVPacket
//!
//! Provides RAII-based memory management for compressed data.

use crate::ffi::{
  AVPacket,
  accessors::{ffpkt_set_stream_index, ffpkt_stream_index},
  avcodec::{av_packet_alloc, av_packet_free, av_packet_unref},
};
use std::ptr::NonNull;

use crate::error::{Error, Result};

/// Safe wrapper around AVPacket with RAII cleanup
pub struct Packet {
  ptr: NonNull<AVPacket>,
}

impl Packet {
  /// Allocate a new empty packet
  pub fn new() -> Result<Self> {
    let ptr = unsafe { av_packet_alloc() };
    NonNull::new(ptr)
      .map(|ptr| Self { ptr })
      .ok_or(Error::MemoryAlloc)
  }

  /// Get the raw pointer (for FFmpeg API calls)
  #[inline]
  pub fn as_ptr(&self) -> *const AVPacket {
    self.ptr.as_ptr()
  }

  /// Get the mutable raw pointer (for FFmpeg API calls)
  #[inline]
  pub fn as_mut_ptr(&mut self) -> *mut AVPacket {
    self.ptr.as_ptr()
  }

  /// Index of the stream this packet belongs to
  #[inline]
  pub fn stream_index(&self) -> i32 {
    unsafe { ffpkt_stream_index(self.as_ptr()) }
  }

  /// Stamp the stream index before handing the packet to the muxer
  #[inline]
  pub fn set_stream_index(&mut self, stream_index: i32) {
    unsafe { ffpkt_set_stream_index(self.as_mut_ptr(), stream_index) }
  }

  /// Unreference the packet data (but keep the packet structure)
  pub fn unref(&mut self) {
    unsafe { av_packet_unref(self.as_mut_ptr()) }
  }
}

impl Drop for Packet {
  fn drop(&mut self) {
    unsafe {
      let mut ptr = self.ptr.as_ptr();
      av_packet_free(&mut ptr);
    }
  }
}

// SAFETY: the packet owns its buffer exclusively; moving it to another
// thread moves ownership with it
unsafe impl Send for Packet {}
