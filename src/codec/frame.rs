//! Safe wrapper around FFmpeg AVFrame
//!
//! This is the thin RAII shell used for scratch and shuttle frames; the
//! pool-managed frame that callers see lives in the pipeline layer and owns
//! one of these plus (optionally) backend-allocated image memory.

use crate::ffi::{
  AVFrame, Rational,
  accessors::{
    ffframe_data, ffframe_get_format, ffframe_get_height, ffframe_get_pkt_dts, ffframe_get_pts,
    ffframe_get_time_base, ffframe_get_width, ffframe_linesize, ffframe_set_data,
    ffframe_set_format, ffframe_set_height, ffframe_set_linesize, ffframe_set_pkt_dts,
    ffframe_set_pts, ffframe_set_time_base, ffframe_set_width,
  },
  avutil::{av_frame_alloc, av_frame_free, av_frame_unref},
};
use std::os::raw::c_int;
use std::ptr::NonNull;

use crate::error::{Error, Result};

/// Safe wrapper around AVFrame with RAII cleanup
pub struct RawFrame {
  ptr: NonNull<AVFrame>,
}

impl RawFrame {
  /// Allocate a new empty frame
  pub fn new() -> Result<Self> {
    let ptr = unsafe { av_frame_alloc() };
    NonNull::new(ptr)
      .map(|ptr| Self { ptr })
      .ok_or(Error::MemoryAlloc)
  }

  /// Get the raw pointer (for FFmpeg API calls)
  #[inline]
  pub fn as_ptr(&self) -> *const AVFrame {
    self.ptr.as_ptr()
  }

  /// Get the mutable raw pointer (for FFmpeg API calls)
  #[inline]
  pub fn as_mut_ptr(&mut self) -> *mut AVFrame {
    self.ptr.as_ptr()
  }

  // ========================================================================
  // Dimensions and Format
  // ========================================================================

  #[inline]
  pub fn width(&self) -> i32 {
    unsafe { ffframe_get_width(self.as_ptr()) }
  }

  #[inline]
  pub fn height(&self) -> i32 {
    unsafe { ffframe_get_height(self.as_ptr()) }
  }

  pub fn set_dimensions(&mut self, width: i32, height: i32) {
    unsafe {
      ffframe_set_width(self.as_mut_ptr(), width);
      ffframe_set_height(self.as_mut_ptr(), height);
    }
  }

  /// Raw backend pixel format value
  #[inline]
  pub fn format_raw(&self) -> c_int {
    unsafe { ffframe_get_format(self.as_ptr()) }
  }

  pub fn set_format_raw(&mut self, format: c_int) {
    unsafe { ffframe_set_format(self.as_mut_ptr(), format) }
  }

  // ========================================================================
  // Timestamps
  // ========================================================================

  #[inline]
  pub fn pts(&self) -> i64 {
    unsafe { ffframe_get_pts(self.as_ptr()) }
  }

  #[inline]
  pub fn set_pts(&mut self, pts: i64) {
    unsafe { ffframe_set_pts(self.as_mut_ptr(), pts) }
  }

  #[inline]
  pub fn pkt_dts(&self) -> i64 {
    unsafe { ffframe_get_pkt_dts(self.as_ptr()) }
  }

  #[inline]
  pub fn set_pkt_dts(&mut self, pkt_dts: i64) {
    unsafe { ffframe_set_pkt_dts(self.as_mut_ptr(), pkt_dts) }
  }

  pub fn time_base(&self) -> Rational {
    let mut num = 0;
    let mut den = 0;
    unsafe { ffframe_get_time_base(self.as_ptr(), &mut num, &mut den) };
    Rational::new(num, den)
  }

  pub fn set_time_base(&mut self, tb: Rational) {
    unsafe { ffframe_set_time_base(self.as_mut_ptr(), tb.num, tb.den) }
  }

  // ========================================================================
  // Data Access
  // ========================================================================

  /// Pointer to plane data; valid only while the frame is alive
  #[inline]
  pub fn data(&self, plane: usize) -> *mut u8 {
    unsafe { ffframe_data(self.ptr.as_ptr(), plane as c_int) }
  }

  #[inline]
  pub fn set_data(&mut self, plane: usize, data: *mut u8) {
    unsafe { ffframe_set_data(self.as_mut_ptr(), plane as c_int, data) }
  }

  /// Line size (stride) for a plane
  #[inline]
  pub fn linesize(&self, plane: usize) -> i32 {
    unsafe { ffframe_linesize(self.as_ptr(), plane as c_int) }
  }

  #[inline]
  pub fn set_linesize(&mut self, plane: usize, linesize: i32) {
    unsafe { ffframe_set_linesize(self.as_mut_ptr(), plane as c_int, linesize) }
  }

  // ========================================================================
  // Lifecycle
  // ========================================================================

  /// Unreference the frame data (but keep the frame structure)
  pub fn unref(&mut self) {
    unsafe { av_frame_unref(self.as_mut_ptr()) }
  }
}

impl Drop for RawFrame {
  fn drop(&mut self) {
    unsafe {
      let mut ptr = self.ptr.as_ptr();
      av_frame_free(&mut ptr);
    }
  }
}

// SAFETY: the frame owns its buffers exclusively; moving it to another
// thread moves ownership with it
unsafe impl Send for RawFrame {}

impl std::fmt::Debug for RawFrame {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RawFrame")
      .field("width", &self.width())
      .field("height", &self.height())
      .field("format", &self.format_raw())
      .field("pts", &self.pts())
      .finish()
  }
}
