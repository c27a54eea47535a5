//! libavutil function declarations
//!
//! Provides utility functions for memory, frames, options, and general helpers.

use super::types::*;
use std::os::raw::{c_char, c_int, c_void};

unsafe extern "C" {
  // ========================================================================
  // Frame Management
  // ========================================================================

  /// Allocate an AVFrame and set its fields to default values
  pub fn av_frame_alloc() -> *mut AVFrame;

  /// Free the frame and any dynamically allocated objects in it
  pub fn av_frame_free(frame: *mut *mut AVFrame);

  /// Unreference all buffers referenced by frame and reset to defaults
  pub fn av_frame_unref(frame: *mut AVFrame);

  // ========================================================================
  // Memory Allocation
  // ========================================================================

  /// Free a memory block which has been allocated by the backend and set ptr
  /// to NULL
  pub fn av_freep(ptr: *mut c_void);

  // ========================================================================
  // Image Utilities
  // ========================================================================

  /// Allocate an image with the given dimensions and pixel format
  ///
  /// Fills `pointers` and `linesizes` for every plane. The allocation is a
  /// single buffer rooted at plane 0; freeing plane 0 via av_freep releases
  /// the whole image.
  ///
  /// # Returns
  /// * the size in bytes required for the image on success
  /// * Negative AVERROR on error
  pub fn av_image_alloc(
    pointers: *mut *mut u8,
    linesizes: *mut c_int,
    w: c_int,
    h: c_int,
    pix_fmt: c_int,
    align: c_int,
  ) -> c_int;

  // ========================================================================
  // Options
  // ========================================================================

  /// Set a string option on an object (e.g. a codec context's priv_data)
  pub fn av_opt_set(
    obj: *mut c_void,
    name: *const c_char,
    val: *const c_char,
    search_flags: c_int,
  ) -> c_int;

  /// Parse a key/value option string and apply each entry to an object
  ///
  /// `key_val_sep` separates keys from values, `pairs_sep` separates pairs.
  pub fn av_opt_set_from_string(
    ctx: *mut c_void,
    opts: *const c_char,
    shorthand: *const *const c_char,
    key_val_sep: *const c_char,
    pairs_sep: *const c_char,
  ) -> c_int;

  // ========================================================================
  // CPU Capabilities
  // ========================================================================

  /// Return the flags which specify extensions supported by the CPU
  pub fn av_get_cpu_flags() -> c_int;

  // ========================================================================
  // Error Handling
  // ========================================================================

  /// Put a description of the AVERROR code errnum in errbuf
  ///
  /// # Returns
  /// 0 on success, negative if truncated
  pub fn av_strerror(errnum: c_int, errbuf: *mut c_char, errbuf_size: usize) -> c_int;
}

// ============================================================================
// CPU Flags
// ============================================================================

pub mod cpu_flag {
  use std::os::raw::c_int;

  pub const SSE2: c_int = 0x0010;
  pub const AVX: c_int = 0x4000;
  pub const AVX2: c_int = 0x8000;
  pub const AVX512: c_int = 0x100000;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Pick the image-buffer row alignment from the CPU's vector width
///
/// AVX-512 wants 64-byte rows, AVX/AVX2 32, SSE2 16; anything else gets the
/// conservative 32-byte default.
pub fn default_image_align() -> c_int {
  let flags = unsafe { av_get_cpu_flags() };

  if flags & cpu_flag::AVX512 != 0 {
    64
  } else if flags & cpu_flag::AVX2 != 0 || flags & cpu_flag::AVX != 0 {
    32
  } else if flags & cpu_flag::SSE2 != 0 {
    16
  } else {
    32
  }
}
