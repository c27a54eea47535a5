//! libswscale function declarations
//!
//! Provides image scaling and pixel-format conversion.

use super::types::SwsContext;
use std::os::raw::{c_double, c_int, c_void};

unsafe extern "C" {
  /// Allocate and return an SwsContext for the given conversion
  ///
  /// # Returns
  /// Pointer to the allocated context, or NULL on failure
  pub fn sws_getContext(
    src_w: c_int,
    src_h: c_int,
    src_format: c_int,
    dst_w: c_int,
    dst_h: c_int,
    dst_format: c_int,
    flags: c_int,
    src_filter: *mut c_void,
    dst_filter: *mut c_void,
    param: *const c_double,
  ) -> *mut SwsContext;

  /// Free the swscaler context
  pub fn sws_freeContext(ctx: *mut SwsContext);

  /// Scale the image slice in src and put the result in dst
  ///
  /// # Returns
  /// The height of the output slice, or a negative AVERROR on error
  pub fn sws_scale(
    ctx: *mut SwsContext,
    src_slice: *const *const u8,
    src_stride: *const c_int,
    src_slice_y: c_int,
    src_slice_h: c_int,
    dst: *const *mut u8,
    dst_stride: *const c_int,
  ) -> c_int;
}

// ============================================================================
// Scaling Flags
// ============================================================================

pub const SWS_FAST_BILINEAR: c_int = 1;
pub const SWS_BILINEAR: c_int = 2;
pub const SWS_BICUBIC: c_int = 4;
pub const SWS_POINT: c_int = 0x10;
pub const SWS_LANCZOS: c_int = 0x200;
