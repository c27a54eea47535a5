//! FFmpeg error handling
//!
//! Provides the error codes the pipeline branches on and the logging helpers
//! that pair a failing backend function with FFmpeg's error string. Backend
//! return codes never cross into the public surface; they are logged here and
//! mapped into the crate's fixed error taxonomy at the call site.

use std::ffi::CStr;
use std::os::raw::c_int;

// ============================================================================
// FFmpeg Error Codes
// ============================================================================

/// End of file / stream reached
pub const AVERROR_EOF: c_int = fferrtag(b'E', b'O', b'F', b' ');

/// Invalid data found
pub const AVERROR_INVALIDDATA: c_int = fferrtag(b'I', b'N', b'D', b'A');

/// Stream not found
pub const AVERROR_STREAM_NOT_FOUND: c_int = fferrtag(0xF8, b'S', b'T', b'R');

/// Decoder not found
pub const AVERROR_DECODER_NOT_FOUND: c_int = fferrtag(0xF8, b'D', b'E', b'C');

/// Encoder not found
pub const AVERROR_ENCODER_NOT_FOUND: c_int = fferrtag(0xF8, b'E', b'N', b'C');

/// Option not found
pub const AVERROR_OPTION_NOT_FOUND: c_int = fferrtag(0xF8, b'O', b'P', b'T');

/// Unknown error
pub const AVERROR_UNKNOWN: c_int = fferrtag(b'U', b'N', b'K', b'N');

// POSIX error codes (negated) - platform specific
// Note: FFmpeg negates errno values, so we need platform-specific values

/// Resource temporarily unavailable (try again)
/// Linux: EAGAIN = 11, macOS: EAGAIN = 35
#[cfg(target_os = "macos")]
pub const AVERROR_EAGAIN: c_int = -35;

#[cfg(target_os = "linux")]
pub const AVERROR_EAGAIN: c_int = -11;

#[cfg(target_os = "windows")]
pub const AVERROR_EAGAIN: c_int = -11; // WSAEWOULDBLOCK maps to 11

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
pub const AVERROR_EAGAIN: c_int = -11;

/// Out of memory
/// Same across platforms (12)
pub const AVERROR_ENOMEM: c_int = -12;

/// Invalid argument
/// Same across platforms (22)
pub const AVERROR_EINVAL: c_int = -22;

// ============================================================================
// Error Tag Helper
// ============================================================================

/// Create FFmpeg error tag from 4 bytes
const fn fferrtag(a: u8, b: u8, c: u8, d: u8) -> c_int {
  -((a as c_int) | ((b as c_int) << 8) | ((c as c_int) << 16) | ((d as c_int) << 24))
}

// ============================================================================
// Error Message Helpers
// ============================================================================

/// Get error message for an FFmpeg error code
pub fn get_error_message(code: c_int) -> String {
  let mut buf = [0 as std::os::raw::c_char; 256];
  unsafe {
    super::avutil::av_strerror(code, buf.as_mut_ptr(), buf.len());
    CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
  }
}

/// Log a backend failure at error level with the failing function's name
#[inline]
pub fn log_av_error(func: &str, code: c_int) {
  log::error!("`{}` failed: {} ({})", func, code, get_error_message(code));
}

/// Log a backend failure at warn level with the failing function's name
#[inline]
pub fn log_av_warn(func: &str, code: c_int) {
  log::warn!("`{}` failed: {} ({})", func, code, get_error_message(code));
}

/// Log an expected backend condition (EAGAIN bounces and the like) at debug
#[inline]
pub fn log_av_debug(func: &str, code: c_int) {
  log::debug!("`{}` returned: {} ({})", func, code, get_error_message(code));
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_codes() {
    assert!(AVERROR_EOF < 0);
    assert!(AVERROR_EAGAIN < 0);
    assert!(AVERROR_EINVAL < 0);
  }

  #[test]
  fn test_error_codes_are_distinct() {
    assert_ne!(AVERROR_EOF, AVERROR_EAGAIN);
    assert_ne!(AVERROR_EOF, AVERROR_INVALIDDATA);
    assert_ne!(AVERROR_EAGAIN, AVERROR_EINVAL);
  }
}
