//! Codec-private option mappers
//!
//! Translate the uniform speed/quality/rate-control/tune/gop vocabulary into
//! the per-encoder option strings FFmpeg's option parser understands. Every
//! option write targets the codec context's private data area; a failed set
//! is logged at warn and skipped, never fatal.

pub mod av1;
pub mod hevc;

use std::ffi::CString;
use std::os::raw::c_void;

use log::warn;

use crate::ffi::avutil::{av_opt_set, av_opt_set_from_string};
use crate::ffi::error::log_av_warn;
use crate::ffi::types::CodecId;

pub use av1::{Av1Options, Av1RateControl, Av1Tune};
pub use hevc::{HevcOptions, HevcRateControl, HevcTune};

/// Lower bound of the uniform speed/quality scale
pub const LEVEL_MIN: i32 = 1;
/// Upper bound of the uniform speed/quality scale
pub const LEVEL_MAX: i32 = 16;

/// Clamp a level into the uniform 1..=16 scale
#[inline]
pub(crate) fn clamp_level(level: i32) -> i32 {
  level.clamp(LEVEL_MIN, LEVEL_MAX)
}

/// Typed arguments that know which encoder they configure
///
/// Implemented by [`HevcOptions`] and [`Av1Options`]; the encoder handle's
/// `codec_priv_set` is generic over this trait, so the codec id is resolved
/// from the argument type at the call site.
pub trait CodecOptions {
  /// The codec these options target
  fn codec_id(&self) -> CodecId;

  /// Write the mapped options into the encoder's private option area
  ///
  /// # Safety
  /// `priv_data` must be the `priv_data` of an allocated, not-yet-opened
  /// codec context for the matching encoder.
  unsafe fn apply(&self, priv_data: *mut c_void);
}

/// Set one string option, logging failures at warn
pub(crate) fn opt_set(priv_data: *mut c_void, name: &str, value: &str) {
  let (Ok(c_name), Ok(c_value)) = (CString::new(name), CString::new(value)) else {
    warn!("Option `{}={}` contains an interior nul", name, value);
    return;
  };
  let ret = unsafe { av_opt_set(priv_data, c_name.as_ptr(), c_value.as_ptr(), 0) };
  if ret < 0 {
    log_av_warn("av_opt_set", ret);
  }
}

/// Forward a `key1=val1:key2=val2` string to the backend option parser
pub(crate) fn opt_set_from_string(priv_data: *mut c_void, options: &str) {
  let Ok(c_opts) = CString::new(options) else {
    warn!("Advanced options contain an interior nul");
    return;
  };
  let key_val_sep = CString::new("=").unwrap();
  let pairs_sep = CString::new(":").unwrap();
  let ret = unsafe {
    av_opt_set_from_string(
      priv_data,
      c_opts.as_ptr(),
      std::ptr::null(),
      key_val_sep.as_ptr(),
      pairs_sep.as_ptr(),
    )
  };
  if ret < 0 {
    log_av_warn("av_opt_set_from_string", ret);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_clamp_level() {
    assert_eq!(clamp_level(0), 1);
    assert_eq!(clamp_level(-5), 1);
    assert_eq!(clamp_level(1), 1);
    assert_eq!(clamp_level(16), 16);
    assert_eq!(clamp_level(17), 16);
    assert_eq!(clamp_level(1000), 16);
  }
}
