//! Core FFmpeg type definitions
//!
//! All FFmpeg structs are opaque (zero-sized) to avoid version-specific layout
//! dependencies. Field access is done via the thin C accessor library in
//! accessors.c. The public `PixelFormat` / `CodecId` enumerations live here as
//! well: their discriminants equal the FFmpeg values, so the happy-path
//! conversion is a constant-time cast.

use std::marker::PhantomData;
use std::os::raw::c_int;

use log::{error, warn};

// ============================================================================
// Rational Number
// ============================================================================

/// Rational number for time bases and frame rates
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rational {
  /// Numerator
  pub num: c_int,
  /// Denominator
  pub den: c_int,
}

impl Rational {
  pub const fn new(num: c_int, den: c_int) -> Self {
    Self { num, den }
  }

  pub fn as_f64(&self) -> f64 {
    if self.den == 0 {
      0.0
    } else {
      self.num as f64 / self.den as f64
    }
  }
}

// ============================================================================
// Codec IDs
// ============================================================================

/// Raw value one past the last codec id the library understands
pub const CODEC_ID_RAW_MAX: c_int = 226;

/// Video codec identifiers understood by the pipeline
///
/// Discriminants match FFmpeg's `AVCodecID` values.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CodecId {
  #[default]
  None = 0,
  Mjpeg = 7,
  H264 = 27,
  Png = 61,
  Gif = 97,
  Hevc = 173,
  Av1 = 225,
}

impl CodecId {
  /// Convert to the backend codec id.
  ///
  /// Permissive: ids without an explicit mapping pass through as their raw
  /// value with a warning, as long as they stay inside the backend's legal
  /// range. `None` (and anything below it) is rejected.
  pub fn to_av(self) -> Option<c_int> {
    match self {
      CodecId::Mjpeg
      | CodecId::H264
      | CodecId::Png
      | CodecId::Gif
      | CodecId::Hevc
      | CodecId::Av1 => Some(self as c_int),
      _ => {
        let raw = self as c_int;
        if raw <= CodecId::None as c_int || raw >= CODEC_ID_RAW_MAX {
          error!("Invalid codec id: {}", raw);
          return None;
        }
        warn!("Unsupported codec id: {}, passing raw value through", raw);
        Some(raw)
      }
    }
  }

  /// Convert from the backend codec id.
  ///
  /// Strict: unknown backend ids are never published upward.
  pub fn from_av(raw: c_int) -> Option<Self> {
    match raw {
      7 => Some(CodecId::Mjpeg),
      27 => Some(CodecId::H264),
      61 => Some(CodecId::Png),
      97 => Some(CodecId::Gif),
      173 => Some(CodecId::Hevc),
      225 => Some(CodecId::Av1),
      _ => {
        error!("Unsupported codec id from backend: {}", raw);
        None
      }
    }
  }

  /// Get the raw FFmpeg codec id value
  #[inline]
  pub fn as_raw(&self) -> c_int {
    *self as c_int
  }
}

// ============================================================================
// Pixel Formats
// ============================================================================

/// Raw value one past the last pixel format the library understands
pub const PIX_FMT_RAW_MAX: c_int = 25;

/// Video pixel formats understood by the pipeline
///
/// Discriminants match FFmpeg's `AVPixelFormat` values.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
  #[default]
  None = -1,
  // Planar YUV formats
  Yuv420p = 0,
  Yuyv422 = 1,
  Rgb24 = 2,
  Bgr24 = 3,
  Yuv444p = 5,
  Pal8 = 11,
  // Full-range (JPEG) variants, deprecated upstream in favor of color_range
  Yuvj420p = 12,
  Yuvj422p = 13,
  Yuvj444p = 14,
  // Packed low-depth RGB formats
  Bgr8 = 17,
  Bgr4 = 18,
  Bgr4Byte = 19,
  Rgb8 = 20,
  Rgb4 = 21,
  Rgb4Byte = 22,
  // Semi-planar formats
  Nv12 = 23,
  Nv21 = 24,
}

impl PixelFormat {
  /// Convert to the backend pixel format.
  ///
  /// Permissive: formats without an explicit mapping pass through as their
  /// raw value with a warning, as long as they stay inside the backend's
  /// legal range. This lets a decoder hand the user any format they asked
  /// for by number.
  pub fn to_av(self) -> Option<c_int> {
    match self {
      PixelFormat::Yuv420p
      | PixelFormat::Yuyv422
      | PixelFormat::Rgb24
      | PixelFormat::Bgr24
      | PixelFormat::Yuv444p
      | PixelFormat::Pal8
      | PixelFormat::Yuvj420p
      | PixelFormat::Bgr8
      | PixelFormat::Bgr4
      | PixelFormat::Bgr4Byte
      | PixelFormat::Rgb8
      | PixelFormat::Rgb4
      | PixelFormat::Rgb4Byte
      | PixelFormat::Nv12
      | PixelFormat::Nv21 => Some(self as c_int),
      _ => {
        let raw = self as c_int;
        if raw <= PixelFormat::None as c_int || raw >= PIX_FMT_RAW_MAX {
          error!("Invalid pixel format: {}", raw);
          return None;
        }
        warn!("Unsupported pixel format: {}, passing raw value through", raw);
        Some(raw)
      }
    }
  }

  /// Convert from the backend pixel format.
  ///
  /// Strict: unknown backend formats are never published upward.
  pub fn from_av(raw: c_int) -> Option<Self> {
    match raw {
      0 => Some(PixelFormat::Yuv420p),
      1 => Some(PixelFormat::Yuyv422),
      2 => Some(PixelFormat::Rgb24),
      3 => Some(PixelFormat::Bgr24),
      5 => Some(PixelFormat::Yuv444p),
      11 => Some(PixelFormat::Pal8),
      12 => Some(PixelFormat::Yuvj420p),
      17 => Some(PixelFormat::Bgr8),
      18 => Some(PixelFormat::Bgr4),
      19 => Some(PixelFormat::Bgr4Byte),
      20 => Some(PixelFormat::Rgb8),
      21 => Some(PixelFormat::Rgb4),
      22 => Some(PixelFormat::Rgb4Byte),
      23 => Some(PixelFormat::Nv12),
      24 => Some(PixelFormat::Nv21),
      _ => {
        error!("Unsupported pixel format from backend: {}", raw);
        None
      }
    }
  }

  /// Get the raw FFmpeg pixel format value
  #[inline]
  pub fn as_raw(&self) -> c_int {
    *self as c_int
  }
}

// ============================================================================
// Opaque FFmpeg Types
// ============================================================================

/// Opaque AVCodec structure (codec implementation descriptor)
#[repr(C)]
pub struct AVCodec {
  _opaque: [u8; 0],
  _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVCodecContext structure (encoder/decoder instance)
#[repr(C)]
pub struct AVCodecContext {
  _opaque: [u8; 0],
  _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVFrame structure (uncompressed video data)
#[repr(C)]
pub struct AVFrame {
  _opaque: [u8; 0],
  _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVPacket structure (compressed data)
#[repr(C)]
pub struct AVPacket {
  _opaque: [u8; 0],
  _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque SwsContext structure (software scaler context)
#[repr(C)]
pub struct SwsContext {
  _opaque: [u8; 0],
  _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVDictionary structure (key-value options)
#[repr(C)]
pub struct AVDictionary {
  _opaque: [u8; 0],
  _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

// ============================================================================
// Constants
// ============================================================================

/// No timestamp value
pub const AV_NOPTS_VALUE: i64 = 0x8000000000000000u64 as i64;

/// The number of data/linesize slots an AVFrame carries
pub const AV_NUM_DATA_POINTERS: usize = 8;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_codec_id_round_trip() {
    for id in [
      CodecId::Mjpeg,
      CodecId::H264,
      CodecId::Png,
      CodecId::Gif,
      CodecId::Hevc,
      CodecId::Av1,
    ] {
      let raw = id.to_av().unwrap();
      assert_eq!(CodecId::from_av(raw), Some(id));
    }
  }

  #[test]
  fn test_codec_id_none_is_invalid() {
    assert_eq!(CodecId::None.to_av(), None);
    assert_eq!(CodecId::from_av(0), None);
    assert_eq!(CodecId::from_av(226), None);
  }

  #[test]
  fn test_pixel_format_round_trip() {
    for fmt in [
      PixelFormat::Yuv420p,
      PixelFormat::Rgb24,
      PixelFormat::Bgr24,
      PixelFormat::Yuv444p,
      PixelFormat::Nv12,
      PixelFormat::Nv21,
    ] {
      let raw = fmt.to_av().unwrap();
      assert_eq!(PixelFormat::from_av(raw), Some(fmt));
    }
  }

  #[test]
  fn test_pixel_format_permissive_passthrough() {
    // The full-range 4:2:2/4:4:4 variants carry no explicit mapping but are
    // inside the backend's legal range, so they pass through by value.
    assert_eq!(PixelFormat::Yuvj422p.to_av(), Some(13));
    assert_eq!(PixelFormat::Yuvj444p.to_av(), Some(14));
    // The strict direction refuses them.
    assert_eq!(PixelFormat::from_av(13), None);
    assert_eq!(PixelFormat::from_av(14), None);
  }

  #[test]
  fn test_pixel_format_none_is_invalid() {
    assert_eq!(PixelFormat::None.to_av(), None);
    assert_eq!(PixelFormat::from_av(-1), None);
    assert_eq!(PixelFormat::from_av(PIX_FMT_RAW_MAX), None);
  }

  #[test]
  fn test_rational() {
    assert_eq!(Rational::new(30, 1).as_f64(), 30.0);
    assert_eq!(Rational::new(1, 0).as_f64(), 0.0);
  }
}
