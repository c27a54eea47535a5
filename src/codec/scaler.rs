//! Safe wrapper around FFmpeg SwsContext
//!
//! The pipeline treats the scaler as an opaque scale operator: one context
//! per (source, destination) geometry, one `scale` operation. Bilinear
//! filtering throughout.

use crate::ffi::{
  SwsContext,
  swscale::{SWS_BILINEAR, sws_freeContext, sws_getContext, sws_scale},
};
use std::os::raw::c_int;
use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::ffi::types::PixelFormat;
use crate::pipeline::frame::VideoFrame;

/// Opaque scale operator between two fixed image geometries
pub struct Scaler {
  ptr: NonNull<SwsContext>,
  src_height: c_int,
}

impl Scaler {
  /// Create a bilinear scaler for the given conversion
  pub fn new(
    src_w: i32,
    src_h: i32,
    src_fmt: PixelFormat,
    dst_w: i32,
    dst_h: i32,
    dst_fmt: PixelFormat,
  ) -> Result<Self> {
    let src_fmt = src_fmt.to_av().ok_or(Error::Args)?;
    let dst_fmt = dst_fmt.to_av().ok_or(Error::Args)?;
    Self::from_raw_formats(src_w, src_h, src_fmt, dst_w, dst_h, dst_fmt)
  }

  /// Create a scaler from raw backend pixel-format values
  ///
  /// The producer path uses this so a permissively passed-through format
  /// still reaches the backend untouched.
  pub(crate) fn from_raw_formats(
    src_w: i32,
    src_h: i32,
    src_fmt: c_int,
    dst_w: i32,
    dst_h: i32,
    dst_fmt: c_int,
  ) -> Result<Self> {
    let ptr = unsafe {
      sws_getContext(
        src_w,
        src_h,
        src_fmt,
        dst_w,
        dst_h,
        dst_fmt,
        SWS_BILINEAR,
        std::ptr::null_mut(),
        std::ptr::null_mut(),
        std::ptr::null(),
      )
    };

    NonNull::new(ptr)
      .map(|ptr| Self {
        ptr,
        src_height: src_h,
      })
      .ok_or_else(|| {
        log::error!("sws_getContext failed");
        Error::ResourceAlloc
      })
  }

  /// Raw context pointer for plane-level scale calls
  #[inline]
  pub fn as_ptr(&self) -> *mut SwsContext {
    self.ptr.as_ptr()
  }

  /// Source height rows fed per scale operation
  #[inline]
  pub fn src_height(&self) -> c_int {
    self.src_height
  }

  /// Convert between two backend frames (the producer-thread path)
  ///
  /// Returns the produced row count.
  pub fn scale_raw(&self, src: &super::frame::RawFrame, dst: &mut super::frame::RawFrame) -> Result<i32> {
    let src_data: [*const u8; 4] = [
      src.data(0) as *const u8,
      src.data(1) as *const u8,
      src.data(2) as *const u8,
      src.data(3) as *const u8,
    ];
    let src_linesize: [c_int; 4] = [
      src.linesize(0),
      src.linesize(1),
      src.linesize(2),
      src.linesize(3),
    ];
    let dst_data: [*mut u8; 4] = [dst.data(0), dst.data(1), dst.data(2), dst.data(3)];
    let dst_linesize: [c_int; 4] = [
      dst.linesize(0),
      dst.linesize(1),
      dst.linesize(2),
      dst.linesize(3),
    ];

    let rows = unsafe {
      sws_scale(
        self.ptr.as_ptr(),
        src_data.as_ptr(),
        src_linesize.as_ptr(),
        0,
        self.src_height,
        dst_data.as_ptr(),
        dst_linesize.as_ptr(),
      )
    };
    if rows < 0 {
      log::error!("sws_scale failed: {}", rows);
      return Err(Error::ResourceAlloc);
    }
    Ok(rows)
  }

  /// Convert `src` into `dst`, writing through the destination frame's
  /// backend planes and updating its public mirror arrays
  ///
  /// The destination must be a frame with image memory (a conversion pool
  /// slot); its height is set to the scaler's returned row count.
  pub fn scale(&self, src: &VideoFrame, dst: &mut VideoFrame) -> Result<()> {
    if src.data[0].is_null() {
      log::error!("The source plane address is null");
      return Err(Error::NullPointer);
    }

    let dst_frame = dst.backend_frame();
    if dst_frame.data(0).is_null() {
      log::error!("The destination plane address is null");
      return Err(Error::NullPointer);
    }

    let src_data: [*const u8; 4] = [
      src.data[0] as *const u8,
      src.data[1] as *const u8,
      src.data[2] as *const u8,
      src.data[3] as *const u8,
    ];
    let src_linesize: [c_int; 4] = [
      src.linesize[0],
      src.linesize[1],
      src.linesize[2],
      src.linesize[3],
    ];
    let dst_data: [*mut u8; 4] = [
      dst_frame.data(0),
      dst_frame.data(1),
      dst_frame.data(2),
      dst_frame.data(3),
    ];
    let dst_linesize: [c_int; 4] = [
      dst_frame.linesize(0),
      dst_frame.linesize(1),
      dst_frame.linesize(2),
      dst_frame.linesize(3),
    ];

    let rows = unsafe {
      sws_scale(
        self.ptr.as_ptr(),
        src_data.as_ptr(),
        src_linesize.as_ptr(),
        0,
        src.height,
        dst_data.as_ptr(),
        dst_linesize.as_ptr(),
      )
    };
    if rows < 0 {
      log::error!("sws_scale failed: {}", rows);
      return Err(Error::ResourceAlloc);
    }

    dst.height = rows;
    dst.mirror_backend_planes();
    Ok(())
  }
}

impl Drop for Scaler {
  fn drop(&mut self) {
    unsafe { sws_freeContext(self.ptr.as_ptr()) }
  }
}

impl std::fmt::Debug for Scaler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Scaler")
      .field("src_height", &self.src_height)
      .finish()
  }
}

// SAFETY: the scaler context is used by one thread at a time; the producer
// owns it for the pipeline's lifetime
unsafe impl Send for Scaler {}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::frame::ImageSpec;

  #[test]
  fn test_invalid_formats_are_rejected() {
    assert_eq!(
      Scaler::new(64, 64, PixelFormat::None, 64, 64, PixelFormat::Yuv420p).unwrap_err(),
      Error::Args
    );
    assert_eq!(
      Scaler::new(64, 64, PixelFormat::Yuv420p, 64, 64, PixelFormat::None).unwrap_err(),
      Error::Args
    );
  }

  #[test]
  fn test_scale_rejects_null_source_plane() {
    let scaler =
      Scaler::new(64, 64, PixelFormat::Yuv420p, 32, 32, PixelFormat::Yuv420p).unwrap();

    // A frame without image memory carries only null plane pointers
    let src = VideoFrame::alloc(None).unwrap();
    let mut dst =
      VideoFrame::alloc(Some(&ImageSpec::new(32, 32, 0, PixelFormat::Yuv420p))).unwrap();

    assert_eq!(scaler.scale(&src, &mut dst).unwrap_err(), Error::NullPointer);
  }

  #[test]
  fn test_scale_rejects_null_destination_plane() {
    let scaler =
      Scaler::new(64, 64, PixelFormat::Yuv420p, 32, 32, PixelFormat::Yuv420p).unwrap();

    let src =
      VideoFrame::alloc(Some(&ImageSpec::new(64, 64, 0, PixelFormat::Yuv420p))).unwrap();
    // The destination must bring its own backend plane memory
    let mut dst = VideoFrame::alloc(None).unwrap();

    assert_eq!(scaler.scale(&src, &mut dst).unwrap_err(), Error::NullPointer);
  }

  #[test]
  fn test_scale_sets_height_and_mirrors_planes() {
    let scaler =
      Scaler::new(64, 64, PixelFormat::Yuv420p, 32, 32, PixelFormat::Yuv420p).unwrap();

    let src =
      VideoFrame::alloc(Some(&ImageSpec::new(64, 64, 0, PixelFormat::Yuv420p))).unwrap();
    let mut dst =
      VideoFrame::alloc(Some(&ImageSpec::new(32, 32, 0, PixelFormat::Yuv420p))).unwrap();

    scaler.scale(&src, &mut dst).unwrap();

    // Height comes from the scaler's returned row count; the public arrays
    // mirror the backend planes that were written
    assert_eq!(dst.height, 32);
    assert!(!dst.data[0].is_null());
    assert!(dst.linesize[0] >= 32);
  }
}

