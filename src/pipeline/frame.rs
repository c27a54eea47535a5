//! The pool-managed frame handed across the public surface
//!
//! A `VideoFrame` mirrors the backend frame it wraps: width, height, format,
//! timestamps, and the plane/stride arrays are plain public fields, while the
//! backend handle, the image-memory ownership flag, and the in-band slot
//! state stay private. Exactly one queue (or in-flight holder) owns a frame
//! at any instant.

use std::os::raw::{c_int, c_void};

use log::debug;

use crate::codec::frame::RawFrame;
use crate::error::{Error, Result};
use crate::ffi::avutil::{av_freep, av_image_alloc, default_image_align};
use crate::ffi::types::{AV_NOPTS_VALUE, AV_NUM_DATA_POINTERS, PixelFormat, Rational};

/// The number of plane slots a frame carries
pub const MAX_PLANES: usize = AV_NUM_DATA_POINTERS;

// ============================================================================
// Image Descriptor
// ============================================================================

/// Geometry and layout of an image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
  /// Width in pixels
  pub width: i32,
  /// Height in pixels
  pub height: i32,
  /// Buffer-row alignment; values <= 0 select a CPU-driven default
  pub align: i32,
  /// Pixel format
  pub format: PixelFormat,
}

impl ImageSpec {
  pub fn new(width: i32, height: i32, align: i32, format: PixelFormat) -> Self {
    Self {
      width,
      height,
      align,
      format,
    }
  }

  /// The effective alignment, resolving <= 0 through the CPU vector width
  pub fn resolved_align(&self) -> i32 {
    if self.align <= 0 {
      default_image_align()
    } else {
      self.align
    }
  }
}

// ============================================================================
// Slot State
// ============================================================================

/// In-band control state tunneled through the ready queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SlotState {
  /// An ordinary frame
  #[default]
  Null,
  /// The producer exhausted the current url
  EndOfUrl,
}

// ============================================================================
// Video Frame
// ============================================================================

/// A decoded frame (or an encoder input frame)
///
/// Frames returned by a decoder must go back to it via `result_free`;
/// standalone frames allocated with [`VideoFrame::alloc`] free themselves on
/// drop.
pub struct VideoFrame {
  /// Width and height in pixels
  pub width: i32,
  pub height: i32,
  /// Pixel format
  pub format: PixelFormat,
  /// Presentation timestamp in time_base units
  pub pts: i64,
  /// DTS copied from the packet that produced this frame
  pub pkt_dts: i64,
  /// Time base for the timestamps in this frame
  pub time_base: Rational,
  /// Plane strides
  pub linesize: [i32; MAX_PLANES],
  /// Plane data pointers
  pub data: [*mut u8; MAX_PLANES],

  /// Wrapped backend frame
  av_frame: RawFrame,
  /// True iff this frame owns backend-allocated plane memory
  has_img_mem: bool,
  /// In-band control state (pool slots only)
  state: SlotState,
}

impl VideoFrame {
  /// Allocate a frame, with backend image memory when `img` is given
  ///
  /// Without a descriptor only the frame skeleton and the backend frame
  /// handle exist; with one, plane memory sized to (w, h, format, align) is
  /// allocated through the backend and mirrored into the public arrays.
  pub fn alloc(img: Option<&ImageSpec>) -> Result<Box<VideoFrame>> {
    let av_frame = RawFrame::new()?;

    let mut frame = Box::new(VideoFrame {
      width: 0,
      height: 0,
      format: PixelFormat::None,
      pts: 0,
      pkt_dts: 0,
      time_base: Rational::default(),
      linesize: [0; MAX_PLANES],
      data: [std::ptr::null_mut(); MAX_PLANES],
      av_frame,
      has_img_mem: false,
      state: SlotState::Null,
    });

    let Some(img) = img else {
      debug!("No image descriptor given, frame allocated without image memory");
      return Ok(frame);
    };

    let av_fmt = img.format.to_av().ok_or(Error::MemoryAlloc)?;

    let mut pointers: [*mut u8; MAX_PLANES] = [std::ptr::null_mut(); MAX_PLANES];
    let mut linesizes: [c_int; MAX_PLANES] = [0; MAX_PLANES];
    let ret = unsafe {
      av_image_alloc(
        pointers.as_mut_ptr(),
        linesizes.as_mut_ptr(),
        img.width,
        img.height,
        av_fmt,
        img.resolved_align(),
      )
    };
    if ret < 0 {
      crate::ffi::error::log_av_error("av_image_alloc", ret);
      return Err(Error::MemoryAlloc);
    }

    frame.data = pointers;
    frame.linesize = linesizes;
    frame.width = img.width;
    frame.height = img.height;
    frame.format = img.format;
    frame.pts = AV_NOPTS_VALUE;
    frame.pkt_dts = AV_NOPTS_VALUE;
    frame.has_img_mem = true;

    // Mirror the layout into the backend frame so scale targets line up
    frame.av_frame.set_dimensions(img.width, img.height);
    frame.av_frame.set_format_raw(av_fmt);
    for plane in 0..MAX_PLANES {
      frame.av_frame.set_data(plane, pointers[plane]);
      frame.av_frame.set_linesize(plane, linesizes[plane]);
    }

    Ok(frame)
  }

  /// The wrapped backend frame
  #[inline]
  pub(crate) fn backend_frame(&self) -> &RawFrame {
    &self.av_frame
  }

  /// The wrapped backend frame, mutably
  #[inline]
  pub(crate) fn backend_frame_mut(&mut self) -> &mut RawFrame {
    &mut self.av_frame
  }

  #[inline]
  pub(crate) fn state(&self) -> SlotState {
    self.state
  }

  #[inline]
  pub(crate) fn set_state(&mut self, state: SlotState) {
    self.state = state;
  }

  /// Copy the backend frame's linesize/data arrays into the public mirrors
  pub(crate) fn mirror_backend_planes(&mut self) {
    for plane in 0..MAX_PLANES {
      self.linesize[plane] = self.av_frame.linesize(plane);
      self.data[plane] = self.av_frame.data(plane);
    }
  }

  /// Publish the backend frame's descriptor through the public fields
  ///
  /// Fails with `Error::Args` when the backend format has no library-side
  /// mapping (the strict conversion direction).
  pub(crate) fn fill_from_backend(&mut self) -> Result<()> {
    self.width = self.av_frame.width();
    self.height = self.av_frame.height();
    self.format = PixelFormat::from_av(self.av_frame.format_raw()).ok_or(Error::Args)?;
    self.pts = self.av_frame.pts();
    self.pkt_dts = self.av_frame.pkt_dts();
    self.time_base = self.av_frame.time_base();
    self.mirror_backend_planes();
    Ok(())
  }

  /// Copy this frame's descriptor into a backend frame (the encoder path)
  pub(crate) fn copy_to_backend(&self, dst: &mut RawFrame) -> Result<()> {
    let av_fmt = self.format.to_av().ok_or(Error::Args)?;
    dst.set_dimensions(self.width, self.height);
    dst.set_format_raw(av_fmt);
    dst.set_pts(self.pts);
    dst.set_pkt_dts(self.pkt_dts);
    dst.set_time_base(self.time_base);
    for plane in 0..MAX_PLANES {
      dst.set_data(plane, self.data[plane]);
      dst.set_linesize(plane, self.linesize[plane]);
    }
    Ok(())
  }
}

impl Drop for VideoFrame {
  fn drop(&mut self) {
    if self.has_img_mem {
      self.has_img_mem = false;
      // The image is one backend allocation rooted at plane 0
      if !self.data[0].is_null() {
        unsafe { av_freep(&mut self.data[0] as *mut *mut u8 as *mut c_void) };
      }
    }
    // The wrapped RawFrame frees itself
  }
}

// SAFETY: a frame is owned by exactly one queue or holder at a time; the
// plane pointers move with that ownership
unsafe impl Send for VideoFrame {}

impl std::fmt::Debug for VideoFrame {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("VideoFrame")
      .field("width", &self.width)
      .field("height", &self.height)
      .field("format", &self.format)
      .field("pts", &self.pts)
      .field("has_img_mem", &self.has_img_mem)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_image_spec_align_default() {
    let img = ImageSpec::new(1920, 1080, 0, PixelFormat::Yuv420p);
    let align = img.resolved_align();
    assert!(matches!(align, 16 | 32 | 64));

    let img = ImageSpec::new(1920, 1080, 16, PixelFormat::Yuv420p);
    assert_eq!(img.resolved_align(), 16);
  }

  #[test]
  fn test_slot_state_default() {
    assert_eq!(SlotState::default(), SlotState::Null);
  }
}
