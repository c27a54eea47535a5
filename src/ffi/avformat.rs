//! libavformat function declarations
//!
//! Provides muxing and demuxing functionality for container formats.

use super::types::*;
use std::os::raw::{c_char, c_int};

// ============================================================================
// Opaque Types (format-specific)
// ============================================================================

/// Opaque AVFormatContext structure (muxer/demuxer context)
#[repr(C)]
pub struct AVFormatContext {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVOutputFormat structure (output format descriptor)
#[repr(C)]
pub struct AVOutputFormat {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVInputFormat structure (input format descriptor)
#[repr(C)]
pub struct AVInputFormat {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVIOContext structure (I/O abstraction)
#[repr(C)]
pub struct AVIOContext {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVStream structure (stream within container)
#[repr(C)]
pub struct AVStream {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVCodecParameters structure (stream codec parameters)
#[repr(C)]
pub struct AVCodecParameters {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

unsafe extern "C" {
  // ========================================================================
  // Input Context (Demuxing)
  // ========================================================================

  /// Allocate an AVFormatContext
  ///
  /// Must be freed with avformat_free_context() or avformat_close_input()
  pub fn avformat_alloc_context() -> *mut AVFormatContext;

  /// Free an AVFormatContext and all its streams
  ///
  /// # Safety
  /// The context pointer becomes invalid after this call
  pub fn avformat_free_context(ctx: *mut AVFormatContext);

  /// Open an input stream and read the header
  ///
  /// # Arguments
  /// * `ps` - Pointer to context (will be allocated if NULL)
  /// * `url` - URL/filename to open
  /// * `fmt` - Input format (NULL for auto-detect)
  /// * `options` - Demuxer options
  ///
  /// # Returns
  /// * 0 on success
  /// * Negative AVERROR on error
  pub fn avformat_open_input(
    ps: *mut *mut AVFormatContext,
    url: *const c_char,
    fmt: *const AVInputFormat,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  /// Close an opened input AVFormatContext
  ///
  /// Frees the context and all its contents and sets *s to NULL.
  pub fn avformat_close_input(s: *mut *mut AVFormatContext);

  /// Read packets of a media file to get stream information
  ///
  /// # Returns
  /// * >= 0 on success
  /// * AVERROR_xxx on failure
  pub fn avformat_find_stream_info(
    ic: *mut AVFormatContext,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  /// Find the "best" stream in the file
  ///
  /// # Arguments
  /// * `ic` - Format context
  /// * `type_` - Stream type (AVMEDIA_TYPE_VIDEO, AVMEDIA_TYPE_AUDIO, etc.)
  /// * `wanted_stream_nb` - Desired stream number, or -1 for automatic
  /// * `related_stream` - Related stream for disposition check
  /// * `decoder_ret` - Pointer to receive the decoder (can be NULL)
  /// * `flags` - Reserved (should be 0)
  ///
  /// # Returns
  /// * >= 0 on success (stream index)
  /// * AVERROR_STREAM_NOT_FOUND if not found
  /// * AVERROR_DECODER_NOT_FOUND if decoder not found
  pub fn av_find_best_stream(
    ic: *mut AVFormatContext,
    type_: c_int,
    wanted_stream_nb: c_int,
    related_stream: c_int,
    decoder_ret: *mut *const AVCodec,
    flags: c_int,
  ) -> c_int;

  /// Return the next frame of a stream
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR_EOF at end of file
  /// * Negative AVERROR on error
  pub fn av_read_frame(s: *mut AVFormatContext, pkt: *mut AVPacket) -> c_int;

  /// Seek to timestamp with min/max constraints
  ///
  /// # Arguments
  /// * `s` - Format context
  /// * `stream_index` - Stream index
  /// * `min_ts` - Minimum acceptable timestamp
  /// * `ts` - Target timestamp
  /// * `max_ts` - Maximum acceptable timestamp
  /// * `flags` - Seek flags
  ///
  /// # Returns
  /// * >= 0 on success
  /// * Negative AVERROR on error
  pub fn avformat_seek_file(
    s: *mut AVFormatContext,
    stream_index: c_int,
    min_ts: i64,
    ts: i64,
    max_ts: i64,
    flags: c_int,
  ) -> c_int;

  // ========================================================================
  // Output Context (Muxing)
  // ========================================================================

  /// Allocate an AVFormatContext for output
  ///
  /// # Arguments
  /// * `ctx` - Pointer to receive the allocated context (set to NULL on failure)
  /// * `oformat` - Output format to use (can be NULL to auto-detect)
  /// * `format_name` - Short name of the format (e.g., "mp4", "mpegts")
  /// * `filename` - Filename for format detection (can be NULL)
  ///
  /// # Returns
  /// * >= 0 on success
  /// * AVERROR(ENOMEM) if allocation failed
  /// * AVERROR(EINVAL) if no format found
  pub fn avformat_alloc_output_context2(
    ctx: *mut *mut AVFormatContext,
    oformat: *const AVOutputFormat,
    format_name: *const c_char,
    filename: *const c_char,
  ) -> c_int;

  /// Add a new stream to the format context
  ///
  /// # Returns
  /// Pointer to newly created stream, or NULL on error
  pub fn avformat_new_stream(ctx: *mut AVFormatContext, codec: *const AVCodec) -> *mut AVStream;

  /// Write the stream header to the output file
  ///
  /// # Returns
  /// * >= 0 on success
  /// * Negative AVERROR on error
  pub fn avformat_write_header(ctx: *mut AVFormatContext, options: *mut *mut AVDictionary)
  -> c_int;

  /// Write a packet to the output file (interleaved)
  ///
  /// This function will buffer packets internally to ensure proper interleaving.
  /// Pass NULL to flush the interleaving queue.
  ///
  /// # Returns
  /// * 0 on success
  /// * Negative AVERROR on error
  pub fn av_interleaved_write_frame(ctx: *mut AVFormatContext, pkt: *mut AVPacket) -> c_int;

  /// Write the stream trailer to the output file
  ///
  /// Must be called after all packets have been written.
  ///
  /// # Returns
  /// * 0 on success
  /// * Negative AVERROR on error
  pub fn av_write_trailer(ctx: *mut AVFormatContext) -> c_int;

  /// Print detailed information about the input or output format
  pub fn av_dump_format(
    ic: *mut AVFormatContext,
    index: c_int,
    url: *const c_char,
    is_output: c_int,
  );

  // ========================================================================
  // I/O
  // ========================================================================

  /// Open a file for I/O
  ///
  /// # Returns
  /// * >= 0 on success
  /// * Negative AVERROR on error
  pub fn avio_open(s: *mut *mut AVIOContext, url: *const c_char, flags: c_int) -> c_int;

  /// Close an I/O context opened by avio_open and set the pointer to NULL
  pub fn avio_closep(s: *mut *mut AVIOContext) -> c_int;

  // ========================================================================
  // Codec Parameters
  // ========================================================================

  /// Copy codec parameters from a codec context to AVCodecParameters
  pub fn avcodec_parameters_from_context(
    par: *mut AVCodecParameters,
    codec: *const AVCodecContext,
  ) -> c_int;

  /// Fill codec context with codec parameters
  pub fn avcodec_parameters_to_context(
    codec: *mut AVCodecContext,
    par: *const AVCodecParameters,
  ) -> c_int;
}

// ============================================================================
// Constants
// ============================================================================

/// Seek flags
pub mod seek_flag {
  use std::os::raw::c_int;

  /// Seek backward
  pub const BACKWARD: c_int = 1;
  /// Seeking based on position in bytes
  pub const BYTE: c_int = 2;
  /// Seek to any frame (not just keyframes)
  pub const ANY: c_int = 4;
  /// Seeking based on frame number
  pub const FRAME: c_int = 8;
}

/// AVIO flags
pub mod avio_flag {
  use std::os::raw::c_int;

  /// Read-only
  pub const READ: c_int = 1;
  /// Write-only
  pub const WRITE: c_int = 2;
  /// Read-write
  pub const READ_WRITE: c_int = READ | WRITE;
}

/// Media types (for av_find_best_stream)
pub mod media_type {
  use std::os::raw::c_int;

  pub const UNKNOWN: c_int = -1;
  pub const VIDEO: c_int = 0;
  pub const AUDIO: c_int = 1;
  pub const DATA: c_int = 2;
  pub const SUBTITLE: c_int = 3;
  pub const ATTACHMENT: c_int = 4;
}

/// Output format flags
pub mod avfmt_flag {
  use std::os::raw::c_int;

  /// The format's protocol handles its own I/O; no avio_open needed
  pub const NOFILE: c_int = 0x0001;
  /// Format wants global headers in the codec extradata
  pub const GLOBALHEADER: c_int = 0x0040;
}
