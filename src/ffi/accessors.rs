//! Rust declarations for C accessor functions
//!
//! These functions provide access to FFmpeg struct fields via the thin C
//! accessor library in accessors.c.

use super::avformat::{AVFormatContext, AVIOContext, AVStream};
use super::types::*;
use std::os::raw::c_int;
use std::os::raw::c_void;

unsafe extern "C" {
  // ========================================================================
  // AVCodecContext Setters
  // ========================================================================

  pub fn ffctx_set_codec_id(ctx: *mut AVCodecContext, codec_id: c_int);
  pub fn ffctx_set_width(ctx: *mut AVCodecContext, width: c_int);
  pub fn ffctx_set_height(ctx: *mut AVCodecContext, height: c_int);
  pub fn ffctx_set_pix_fmt(ctx: *mut AVCodecContext, pix_fmt: c_int);
  pub fn ffctx_set_bit_rate(ctx: *mut AVCodecContext, bit_rate: i64);
  pub fn ffctx_set_gop_size(ctx: *mut AVCodecContext, gop_size: c_int);
  pub fn ffctx_set_max_b_frames(ctx: *mut AVCodecContext, max_b_frames: c_int);
  pub fn ffctx_set_time_base(ctx: *mut AVCodecContext, num: c_int, den: c_int);
  pub fn ffctx_set_framerate(ctx: *mut AVCodecContext, num: c_int, den: c_int);
  pub fn ffctx_set_thread_count(ctx: *mut AVCodecContext, thread_count: c_int);
  pub fn ffctx_set_flags(ctx: *mut AVCodecContext, flags: c_int);

  // ========================================================================
  // AVCodecContext Getters
  // ========================================================================

  pub fn ffctx_get_codec_id(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_width(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_height(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_pix_fmt(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_bit_rate(ctx: *const AVCodecContext) -> i64;
  pub fn ffctx_get_gop_size(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_max_b_frames(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_time_base(ctx: *const AVCodecContext, num: *mut c_int, den: *mut c_int);
  pub fn ffctx_get_framerate(ctx: *const AVCodecContext, num: *mut c_int, den: *mut c_int);
  pub fn ffctx_get_flags(ctx: *const AVCodecContext) -> c_int;

  /// Codec-private option area; target for av_opt_set on encoder options
  pub fn ffctx_get_priv_data(ctx: *mut AVCodecContext) -> *mut c_void;

  // ========================================================================
  // AVFrame Setters
  // ========================================================================

  pub fn ffframe_set_width(frame: *mut AVFrame, width: c_int);
  pub fn ffframe_set_height(frame: *mut AVFrame, height: c_int);
  pub fn ffframe_set_format(frame: *mut AVFrame, format: c_int);
  pub fn ffframe_set_pts(frame: *mut AVFrame, pts: i64);
  pub fn ffframe_set_pkt_dts(frame: *mut AVFrame, pkt_dts: i64);
  pub fn ffframe_set_time_base(frame: *mut AVFrame, num: c_int, den: c_int);
  pub fn ffframe_set_data(frame: *mut AVFrame, plane: c_int, data: *mut u8);
  pub fn ffframe_set_linesize(frame: *mut AVFrame, plane: c_int, linesize: c_int);

  // ========================================================================
  // AVFrame Getters
  // ========================================================================

  pub fn ffframe_get_width(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_height(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_format(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_pts(frame: *const AVFrame) -> i64;
  pub fn ffframe_get_pkt_dts(frame: *const AVFrame) -> i64;
  pub fn ffframe_get_time_base(frame: *const AVFrame, num: *mut c_int, den: *mut c_int);
  pub fn ffframe_data(frame: *mut AVFrame, plane: c_int) -> *mut u8;
  pub fn ffframe_linesize(frame: *const AVFrame, plane: c_int) -> c_int;

  // ========================================================================
  // AVPacket Accessors
  // ========================================================================

  pub fn ffpkt_stream_index(pkt: *const AVPacket) -> c_int;
  pub fn ffpkt_set_stream_index(pkt: *mut AVPacket, stream_index: c_int);

  // ========================================================================
  // AVFormatContext Accessors
  // ========================================================================

  pub fn fffmt_get_duration(ctx: *const AVFormatContext) -> i64;
  pub fn fffmt_get_oformat_flags(ctx: *const AVFormatContext) -> c_int;
  pub fn fffmt_get_pb(ctx: *mut AVFormatContext) -> *mut AVIOContext;
  pub fn fffmt_set_pb(ctx: *mut AVFormatContext, pb: *mut AVIOContext);
  pub fn fffmt_get_stream(ctx: *mut AVFormatContext, index: c_int) -> *mut AVStream;

  // ========================================================================
  // AVStream Accessors
  // ========================================================================

  pub fn ffstream_get_index(stream: *const AVStream) -> c_int;
  pub fn ffstream_get_codecpar(stream: *mut AVStream) -> *mut super::avformat::AVCodecParameters;
  pub fn ffstream_get_time_base(stream: *const AVStream, num: *mut c_int, den: *mut c_int);
  pub fn ffstream_set_time_base(stream: *mut AVStream, num: c_int, den: c_int);
}
