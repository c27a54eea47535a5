//! Demux/decode primitives wrapper
//!
//! RAII wrapper around the demuxer (AVFormatContext) and the video decoder
//! (AVCodecContext) opened on its best stream, plus the reusable packet and
//! scratch frame the producer loop cycles through.

use std::ffi::CString;
use std::os::raw::c_int;
use std::ptr::{self, NonNull};

use log::info;

use crate::error::{Error, Result};
use crate::ffi::accessors::{
  ffctx_get_bit_rate, ffctx_get_codec_id, ffctx_get_framerate, ffctx_get_gop_size,
  ffctx_get_height, ffctx_get_max_b_frames, ffctx_get_pix_fmt, ffctx_get_width,
  ffctx_set_thread_count, fffmt_get_duration, fffmt_get_stream, ffstream_get_codecpar,
  ffstream_get_time_base,
};
use crate::ffi::avcodec::{
  avcodec_alloc_context3, avcodec_flush_buffers, avcodec_free_context, avcodec_open2,
  avcodec_receive_frame, avcodec_send_packet,
};
use crate::ffi::avformat::{
  AVFormatContext, av_find_best_stream, av_read_frame, avcodec_parameters_to_context,
  avformat_alloc_context, avformat_close_input, avformat_find_stream_info, avformat_open_input,
  avformat_seek_file, seek_flag,
};
use crate::ffi::error::{AVERROR_EAGAIN, AVERROR_EOF, log_av_debug, log_av_error};
use crate::ffi::types::{AVCodecContext, Rational};

use super::ReceiveStatus;
use super::frame::RawFrame;
use super::packet::Packet;

/// Decoder configuration knobs applied when the stream is opened
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeStreamArgs {
  /// Number of decoder threads; 0 selects the backend default
  pub thread_count: i32,
}

/// Outcome of one packet read from the demuxer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
  /// A packet is ready in the reusable packet buffer
  Packet,
  /// The demuxer reached the end of the url
  Eof,
}

/// Demuxer plus decoder for one selected stream
pub struct DemuxerContext {
  fmt_ctx: NonNull<AVFormatContext>,
  codec_ctx: Option<NonNull<AVCodecContext>>,
  stream_index: i32,
  pkt: Option<Packet>,
  scratch: Option<RawFrame>,
}

impl DemuxerContext {
  /// Open an input url and read its stream information
  ///
  /// On any failure the partially constructed context unwinds in reverse
  /// order of acquisition.
  pub fn create(url: &str) -> Result<Self> {
    let c_url = CString::new(url).map_err(|_| Error::Args)?;

    let mut ctx_ptr = unsafe { avformat_alloc_context() };
    if ctx_ptr.is_null() {
      log::error!("avformat_alloc_context failed");
      return Err(Error::ResourceAlloc);
    }

    let ret =
      unsafe { avformat_open_input(&mut ctx_ptr, c_url.as_ptr(), ptr::null(), ptr::null_mut()) };
    if ret < 0 {
      log_av_error("avformat_open_input", ret);
      // avformat_open_input frees the context on failure
      return Err(Error::ResourceAlloc);
    }

    let ret = unsafe { avformat_find_stream_info(ctx_ptr, ptr::null_mut()) };
    if ret < 0 {
      log_av_error("avformat_find_stream_info", ret);
      unsafe { avformat_close_input(&mut ctx_ptr) };
      return Err(Error::ResourceAlloc);
    }

    info!("Decode input url: {}", url);
    Ok(Self {
      fmt_ctx: unsafe { NonNull::new_unchecked(ctx_ptr) },
      codec_ctx: None,
      stream_index: -1,
      pkt: None,
      scratch: None,
    })
  }

  /// Select the best stream of `media_type` and open a decoder on it
  pub fn open_stream(&mut self, media_type: c_int, args: &DecodeStreamArgs) -> Result<()> {
    let ret = unsafe {
      av_find_best_stream(
        self.fmt_ctx.as_ptr(),
        media_type,
        -1,
        -1,
        ptr::null_mut(),
        0,
      )
    };
    if ret < 0 {
      log_av_error("av_find_best_stream", ret);
      return Err(Error::Args);
    }
    let stream_index = ret;

    let stream = unsafe { fffmt_get_stream(self.fmt_ctx.as_ptr(), stream_index) };
    if stream.is_null() {
      return Err(Error::ResourceAlloc);
    }
    let codecpar = unsafe { ffstream_get_codecpar(stream) };

    // A NULL codec makes avcodec_alloc_context3 return a generic context;
    // the decoder is resolved from the copied parameters below.
    let codec_id = {
      let mut ctx = unsafe { avcodec_alloc_context3(ptr::null()) };
      if ctx.is_null() {
        log::error!("avcodec_alloc_context3 failed");
        return Err(Error::ResourceAlloc);
      }

      let ret = unsafe { avcodec_parameters_to_context(ctx, codecpar) };
      if ret < 0 {
        log_av_error("avcodec_parameters_to_context", ret);
        unsafe { avcodec_free_context(&mut ctx) };
        return Err(Error::ResourceAlloc);
      }

      if args.thread_count != 0 {
        unsafe { ffctx_set_thread_count(ctx, args.thread_count) };
      }

      let id = unsafe { ffctx_get_codec_id(ctx) };
      let codec = unsafe { crate::ffi::avcodec::avcodec_find_decoder(id) };
      if codec.is_null() {
        log::error!("avcodec_find_decoder, codec_id: {}", id);
        unsafe { avcodec_free_context(&mut ctx) };
        return Err(Error::ResourceAlloc);
      }

      let ret = unsafe { avcodec_open2(ctx, codec, ptr::null_mut()) };
      if ret < 0 {
        log_av_error("avcodec_open2", ret);
        unsafe { avcodec_free_context(&mut ctx) };
        return Err(Error::ResourceAlloc);
      }

      self.codec_ctx = Some(unsafe { NonNull::new_unchecked(ctx) });
      id
    };

    self.stream_index = stream_index;
    info!(
      "Decoder opened on stream {} (codec id {})",
      stream_index, codec_id
    );
    Ok(())
  }

  /// Allocate the reusable packet and scratch frame for the decode loop
  pub fn alloc_buffers(&mut self) -> Result<()> {
    let scratch = RawFrame::new()?;
    let pkt = Packet::new()?;
    self.scratch = Some(scratch);
    self.pkt = Some(pkt);
    Ok(())
  }

  // ========================================================================
  // Decode Loop Primitives
  // ========================================================================

  /// Read the next packet into the reusable packet buffer
  pub fn read_frame(&mut self) -> Result<ReadStatus> {
    let pkt = self.pkt.as_mut().ok_or(Error::NotInit)?;
    let ret = unsafe { av_read_frame(self.fmt_ctx.as_ptr(), pkt.as_mut_ptr()) };
    if ret == 0 {
      return Ok(ReadStatus::Packet);
    }
    if ret == AVERROR_EOF {
      return Ok(ReadStatus::Eof);
    }
    log_av_error("av_read_frame", ret);
    Err(Error::FileRead)
  }

  /// Send the reusable packet to the decoder
  pub fn send_packet(&mut self) -> Result<ReceiveStatus> {
    let codec_ctx = self.codec_ctx.ok_or(Error::NotInit)?;
    let pkt = self.pkt.as_ref().ok_or(Error::NotInit)?;
    let ret = unsafe { avcodec_send_packet(codec_ctx.as_ptr(), pkt.as_ptr()) };
    self.map_send_ret(ret, "avcodec_send_packet")
  }

  /// Send a flush (null) packet so the decoder drains its delayed frames
  pub fn send_flush_packet(&mut self) -> Result<ReceiveStatus> {
    let codec_ctx = self.codec_ctx.ok_or(Error::NotInit)?;
    let ret = unsafe { avcodec_send_packet(codec_ctx.as_ptr(), ptr::null()) };
    self.map_send_ret(ret, "avcodec_send_packet")
  }

  fn map_send_ret(&self, ret: c_int, func: &str) -> Result<ReceiveStatus> {
    if ret == 0 {
      return Ok(ReceiveStatus::Frame);
    }
    if ret == AVERROR_EAGAIN {
      log_av_debug(func, ret);
      return Ok(ReceiveStatus::Again);
    }
    if ret == AVERROR_EOF {
      return Ok(ReceiveStatus::Eof);
    }
    log_av_error(func, ret);
    Err(Error::ResourceAlloc)
  }

  /// Receive one decoded frame into `dst`
  pub fn receive_frame(&mut self, dst: &mut RawFrame) -> Result<ReceiveStatus> {
    let codec_ctx = self.codec_ctx.ok_or(Error::NotInit)?;
    let ret = unsafe { avcodec_receive_frame(codec_ctx.as_ptr(), dst.as_mut_ptr()) };
    if ret == 0 {
      return Ok(ReceiveStatus::Frame);
    }
    if ret == AVERROR_EAGAIN {
      return Ok(ReceiveStatus::Again);
    }
    if ret == AVERROR_EOF {
      return Ok(ReceiveStatus::Eof);
    }
    log_av_error("avcodec_receive_frame", ret);
    Err(Error::ResourceAlloc)
  }

  /// Stream index carried by the reusable packet
  pub fn packet_stream_index(&self) -> i32 {
    self.pkt.as_ref().map(|p| p.stream_index()).unwrap_or(-1)
  }

  /// Unreference the reusable packet after it has been consumed
  pub fn unref_packet(&mut self) {
    if let Some(pkt) = self.pkt.as_mut() {
      pkt.unref();
    }
  }

  /// Backward-seek the demuxer and flush the decoder's internal buffers
  pub fn seek_file(&mut self, min_ts: i64, ts: i64, max_ts: i64) -> Result<()> {
    let ret = unsafe {
      avformat_seek_file(
        self.fmt_ctx.as_ptr(),
        self.stream_index,
        min_ts,
        ts,
        max_ts,
        seek_flag::BACKWARD,
      )
    };
    if ret < 0 {
      log_av_error("avformat_seek_file", ret);
      return Err(Error::FileRead);
    }
    if let Some(codec_ctx) = self.codec_ctx {
      unsafe { avcodec_flush_buffers(codec_ctx.as_ptr()) };
    }
    Ok(())
  }

  // ========================================================================
  // Stream Properties
  // ========================================================================

  /// The index of the opened stream
  #[inline]
  pub fn stream_index(&self) -> i32 {
    self.stream_index
  }

  /// Take the scratch frame out for the producer loop to own
  pub fn take_scratch(&mut self) -> Option<RawFrame> {
    self.scratch.take()
  }

  pub fn width(&self) -> i32 {
    self
      .codec_ctx
      .map(|c| unsafe { ffctx_get_width(c.as_ptr()) })
      .unwrap_or(0)
  }

  pub fn height(&self) -> i32 {
    self
      .codec_ctx
      .map(|c| unsafe { ffctx_get_height(c.as_ptr()) })
      .unwrap_or(0)
  }

  pub fn pix_fmt_raw(&self) -> c_int {
    self
      .codec_ctx
      .map(|c| unsafe { ffctx_get_pix_fmt(c.as_ptr()) })
      .unwrap_or(-1)
  }

  pub fn codec_id_raw(&self) -> c_int {
    self
      .codec_ctx
      .map(|c| unsafe { ffctx_get_codec_id(c.as_ptr()) })
      .unwrap_or(0)
  }

  pub fn bit_rate(&self) -> i64 {
    self
      .codec_ctx
      .map(|c| unsafe { ffctx_get_bit_rate(c.as_ptr()) })
      .unwrap_or(0)
  }

  pub fn framerate(&self) -> Rational {
    let mut r = Rational::default();
    if let Some(c) = self.codec_ctx {
      unsafe { ffctx_get_framerate(c.as_ptr(), &mut r.num, &mut r.den) };
    }
    r
  }

  pub fn gop_size(&self) -> i32 {
    self
      .codec_ctx
      .map(|c| unsafe { ffctx_get_gop_size(c.as_ptr()) })
      .unwrap_or(0)
  }

  pub fn max_b_frames(&self) -> i32 {
    self
      .codec_ctx
      .map(|c| unsafe { ffctx_get_max_b_frames(c.as_ptr()) })
      .unwrap_or(0)
  }

  /// Container duration in microseconds, 0 when unknown
  pub fn duration_us(&self) -> i64 {
    let duration = unsafe { fffmt_get_duration(self.fmt_ctx.as_ptr()) };
    duration.max(0)
  }

  /// Time base of the opened stream
  pub fn stream_time_base(&self) -> Rational {
    let mut r = Rational::default();
    let stream = unsafe { fffmt_get_stream(self.fmt_ctx.as_ptr(), self.stream_index) };
    if !stream.is_null() {
      unsafe { ffstream_get_time_base(stream, &mut r.num, &mut r.den) };
    }
    r
  }
}

impl Drop for DemuxerContext {
  fn drop(&mut self) {
    // Reusable buffers first, then the decoder, then the input
    self.pkt = None;
    self.scratch = None;

    if let Some(codec_ctx) = self.codec_ctx.take() {
      let mut ptr = codec_ctx.as_ptr();
      unsafe { avcodec_free_context(&mut ptr) };
    }

    // avformat_close_input also frees the context
    let mut ptr = self.fmt_ctx.as_ptr();
    unsafe { avformat_close_input(&mut ptr) };
  }
}

// SAFETY: DemuxerContext owns all its resources and can be safely sent
// between threads
unsafe impl Send for DemuxerContext {}
