//! Mux/encode primitives wrapper
//!
//! RAII wrapper around the output AVFormatContext, its single video stream,
//! and the encoder AVCodecContext. Handles the `no-file` protocol split: for
//! formats without AVFMT_NOFILE the AVIO context is opened here in write
//! mode; protocols like RTMP or SRT connect later during header write.

use std::ffi::CString;
use std::os::raw::{c_int, c_void};
use std::ptr::{self, NonNull};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::ffi::accessors::{
  ffctx_get_flags, ffctx_get_framerate, ffctx_get_priv_data, ffctx_get_time_base,
  ffctx_set_bit_rate, ffctx_set_codec_id, ffctx_set_flags, ffctx_set_framerate,
  ffctx_set_gop_size, ffctx_set_height, ffctx_set_max_b_frames, ffctx_set_pix_fmt,
  ffctx_set_thread_count, ffctx_set_time_base, ffctx_set_width, fffmt_get_oformat_flags,
  fffmt_get_pb, fffmt_set_pb, ffstream_get_codecpar, ffstream_get_index, ffstream_get_time_base,
  ffstream_set_time_base,
};
use crate::ffi::avcodec::{
  avcodec_alloc_context3, avcodec_find_encoder, avcodec_free_context, avcodec_open2,
  avcodec_receive_packet, avcodec_send_frame, codec_flag,
};
use crate::ffi::avformat::{
  AVFormatContext, AVStream, av_dump_format, av_interleaved_write_frame, av_write_trailer,
  avcodec_parameters_from_context, avfmt_flag, avformat_alloc_output_context2,
  avformat_free_context, avformat_new_stream, avformat_write_header, avio_closep, avio_flag,
  avio_open,
};
use crate::ffi::error::{AVERROR_EAGAIN, AVERROR_EOF, log_av_error};
use crate::ffi::types::{AVCodec, AVCodecContext, Rational};

use super::frame::RawFrame;
use super::packet::Packet;
use super::ReceiveStatus;

// ============================================================================
// Container Formats
// ============================================================================

/// Container formats the encoder can be asked for by enum
///
/// `None` (or an invalid value) leaves the choice to the backend, which
/// guesses from the destination url.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerFormat {
  #[default]
  None,
  Avi,
  Gif,
  GifPipe,
  H264,
  Hevc,
  Image2,
  Image2Pipe,
  M4v,
  Mjpeg,
  Mov,
  Mp3,
  Mp4,
  Mpeg2Video,
  Mpegts,
  Mpegtsraw,
}

impl ContainerFormat {
  /// The backend's canonical short name, or `None` for the unset marker
  pub fn short_name(&self) -> Option<&'static str> {
    match self {
      ContainerFormat::None => None,
      ContainerFormat::Avi => Some("avi"),
      ContainerFormat::Gif => Some("gif"),
      ContainerFormat::GifPipe => Some("gif_pipe"),
      ContainerFormat::H264 => Some("h264"),
      ContainerFormat::Hevc => Some("hevc"),
      ContainerFormat::Image2 => Some("image2"),
      ContainerFormat::Image2Pipe => Some("image2pipe"),
      ContainerFormat::M4v => Some("m4v"),
      ContainerFormat::Mjpeg => Some("mjpeg"),
      ContainerFormat::Mov => Some("mov"),
      ContainerFormat::Mp3 => Some("mp3"),
      ContainerFormat::Mp4 => Some("mp4"),
      ContainerFormat::Mpeg2Video => Some("mpeg2video"),
      ContainerFormat::Mpegts => Some("mpegts"),
      ContainerFormat::Mpegtsraw => Some("mpegtsraw"),
    }
  }
}

// ============================================================================
// Encoder Context Parameters
// ============================================================================

/// Resolved fields copied onto the encoder context
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeContextArgs {
  pub bit_rate: i64,
  pub width: i32,
  pub height: i32,
  pub frame_rate: Rational,
  pub gop_size: i32,
  pub max_b_frames: i32,
  /// Raw backend pixel format value
  pub pix_fmt: c_int,
  pub thread_count: i32,
}

// ============================================================================
// Muxer Context
// ============================================================================

/// Muxer plus encoder for one video stream
pub struct MuxerContext {
  fmt_ctx: NonNull<AVFormatContext>,
  codec: *const AVCodec,
  codec_ctx: Option<NonNull<AVCodecContext>>,
  stream: *mut AVStream,
  url: CString,
}

impl MuxerContext {
  /// Allocate the output context for `url` and open its I/O if required
  ///
  /// `cont_fmt` is the container short name; when absent the backend guesses
  /// from the url.
  pub fn init(url: &str, cont_fmt: Option<&str>) -> Result<Self> {
    let c_url = CString::new(url).map_err(|_| Error::Args)?;
    let c_fmt = match cont_fmt {
      Some(name) => Some(CString::new(name).map_err(|_| Error::Args)?),
      None => None,
    };

    let mut ctx_ptr: *mut AVFormatContext = ptr::null_mut();
    let ret = unsafe {
      avformat_alloc_output_context2(
        &mut ctx_ptr,
        ptr::null(),
        c_fmt.as_ref().map_or(ptr::null(), |f| f.as_ptr()),
        c_url.as_ptr(),
      )
    };
    if ret < 0 || ctx_ptr.is_null() {
      log_av_error("avformat_alloc_output_context2", ret);
      return Err(Error::ResourceAlloc);
    }

    info!("Encode target url: {}", url);

    // Formats whose protocol does its own I/O (RTMP, SRT, ...) carry the
    // no-file flag and connect during header write; everything else needs
    // an explicit AVIO open here.
    let oformat_flags = unsafe { fffmt_get_oformat_flags(ctx_ptr) };
    if oformat_flags & avfmt_flag::NOFILE == 0 {
      let mut pb = ptr::null_mut();
      let ret = unsafe { avio_open(&mut pb, c_url.as_ptr(), avio_flag::WRITE) };
      if ret < 0 {
        log_av_error("avio_open", ret);
        unsafe { avformat_free_context(ctx_ptr) };
        return Err(Error::ResourceAlloc);
      }
      unsafe { fffmt_set_pb(ctx_ptr, pb) };
      debug!("Successfully opened AVIO for: {}", url);
    } else {
      debug!("Format does not require explicit avio_open for: {}", url);
    }

    Ok(Self {
      fmt_ctx: unsafe { NonNull::new_unchecked(ctx_ptr) },
      codec: ptr::null(),
      codec_ctx: None,
      stream: ptr::null_mut(),
      url: c_url,
    })
  }

  /// Locate the encoder, create the stream, and populate the codec context
  pub fn ctx_alloc(&mut self, args: &EncodeContextArgs, codec_id: c_int) -> Result<()> {
    let codec = unsafe { avcodec_find_encoder(codec_id) };
    if codec.is_null() {
      log::error!("avcodec_find_encoder, codec_id: {}", codec_id);
      return Err(Error::ResourceAlloc);
    }
    self.codec = codec;

    let stream = unsafe { avformat_new_stream(self.fmt_ctx.as_ptr(), codec) };
    if stream.is_null() {
      log::error!("avformat_new_stream failed");
      return Err(Error::ResourceAlloc);
    }
    self.stream = stream;

    let ctx = unsafe { avcodec_alloc_context3(codec) };
    if ctx.is_null() {
      log::error!("avcodec_alloc_context3 failed");
      return Err(Error::ResourceAlloc);
    }

    unsafe {
      ffctx_set_codec_id(ctx, codec_id);
      ffctx_set_bit_rate(ctx, args.bit_rate);
      ffctx_set_width(ctx, args.width);
      ffctx_set_height(ctx, args.height);
      // The encoder ticks once per frame; the muxer may rescale later
      ffctx_set_time_base(ctx, 1, args.frame_rate.num);
      ffctx_set_framerate(ctx, args.frame_rate.num, args.frame_rate.den);
      ffctx_set_gop_size(ctx, args.gop_size);
      ffctx_set_max_b_frames(ctx, args.max_b_frames);
      ffctx_set_pix_fmt(ctx, args.pix_fmt);
      ffctx_set_thread_count(ctx, args.thread_count);

      let oformat_flags = fffmt_get_oformat_flags(self.fmt_ctx.as_ptr());
      if oformat_flags & avfmt_flag::GLOBALHEADER != 0 {
        let flags = ffctx_get_flags(ctx);
        ffctx_set_flags(ctx, flags | codec_flag::GLOBAL_HEADER);
      }
    }

    self.codec_ctx = Some(unsafe { NonNull::new_unchecked(ctx) });
    Ok(())
  }

  /// The encoder's private option area (valid after `ctx_alloc`)
  pub fn codec_priv_data(&mut self) -> Option<*mut c_void> {
    self
      .codec_ctx
      .map(|c| unsafe { ffctx_get_priv_data(c.as_ptr()) })
  }

  /// Open the encoder and mirror its parameters onto the stream
  pub fn open(&mut self) -> Result<()> {
    let ctx = self.codec_ctx.ok_or(Error::NotInit)?;

    let ret = unsafe { avcodec_open2(ctx.as_ptr(), self.codec, ptr::null_mut()) };
    if ret < 0 {
      log_av_error("avcodec_open2", ret);
      return Err(Error::ResourceAlloc);
    }

    let codecpar = unsafe { ffstream_get_codecpar(self.stream) };
    let ret = unsafe { avcodec_parameters_from_context(codecpar, ctx.as_ptr()) };
    if ret < 0 {
      log_av_error("avcodec_parameters_from_context", ret);
      return Err(Error::ResourceAlloc);
    }

    let mut tb = Rational::default();
    unsafe {
      ffctx_get_time_base(ctx.as_ptr(), &mut tb.num, &mut tb.den);
      ffstream_set_time_base(self.stream, tb.num, tb.den);
      av_dump_format(self.fmt_ctx.as_ptr(), 0, self.url.as_ptr(), 1);
    }

    Ok(())
  }

  // ========================================================================
  // Mux Loop Primitives
  // ========================================================================

  /// Write the container header
  pub fn write_header(&mut self) -> Result<()> {
    let ret = unsafe { avformat_write_header(self.fmt_ctx.as_ptr(), ptr::null_mut()) };
    if ret < 0 {
      log_av_error("avformat_write_header", ret);
      return Err(Error::FileWrite);
    }
    Ok(())
  }

  /// Send a frame (or a flush when `frame` is `None`) to the encoder
  pub fn send_frame(&mut self, frame: Option<&RawFrame>) -> Result<ReceiveStatus> {
    let ctx = self.codec_ctx.ok_or(Error::NotInit)?;
    let frame_ptr = frame.map_or(ptr::null(), |f| f.as_ptr());
    let ret = unsafe { avcodec_send_frame(ctx.as_ptr(), frame_ptr) };
    if ret == 0 {
      return Ok(ReceiveStatus::Frame);
    }
    if ret == AVERROR_EAGAIN {
      return Ok(ReceiveStatus::Again);
    }
    if ret == AVERROR_EOF {
      return Ok(ReceiveStatus::Eof);
    }
    log_av_error("avcodec_send_frame", ret);
    Err(Error::ResourceAlloc)
  }

  /// Pull one compressed packet out of the encoder
  pub fn receive_packet(&mut self, pkt: &mut Packet) -> Result<ReceiveStatus> {
    let ctx = self.codec_ctx.ok_or(Error::NotInit)?;
    let ret = unsafe { avcodec_receive_packet(ctx.as_ptr(), pkt.as_mut_ptr()) };
    if ret == 0 {
      return Ok(ReceiveStatus::Frame);
    }
    if ret == AVERROR_EAGAIN {
      return Ok(ReceiveStatus::Again);
    }
    if ret == AVERROR_EOF {
      return Ok(ReceiveStatus::Eof);
    }
    log_av_error("avcodec_receive_packet", ret);
    Err(Error::ResourceAlloc)
  }

  /// Interleaved write of one packet to the container
  pub fn write_interleaved(&mut self, pkt: &mut Packet) -> Result<()> {
    let ret = unsafe { av_interleaved_write_frame(self.fmt_ctx.as_ptr(), pkt.as_mut_ptr()) };
    if ret < 0 {
      log_av_error("av_interleaved_write_frame", ret);
      return Err(Error::FileWrite);
    }
    Ok(())
  }

  /// Write the container trailer
  pub fn write_trailer(&mut self) -> Result<()> {
    let ret = unsafe { av_write_trailer(self.fmt_ctx.as_ptr()) };
    if ret < 0 {
      log_av_error("av_write_trailer", ret);
      return Err(Error::FileWrite);
    }
    Ok(())
  }

  // ========================================================================
  // Properties
  // ========================================================================

  /// Index of the created stream
  pub fn stream_index(&self) -> i32 {
    if self.stream.is_null() {
      return -1;
    }
    unsafe { ffstream_get_index(self.stream) }
  }

  /// Time base of the created stream (authoritative after header write)
  pub fn stream_time_base(&self) -> Rational {
    let mut r = Rational::default();
    if !self.stream.is_null() {
      unsafe { ffstream_get_time_base(self.stream, &mut r.num, &mut r.den) };
    }
    r
  }

  /// Frame rate configured on the encoder context
  pub fn framerate(&self) -> Rational {
    let mut r = Rational::default();
    if let Some(c) = self.codec_ctx {
      unsafe { ffctx_get_framerate(c.as_ptr(), &mut r.num, &mut r.den) };
    }
    r
  }

  /// Free the encoder context, keeping the muxer itself alive
  pub fn close_codec(&mut self) {
    if let Some(ctx) = self.codec_ctx.take() {
      let mut ptr = ctx.as_ptr();
      unsafe { avcodec_free_context(&mut ptr) };
    }
  }
}

impl Drop for MuxerContext {
  fn drop(&mut self) {
    self.close_codec();

    unsafe {
      let fc = self.fmt_ctx.as_ptr();
      let oformat_flags = fffmt_get_oformat_flags(fc);
      let pb = fffmt_get_pb(fc);
      if !pb.is_null() && oformat_flags & avfmt_flag::NOFILE == 0 {
        let mut pb = pb;
        avio_closep(&mut pb);
        fffmt_set_pb(fc, ptr::null_mut());
      }
      avformat_free_context(fc);
    }
  }
}

// SAFETY: MuxerContext owns all its resources and can be safely sent between
// threads; concurrent access is serialized by the pipeline's shared mutex
unsafe impl Send for MuxerContext {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_container_short_names() {
    assert_eq!(ContainerFormat::Mp4.short_name(), Some("mp4"));
    assert_eq!(ContainerFormat::Mpegts.short_name(), Some("mpegts"));
    assert_eq!(ContainerFormat::Image2Pipe.short_name(), Some("image2pipe"));
    assert_eq!(ContainerFormat::GifPipe.short_name(), Some("gif_pipe"));
    assert_eq!(ContainerFormat::None.short_name(), None);
  }

  #[test]
  fn test_container_default_is_none() {
    assert_eq!(ContainerFormat::default(), ContainerFormat::None);
  }
}
