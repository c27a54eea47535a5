//! libavcodec function declarations
//!
//! Provides encoding and decoding functionality.

use super::types::*;
use std::os::raw::c_int;

unsafe extern "C" {
  // ========================================================================
  // Codec Discovery
  // ========================================================================

  /// Find an encoder by codec ID
  pub fn avcodec_find_encoder(id: c_int) -> *const AVCodec;

  /// Find a decoder by codec ID
  pub fn avcodec_find_decoder(id: c_int) -> *const AVCodec;

  // ========================================================================
  // Codec Context Lifecycle
  // ========================================================================

  /// Allocate an AVCodecContext and set its fields to default values
  pub fn avcodec_alloc_context3(codec: *const AVCodec) -> *mut AVCodecContext;

  /// Free the codec context and everything associated with it
  pub fn avcodec_free_context(avctx: *mut *mut AVCodecContext);

  /// Initialize the AVCodecContext to use the given AVCodec
  pub fn avcodec_open2(
    avctx: *mut AVCodecContext,
    codec: *const AVCodec,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  // ========================================================================
  // Encoding (send frame, receive packet)
  // ========================================================================

  /// Supply a raw video frame to the encoder
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) - output not available, must read with receive_packet first
  /// * AVERROR_EOF - encoder has been flushed, no more output
  /// * AVERROR(EINVAL) - codec not opened, or requires flush
  /// * AVERROR(ENOMEM) - failed to add packet to queue
  pub fn avcodec_send_frame(avctx: *mut AVCodecContext, frame: *const AVFrame) -> c_int;

  /// Read encoded data from the encoder
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) - output not available, must send more input
  /// * AVERROR_EOF - encoder has been fully flushed
  /// * AVERROR(EINVAL) - codec not opened
  pub fn avcodec_receive_packet(avctx: *mut AVCodecContext, avpkt: *mut AVPacket) -> c_int;

  // ========================================================================
  // Decoding (send packet, receive frame)
  // ========================================================================

  /// Supply raw packet data to the decoder
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) - output not available, must read with receive_frame first
  /// * AVERROR_EOF - decoder has been flushed
  /// * AVERROR(EINVAL) - codec not opened
  /// * AVERROR(ENOMEM) - failed to add packet to queue
  pub fn avcodec_send_packet(avctx: *mut AVCodecContext, avpkt: *const AVPacket) -> c_int;

  /// Return decoded output data from the decoder
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) - output not available, must send more input
  /// * AVERROR_EOF - decoder has been fully flushed
  /// * AVERROR(EINVAL) - codec not opened
  pub fn avcodec_receive_frame(avctx: *mut AVCodecContext, frame: *mut AVFrame) -> c_int;

  // ========================================================================
  // Codec Control
  // ========================================================================

  /// Reset the internal codec state / flush internal buffers
  /// Should be called when seeking or switching to a different stream
  pub fn avcodec_flush_buffers(avctx: *mut AVCodecContext);

  // ========================================================================
  // Packet Management
  // ========================================================================

  /// Allocate an AVPacket and set its fields to default values
  pub fn av_packet_alloc() -> *mut AVPacket;

  /// Free the packet, if the packet is reference counted, it will be unreferenced first
  pub fn av_packet_free(pkt: *mut *mut AVPacket);

  /// Wipe the packet. Unreference the buffer and reset fields to defaults
  pub fn av_packet_unref(pkt: *mut AVPacket);
}

// ============================================================================
// Codec Flags
// ============================================================================

pub mod codec_flag {
  use std::os::raw::c_int;

  /// Place global headers in extradata instead of every keyframe
  pub const GLOBAL_HEADER: c_int = 1 << 22;
}
