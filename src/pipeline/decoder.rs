//! The decoder core: pipeline state plus the producer thread
//!
//! A single background producer drains packets from the demuxer, pushes them
//! to the decoder, optionally rescales the output, and moves ownership of
//! finished frames through the bounded free/ready queues. End-of-url is
//! tunneled through the ready queue as an in-band slot state so the consumer
//! sees data and control in order.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::codec::demuxer::{DecodeStreamArgs, DemuxerContext, ReadStatus};
use crate::codec::frame::RawFrame;
use crate::codec::scaler::Scaler;
use crate::codec::ReceiveStatus;
use crate::error::{Error, Result};
use crate::ffi::avformat::media_type;
use crate::ffi::avutil::default_image_align;
use crate::ffi::types::{CodecId, PixelFormat, Rational};
use crate::pipeline::frame::{ImageSpec, SlotState, VideoFrame};
use crate::pipeline::pool::{FramePool, FrameQueue};
use crate::pipeline::{WakeSync, WorkerFlags};

/// Pass to `result_get` to poll without blocking
pub const TIMEOUT_NONE: u32 = 0;
/// Pass to `result_get` to block until a frame arrives
pub const TIMEOUT_INFINITE: u32 = u32::MAX;

/// How long one free-queue wait may last before the producer rechecks its
/// exit flag
const FREE_SLOT_POLL: Duration = Duration::from_millis(1);

/// Free-queue wait used while parking an end-of-url sentinel
const SENTINEL_SLOT_POLL: Duration = Duration::from_millis(2500);

// ============================================================================
// Configuration
// ============================================================================

/// Decoder configuration
#[derive(Debug, Clone)]
pub struct DecodeArgs {
  /// Number of pooled result frames, clamped into 1..=1024
  pub cache_count: u16,
  /// Decoder thread count; 0 selects the backend default
  pub thread_count: i32,
  /// Optional conversion target; `None` emits frames in the source format
  ///
  /// Invalid fields fall back to the source stream's values (or, for the
  /// alignment, to the CPU-driven default).
  pub fmt_cvt_img: Option<ImageSpec>,
}

impl Default for DecodeArgs {
  fn default() -> Self {
    Self {
      cache_count: 1,
      thread_count: 0,
      fmt_cvt_img: None,
    }
  }
}

/// Source-stream description published on the handle after `param_set`
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamInfo {
  /// Video width and height
  pub width: i32,
  pub height: i32,
  /// The average bitrate
  pub bit_rate: i64,
  /// Video frame rate
  pub frame_rate: Rational,
  /// Maximum number of B-frames between non-B-frames
  pub max_b_frames: i32,
  /// The number of pictures in a group of pictures, or 0 for intra-only
  pub gop_size: i32,
  /// Video frame format
  pub pixel_format: PixelFormat,
  /// Video codec
  pub codec_id: CodecId,
  /// Stream duration in microseconds, 0 if unrecognized
  pub duration: i64,
}

// ============================================================================
// Producer Thread
// ============================================================================

/// Everything the producer owns or shares
struct Producer {
  backend: Arc<Mutex<DemuxerContext>>,
  free: FrameQueue,
  ready: FrameQueue,
  scaler: Option<Scaler>,
  scratch: RawFrame,
  flags: Arc<WorkerFlags>,
  seek: Arc<WakeSync>,
}

impl Producer {
  fn exit_requested(&self) -> bool {
    self.flags.exit_flag.load(Ordering::Acquire)
  }

  /// Take a free slot, polling so the exit flag stays observable
  fn obtain_free_slot(&self, poll: Duration) -> Option<Box<VideoFrame>> {
    loop {
      match self.free.get_timeout(poll) {
        Ok(slot) => return Some(slot),
        Err(Error::Timeout) => {
          if self.exit_requested() {
            return None;
          }
          if poll >= SENTINEL_SLOT_POLL {
            warn!("Still waiting for a free result slot");
          }
        }
        Err(_) => return None,
      }
    }
  }

  /// Drain every frame the decoder currently has
  ///
  /// Returns `false` only on a fatal error; EAGAIN/EOF from receive hand the
  /// reserved slot back and return to packet reading.
  fn drain_output(&mut self) -> bool {
    loop {
      let Some(mut slot) = self.obtain_free_slot(FREE_SLOT_POLL) else {
        return !self.exit_requested();
      };

      let convert = self.scaler.is_some();
      let status = {
        let mut backend = match self.backend.lock() {
          Ok(b) => b,
          Err(_) => return false,
        };
        if convert {
          backend.receive_frame(&mut self.scratch)
        } else {
          backend.receive_frame(slot.backend_frame_mut())
        }
      };

      match status {
        Ok(ReceiveStatus::Frame) => {}
        Ok(ReceiveStatus::Again) | Ok(ReceiveStatus::Eof) => {
          let _ = self.free.put(slot);
          return true;
        }
        Err(_) => {
          let _ = self.free.put(slot);
          return false;
        }
      }

      if let Some(scaler) = &self.scaler {
        let rows = match scaler.scale_raw(&self.scratch, slot.backend_frame_mut()) {
          Ok(rows) => rows,
          Err(_) => {
            let _ = self.free.put(slot);
            return false;
          }
        };
        let av = slot.backend_frame_mut();
        let width = av.width();
        av.set_dimensions(width, rows);
        av.set_pts(self.scratch.pts());
        av.set_pkt_dts(self.scratch.pkt_dts());
        av.set_time_base(self.scratch.time_base());
      }

      if self.ready.put(slot).is_err() {
        return false;
      }
    }
  }

  /// Publish the end-of-url sentinel and sleep until a seek (or shutdown)
  ///
  /// Returns `false` when the loop must exit.
  fn seek_wait(&mut self) -> bool {
    let Some(mut slot) = self.obtain_free_slot(SENTINEL_SLOT_POLL) else {
      return false;
    };

    // A wake token left over from a mid-stream seek was already applied to
    // the demuxer; only seeks issued after this sentinel may resume us
    if let Ok(mut woken) = self.seek.mutex.lock() {
      *woken = false;
    }

    slot.set_state(SlotState::EndOfUrl);
    if self.ready.put(slot).is_err() {
      return false;
    }

    let Ok(mut woken) = self.seek.mutex.lock() else {
      return false;
    };
    while !*woken {
      if self.exit_requested() {
        return false;
      }
      woken = match self.seek.cond.wait(woken) {
        Ok(guard) => guard,
        Err(_) => return false,
      };
    }
    *woken = false;
    drop(woken);

    !self.exit_requested()
  }

  /// The producer loop: packets in, ready frames out
  fn run(mut self) {
    self.flags.is_running.store(true, Ordering::Release);

    while !self.exit_requested() {
      let read = {
        let mut backend = match self.backend.lock() {
          Ok(b) => b,
          Err(_) => break,
        };
        backend.read_frame()
      };

      match read {
        Ok(ReadStatus::Packet) => {
          let sent = {
            let mut backend = match self.backend.lock() {
              Ok(b) => b,
              Err(_) => break,
            };
            if backend.packet_stream_index() != backend.stream_index() {
              backend.unref_packet();
              continue;
            }
            let sent = backend.send_packet();
            backend.unref_packet();
            sent
          };
          // A refused packet is logged and skipped; draining still makes
          // sense because earlier input may have matured
          if sent.is_err() {
            continue;
          }
          if !self.drain_output() {
            break;
          }
        }
        Ok(ReadStatus::Eof) => {
          {
            let mut backend = match self.backend.lock() {
              Ok(b) => b,
              Err(_) => break,
            };
            let _ = backend.send_flush_packet();
          }
          if !self.drain_output() {
            break;
          }
          if !self.seek_wait() {
            break;
          }
        }
        Err(_) => break,
      }
    }

    if let Ok(mut backend) = self.backend.lock() {
      backend.unref_packet();
    }
    self.flags.is_running.store(false, Ordering::Release);
  }
}

// ============================================================================
// Pipeline State
// ============================================================================

struct DecodePipeline {
  backend: Arc<Mutex<DemuxerContext>>,
  pool: FramePool,
  flags: Arc<WorkerFlags>,
  seek: Arc<WakeSync>,
  worker: Option<thread::JoinHandle<()>>,
}

// ============================================================================
// Decoder Handle
// ============================================================================

/// Video decoder handle
///
/// `new` builds the handle; `param_set` acquires the url's resources and
/// starts the producer; `release` tears everything down and may be called
/// any number of times. One handle must not be driven from several threads
/// at once.
#[derive(Default)]
pub struct VideoDecoder {
  pipeline: Option<DecodePipeline>,
  /// Source description, populated by `param_set`
  pub stream: StreamInfo,
}

impl VideoDecoder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Configure the decoder on a url and start the producer thread
  ///
  /// A configured handle is torn down first, so `param_set` can be called
  /// repeatedly.
  pub fn param_set(&mut self, url: &str, args: Option<&DecodeArgs>) -> Result<()> {
    if self.pipeline.is_some() {
      self.release()?;
    }

    let mut backend = DemuxerContext::create(url)?;
    let mut args = args.cloned().unwrap_or_default();
    backend.open_stream(
      media_type::VIDEO,
      &DecodeStreamArgs {
        thread_count: args.thread_count,
      },
    )?;
    backend.alloc_buffers()?;

    let scaler = Self::sws_init(&backend, &mut args)?;

    let pool_img = if scaler.is_some() {
      args.fmt_cvt_img.as_ref()
    } else {
      None
    };
    let pool = FramePool::alloc(pool_img, args.cache_count)?;

    let scratch = backend
      .take_scratch()
      .ok_or(Error::ResourceAlloc)?;

    self.stream = Self::stream_fill(&backend);

    let backend = Arc::new(Mutex::new(backend));
    let flags = Arc::new(WorkerFlags::default());
    let seek = Arc::new(WakeSync::default());

    let producer = Producer {
      backend: Arc::clone(&backend),
      free: pool.free.clone(),
      ready: pool.ready.clone(),
      scaler,
      scratch,
      flags: Arc::clone(&flags),
      seek: Arc::clone(&seek),
    };

    flags.is_running.store(true, Ordering::Release);
    let worker = thread::Builder::new()
      .name("framepipe-decode".into())
      .spawn(move || producer.run())
      .map_err(|e| {
        warn!("Failed to spawn the producer thread: {}", e);
        flags.is_running.store(false, Ordering::Release);
        Error::ResourceAlloc
      });
    let worker = match worker {
      Ok(handle) => handle,
      Err(e) => {
        self.stream = StreamInfo::default();
        return Err(e);
      }
    };
    flags.create_flag.store(true, Ordering::Release);

    self.pipeline = Some(DecodePipeline {
      backend,
      pool,
      flags,
      seek,
      worker: Some(worker),
    });
    Ok(())
  }

  /// Decide whether conversion is needed and build the scaler if so
  ///
  /// Invalid target fields fall back to the source's values; a target that
  /// matches the source exactly (including row alignment) disables scaling.
  fn sws_init(backend: &DemuxerContext, args: &mut DecodeArgs) -> Result<Option<Scaler>> {
    let Some(img) = args.fmt_cvt_img.as_mut() else {
      return Ok(None);
    };

    let av_fmt = match img.format.to_av() {
      Some(fmt) => fmt,
      None => {
        warn!(
          "The decoding image configuration may be invalid: [Format: {:?}] Use the default values",
          img.format
        );
        let fmt = backend.pix_fmt_raw();
        if let Some(p) = PixelFormat::from_av(fmt) {
          img.format = p;
        }
        fmt
      }
    };
    if img.width <= 0 || img.height <= 0 {
      warn!(
        "The decoding image configuration may be invalid: [Width: {}; Height: {}] Use the default values",
        img.width, img.height
      );
      img.width = backend.width();
      img.height = backend.height();
    }
    if img.align <= 0 {
      warn!(
        "The decoding image configuration may be invalid: [Align: {}] Use the default values",
        img.align
      );
      img.align = default_image_align();
    }

    info!(
      "Decoding target information: {}x{} format {:?} align {}",
      img.width, img.height, img.format, img.align
    );

    if av_fmt == backend.pix_fmt_raw()
      && backend.width() == img.width
      && backend.height() == img.height
      && backend.width() % img.align == 0
    {
      info!(
        "The source video image already matches the configuration, image conversion will not be enabled"
      );
      return Ok(None);
    }

    let scaler = Scaler::from_raw_formats(
      backend.width(),
      backend.height(),
      backend.pix_fmt_raw(),
      img.width,
      img.height,
      av_fmt,
    )?;
    Ok(Some(scaler))
  }

  fn stream_fill(backend: &DemuxerContext) -> StreamInfo {
    StreamInfo {
      width: backend.width(),
      height: backend.height(),
      bit_rate: backend.bit_rate(),
      frame_rate: backend.framerate(),
      max_b_frames: backend.max_b_frames(),
      gop_size: backend.gop_size(),
      pixel_format: PixelFormat::from_av(backend.pix_fmt_raw()).unwrap_or(PixelFormat::None),
      codec_id: CodecId::from_av(backend.codec_id_raw()).unwrap_or(CodecId::None),
      duration: backend.duration_us(),
    }
  }

  /// Take the next decoded frame
  ///
  /// `timeout_ms` of [`TIMEOUT_NONE`] polls, [`TIMEOUT_INFINITE`] blocks
  /// until a frame arrives. `Error::StreamEnd` reports the in-band
  /// end-of-url sentinel; the url can then be rewound with `seek_file` or
  /// the handle released. Every frame returned here must go back through
  /// [`VideoDecoder::result_free`].
  pub fn result_get(&mut self, timeout_ms: u32) -> Result<Box<VideoFrame>> {
    let pipeline = self.pipeline.as_ref().ok_or(Error::NotInit)?;

    let got = match timeout_ms {
      TIMEOUT_NONE => pipeline.pool.ready.get_nonblocking(),
      TIMEOUT_INFINITE => pipeline.pool.ready.get_blocking(),
      ms => pipeline
        .pool
        .ready
        .get_timeout(Duration::from_millis(ms as u64)),
    };

    let mut slot = match got {
      Ok(slot) => slot,
      Err(err) => {
        let running = pipeline.flags.is_running.load(Ordering::Acquire);
        let err = match err {
          Error::Timeout if running => Error::Timeout,
          _ if !running => Error::NotInit,
          other => other,
        };
        result_ret_debug(err);
        return Err(err);
      }
    };

    if slot.state() == SlotState::EndOfUrl {
      slot.set_state(SlotState::Null);
      pipeline.pool.free.put(slot)?;
      result_ret_debug(Error::StreamEnd);
      return Err(Error::StreamEnd);
    }

    if let Err(err) = slot.fill_from_backend() {
      let _ = pipeline.pool.free.put(slot);
      result_ret_debug(Error::Args);
      return Err(err);
    }
    Ok(slot)
  }

  /// Return a frame obtained from `result_get` to the free pool
  pub fn result_free(&mut self, frame: Box<VideoFrame>) -> Result<()> {
    let Some(pipeline) = self.pipeline.as_ref() else {
      log::error!("The resource is uninitialized");
      return Err(Error::NotInit);
    };
    pipeline.pool.free.put(frame)
  }

  /// Backward-seek the stream to `ts` (demuxer time-base units)
  ///
  /// Flushes the decoder and wakes a producer parked at end-of-url.
  pub fn seek_file(&mut self, min_ts: i64, ts: i64, max_ts: i64) -> Result<()> {
    let Some(pipeline) = self.pipeline.as_ref() else {
      log::error!("The resource is uninitialized");
      return Err(Error::NotInit);
    };

    {
      let mut backend = pipeline.backend.lock().map_err(|_| Error::Entry)?;
      if let Err(err) = backend.seek_file(min_ts, ts, max_ts) {
        // The producer cannot make progress against a broken demuxer
        pipeline.flags.exit_flag.store(true, Ordering::Release);
        pipeline.seek.notify_all();
        return Err(err);
      }
    }

    // Wake the producer only now that the seek and flush are visible
    pipeline.seek.notify_all();
    Ok(())
  }

  /// Stop the producer and free every decoder resource
  ///
  /// Idempotent; the handle drops back to the unconfigured state.
  pub fn release(&mut self) -> Result<()> {
    let Some(mut pipeline) = self.pipeline.take() else {
      return Ok(());
    };
    self.stream = StreamInfo::default();

    pipeline.flags.exit_flag.store(true, Ordering::Release);

    if pipeline.flags.create_flag.load(Ordering::Acquire) {
      let mut retries = 20;
      while retries > 0 && pipeline.flags.is_running.load(Ordering::Acquire) {
        pipeline.seek.notify_all();
        thread::sleep(Duration::from_millis(200));
        retries -= 1;
      }
    }

    if let Some(worker) = pipeline.worker.take() {
      if pipeline.flags.is_running.load(Ordering::Acquire) {
        // The producer is stuck inside the backend; abandon it rather than
        // block release forever. Its shared resources go with it.
        warn!("The producer thread did not exit in time, abandoning it");
        drop(worker);
      } else if worker.join().is_err() {
        warn!("The producer thread panicked");
      }
    }

    // Queues, pool slots, scaler, and backend contexts unwind here
    drop(pipeline);
    Ok(())
  }
}

impl Drop for VideoDecoder {
  fn drop(&mut self) {
    let _ = self.release();
  }
}

fn result_ret_debug(err: Error) {
  match err {
    Error::StreamEnd => info!("Decoded to end of the url"),
    Error::Timeout => warn!("No valid decoding result, timeout for getting the result"),
    Error::ResourceAlloc => log::error!("Failed to get the result cache"),
    Error::NotInit => {
      log::error!("No valid configuration, the decoding thread is not started")
    }
    _ => warn!("Unknown error: {}", err),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode_args_default() {
    let args = DecodeArgs::default();
    assert_eq!(args.cache_count, 1);
    assert_eq!(args.thread_count, 0);
    assert!(args.fmt_cvt_img.is_none());
  }

  #[test]
  fn test_unconfigured_handle_reports_not_init() {
    let mut decoder = VideoDecoder::new();
    assert_eq!(decoder.result_get(TIMEOUT_NONE).unwrap_err(), Error::NotInit);
    assert_eq!(decoder.seek_file(0, 0, 0).unwrap_err(), Error::NotInit);

    let frame = VideoFrame::alloc(None).unwrap();
    assert_eq!(decoder.result_free(frame).unwrap_err(), Error::NotInit);
  }

  #[test]
  fn test_release_is_idempotent() {
    let mut decoder = VideoDecoder::new();
    assert!(decoder.release().is_ok());
    assert!(decoder.release().is_ok());
    assert!(decoder.release().is_ok());
    assert_eq!(decoder.result_get(TIMEOUT_NONE).unwrap_err(), Error::NotInit);
  }

  #[test]
  fn test_stream_info_defaults() {
    let info = StreamInfo::default();
    assert_eq!(info.pixel_format, PixelFormat::None);
    assert_eq!(info.codec_id, CodecId::None);
    assert_eq!(info.duration, 0);
  }
}
