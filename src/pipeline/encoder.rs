//! The encoder core: pipeline state plus the consumer thread
//!
//! The foreground feeds raw frames through a reusable shuttle frame while a
//! background consumer pulls compressed packets out of the encoder and hands
//! them to the muxer. Both sides touch the codec and muxer contexts only
//! under one shared mutex; the foreground parks on a condvar whenever the
//! encoder is saturated and the consumer wakes it after every drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{error, warn};

use crate::codec::frame::RawFrame;
use crate::codec::muxer::{ContainerFormat, EncodeContextArgs, MuxerContext};
use crate::codec::packet::Packet;
use crate::codec::ReceiveStatus;
use crate::error::{Error, Result};
use crate::ffi::types::{CodecId, Rational};
use crate::options::CodecOptions;
use crate::pipeline::frame::{ImageSpec, VideoFrame};
use crate::pipeline::{WakeSync, WorkerFlags};

/// How long the foreground sleeps per condvar wait while the encoder is
/// saturated; bounded so a dead consumer is always noticed
const FEED_WAIT: Duration = Duration::from_millis(100);

/// Poll interval while `stop` waits for the encoder's end-of-stream
const EOF_POLL: Duration = Duration::from_nanos(100);

// ============================================================================
// Configuration
// ============================================================================

/// Encoder configuration
#[derive(Debug, Clone)]
pub struct EncodeArgs {
  /// Container format; `None` lets the backend guess from the url
  pub cont_fmt: ContainerFormat,
  /// Target bitrate in bits per second
  pub bit_rate: i64,
  /// Input image geometry; the `align` field does not take effect here
  pub img: ImageSpec,
  /// Output frame rate
  pub frame_rate: Rational,
  /// Keyframe interval
  pub gop_size: i32,
  /// Maximum number of B-frames between non-B-frames
  pub max_b_frames: i32,
  /// Encoder thread count; 0 selects the backend default
  pub thread_count: i32,
  /// Encoder id
  pub codec_id: CodecId,
}

// ============================================================================
// Consumer Thread
// ============================================================================

struct Consumer {
  backend: Arc<Mutex<MuxerContext>>,
  flags: Arc<WorkerFlags>,
  eof_flag: Arc<AtomicBool>,
  fg: Arc<WakeSync>,
  stream_index: i32,
}

impl Consumer {
  /// Pull packets out of the encoder and write them to the muxer
  fn run(self) {
    self.flags.is_running.store(true, Ordering::Release);

    let mut pkt = match Packet::new() {
      Ok(pkt) => pkt,
      Err(_) => {
        error!("Failed to allocate the consumer packet");
        self.flags.is_running.store(false, Ordering::Release);
        self.fg.notify_all();
        return;
      }
    };

    while !self.flags.exit_flag.load(Ordering::Acquire) {
      pkt.unref();

      let received = {
        let mut backend = match self.backend.lock() {
          Ok(b) => b,
          Err(_) => break,
        };
        backend.receive_packet(&mut pkt)
      };

      match received {
        Ok(ReceiveStatus::Again) => {
          // The encoder wants input; let the foreground at it
          self.fg.notify_all();
          thread::yield_now();
          continue;
        }
        Ok(ReceiveStatus::Eof) => {
          self.eof_flag.store(true, Ordering::Release);
          break;
        }
        Err(_) => break,
        Ok(ReceiveStatus::Frame) => {}
      }

      pkt.set_stream_index(self.stream_index);
      let written = {
        let mut backend = match self.backend.lock() {
          Ok(b) => b,
          Err(_) => break,
        };
        backend.write_interleaved(&mut pkt)
      };
      if written.is_err() {
        break;
      }
    }

    drop(pkt);
    self.flags.is_running.store(false, Ordering::Release);
    self.fg.notify_all();
  }
}

// ============================================================================
// Pipeline State
// ============================================================================

struct EncodePipeline {
  backend: Arc<Mutex<MuxerContext>>,
  /// Reusable frame shuttling caller descriptors into the encoder
  shuttle: RawFrame,
  args: EncodeArgs,
  flags: Arc<WorkerFlags>,
  eof_flag: Arc<AtomicBool>,
  fg: Arc<WakeSync>,
  worker: Option<thread::JoinHandle<()>>,
  started: bool,
  /// Synthesized presentation-timestamp step per frame
  base_pts: i64,
  frame_index: i64,
}

// ============================================================================
// Encoder Handle
// ============================================================================

/// Video encoder handle
///
/// `new` builds the handle; `param_set` opens the destination and the
/// encoder context; `codec_priv_set` (optional) applies typed encoder
/// options; `start` writes the header and launches the consumer;
/// `send_frame` feeds raw frames; `stop` flushes and writes the trailer;
/// `release` tears everything down and may be called any number of times.
/// One handle must not be driven from several threads at once.
#[derive(Default)]
pub struct VideoEncoder {
  pipeline: Option<EncodePipeline>,
}

impl VideoEncoder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Configure the encoder for a destination url
  ///
  /// A configured handle is torn down first, so `param_set` can be called
  /// repeatedly.
  pub fn param_set(&mut self, url: &str, args: &EncodeArgs) -> Result<()> {
    if self.pipeline.is_some() {
      self.release()?;
    }

    let mut backend = MuxerContext::init(url, args.cont_fmt.short_name())?;

    let pix_fmt = args.img.format.to_av().ok_or(Error::ResourceAlloc)?;
    let codec_id = args.codec_id.to_av().ok_or(Error::ResourceAlloc)?;

    backend.ctx_alloc(
      &EncodeContextArgs {
        bit_rate: args.bit_rate,
        width: args.img.width,
        height: args.img.height,
        frame_rate: args.frame_rate,
        gop_size: args.gop_size,
        max_b_frames: args.max_b_frames,
        pix_fmt,
        thread_count: args.thread_count,
      },
      codec_id,
    )?;

    let shuttle = RawFrame::new()?;

    self.pipeline = Some(EncodePipeline {
      backend: Arc::new(Mutex::new(backend)),
      shuttle,
      args: args.clone(),
      flags: Arc::new(WorkerFlags::default()),
      eof_flag: Arc::new(AtomicBool::new(false)),
      fg: Arc::new(WakeSync::default()),
      worker: None,
      started: false,
      base_pts: 0,
      frame_index: 0,
    });
    Ok(())
  }

  /// Apply typed codec-private options
  ///
  /// The option type selects the mapper, so a mismatch between the
  /// configured codec and the argument type is an `Args` error. Must be
  /// called after `param_set` and before `start`.
  pub fn codec_priv_set<A: CodecOptions>(&mut self, args: &A) -> Result<()> {
    let pipeline = self.pipeline.as_mut().ok_or(Error::NotInit)?;
    if pipeline.started {
      return Err(Error::Entry);
    }
    if args.codec_id() != pipeline.args.codec_id {
      error!(
        "Codec id mismatch: configured {:?}, arguments target {:?}",
        pipeline.args.codec_id,
        args.codec_id()
      );
      return Err(Error::Args);
    }

    let mut backend = pipeline.backend.lock().map_err(|_| Error::Entry)?;
    let priv_data = backend.codec_priv_data().ok_or(Error::NotInit)?;
    unsafe { args.apply(priv_data) };
    Ok(())
  }

  /// Open the encoder, launch the consumer, and write the stream header
  pub fn start(&mut self) -> Result<()> {
    let pipeline = self.pipeline.as_mut().ok_or(Error::NotInit)?;
    if pipeline.started {
      return Err(Error::InitRepeated);
    }

    pipeline
      .backend
      .lock()
      .map_err(|_| Error::Entry)?
      .open()?;

    let stream_index = pipeline
      .backend
      .lock()
      .map_err(|_| Error::Entry)?
      .stream_index();

    pipeline.flags.exit_flag.store(false, Ordering::Release);
    pipeline.eof_flag.store(false, Ordering::Release);
    pipeline.flags.is_running.store(true, Ordering::Release);

    let consumer = Consumer {
      backend: Arc::clone(&pipeline.backend),
      flags: Arc::clone(&pipeline.flags),
      eof_flag: Arc::clone(&pipeline.eof_flag),
      fg: Arc::clone(&pipeline.fg),
      stream_index,
    };
    let worker = thread::Builder::new()
      .name("framepipe-encode".into())
      .spawn(move || consumer.run())
      .map_err(|e| {
        warn!("Failed to spawn the consumer thread: {}", e);
        Error::ResourceAlloc
      });
    let worker = match worker {
      Ok(handle) => handle,
      Err(err) => {
        pipeline.flags.is_running.store(false, Ordering::Release);
        return Err(err);
      }
    };
    pipeline.flags.create_flag.store(true, Ordering::Release);
    pipeline.worker = Some(worker);

    if let Err(err) = pipeline
      .backend
      .lock()
      .map_err(|_| Error::Entry)
      .and_then(|mut b| b.write_header())
    {
      pipeline.flags.exit_flag.store(true, Ordering::Release);
      if let Some(worker) = pipeline.worker.take() {
        let _ = worker.join();
      }
      return Err(err);
    }

    // The header write is what fixes the stream time base, so the pts step
    // can only be derived now
    let (stream_tb, framerate) = {
      let backend = pipeline.backend.lock().map_err(|_| Error::Entry)?;
      (backend.stream_time_base(), backend.framerate())
    };
    pipeline.base_pts = if stream_tb.num > 0 && framerate.num > 0 {
      stream_tb.den as i64 / stream_tb.num as i64 / framerate.num as i64 * framerate.den as i64
    } else {
      warn!(
        "Degenerate time base {}/{} or frame rate {}/{}, pts step falls back to 1",
        stream_tb.num, stream_tb.den, framerate.num, framerate.den
      );
      1
    };
    pipeline.frame_index = 0;
    pipeline.started = true;
    Ok(())
  }

  /// Feed one raw frame to the encoder
  ///
  /// The frame must match the configured geometry and format. Its pts is
  /// replaced with a synthesized, strictly increasing timestamp. Blocks
  /// while the encoder is saturated until the consumer drains a packet.
  pub fn send_frame(&mut self, frame: &VideoFrame) -> Result<()> {
    let pipeline = self.pipeline.as_mut().ok_or(Error::NotInit)?;
    if !pipeline.started {
      error!("The resource is uninitialized");
      return Err(Error::NotInit);
    }

    let img = &pipeline.args.img;
    if img.width != frame.width || img.height != frame.height || img.format != frame.format {
      error!(
        "Image parameter error: [Width] Exp: {}; Act: {} [Height] Exp: {}; Act: {} [Format] Exp: {:?}; Act: {:?}",
        img.width, frame.width, img.height, frame.height, img.format, frame.format
      );
      return Err(Error::Args);
    }

    frame.copy_to_backend(&mut pipeline.shuttle)?;
    pipeline
      .shuttle
      .set_pts(pipeline.frame_index * pipeline.base_pts);
    pipeline.frame_index += 1;

    loop {
      if !pipeline.flags.is_running.load(Ordering::Acquire) {
        return Err(Error::NotInit);
      }

      let sent = {
        let mut backend = pipeline.backend.lock().map_err(|_| Error::Entry)?;
        backend.send_frame(Some(&pipeline.shuttle))
      };

      match sent {
        Ok(ReceiveStatus::Frame) => return Ok(()),
        Ok(ReceiveStatus::Again) => {
          // Saturated: sleep until the consumer signals a drained packet.
          // The shared mutex is already released here.
          if let Ok(guard) = pipeline.fg.mutex.lock() {
            let mut guard = if !*guard {
              match pipeline.fg.cond.wait_timeout(guard, FEED_WAIT) {
                Ok((guard, _)) => guard,
                Err(_) => return Err(Error::Entry),
              }
            } else {
              guard
            };
            *guard = false;
          }
        }
        Ok(ReceiveStatus::Eof) | Err(_) => {
          pipeline.flags.exit_flag.store(true, Ordering::Release);
          return Err(Error::ResourceAlloc);
        }
      }
    }
  }

  /// Flush the encoder, wait for its end-of-stream, and write the trailer
  pub fn stop(&mut self) -> Result<()> {
    let pipeline = self.pipeline.as_mut().ok_or(Error::NotInit)?;
    if !pipeline.started {
      error!("The resource is uninitialized");
      return Err(Error::NotInit);
    }

    // Hand the encoder its flush frame; EAGAIN means packets are still
    // queued, so let the consumer drain and retry
    loop {
      let sent = {
        let mut backend = pipeline.backend.lock().map_err(|_| Error::Entry)?;
        backend.send_frame(None)
      };
      match sent {
        Ok(ReceiveStatus::Frame) | Ok(ReceiveStatus::Eof) => break,
        Ok(ReceiveStatus::Again) => {
          if !pipeline.flags.is_running.load(Ordering::Acquire) {
            return Err(Error::StreamFlush);
          }
          thread::sleep(EOF_POLL);
        }
        Err(_) => return Err(Error::StreamFlush),
      }
    }

    // The consumer sets the eof flag when the encoder reports fully drained
    while !pipeline.eof_flag.load(Ordering::Acquire) {
      if !pipeline.flags.is_running.load(Ordering::Acquire) {
        break;
      }
      thread::sleep(EOF_POLL);
    }
    if !pipeline.eof_flag.load(Ordering::Acquire) {
      error!("The consumer exited before the encoder was drained");
      return Err(Error::StreamFlush);
    }

    pipeline
      .backend
      .lock()
      .map_err(|_| Error::Entry)?
      .write_trailer()?;

    pipeline.flags.exit_flag.store(true, Ordering::Release);
    if let Some(worker) = pipeline.worker.take() {
      if worker.join().is_err() {
        warn!("The consumer thread panicked");
      }
    }

    pipeline
      .backend
      .lock()
      .map_err(|_| Error::Entry)?
      .close_codec();
    pipeline.started = false;
    Ok(())
  }

  /// Stop the consumer and free every encoder resource
  ///
  /// Idempotent; the handle drops back to the unconfigured state.
  pub fn release(&mut self) -> Result<()> {
    let Some(mut pipeline) = self.pipeline.take() else {
      return Ok(());
    };

    pipeline.flags.exit_flag.store(true, Ordering::Release);

    if pipeline.flags.create_flag.load(Ordering::Acquire) {
      let mut retries = 20;
      while retries > 0 && pipeline.flags.is_running.load(Ordering::Acquire) {
        pipeline.fg.notify_all();
        thread::sleep(Duration::from_millis(200));
        retries -= 1;
      }
    }

    if let Some(worker) = pipeline.worker.take() {
      if pipeline.flags.is_running.load(Ordering::Acquire) {
        warn!("The consumer thread did not exit in time, abandoning it");
        drop(worker);
      } else if worker.join().is_err() {
        warn!("The consumer thread panicked");
      }
    }

    // Shuttle frame, codec context, AVIO, and muxer unwind here
    drop(pipeline);
    Ok(())
  }
}

impl Drop for VideoEncoder {
  fn drop(&mut self) {
    let _ = self.release();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ffi::types::PixelFormat;
  use crate::options::{Av1Options, HevcOptions};

  fn sample_args() -> EncodeArgs {
    EncodeArgs {
      cont_fmt: ContainerFormat::None,
      bit_rate: 6_000_000,
      img: ImageSpec::new(2560, 1440, 0, PixelFormat::Yuv420p),
      frame_rate: Rational::new(60, 1),
      gop_size: 12,
      max_b_frames: 3,
      thread_count: 0,
      codec_id: CodecId::Hevc,
    }
  }

  #[test]
  fn test_unconfigured_handle_reports_not_init() {
    let mut encoder = VideoEncoder::new();
    assert_eq!(encoder.start().unwrap_err(), Error::NotInit);
    assert_eq!(encoder.stop().unwrap_err(), Error::NotInit);
    assert_eq!(
      encoder.codec_priv_set(&HevcOptions::default()).unwrap_err(),
      Error::NotInit
    );

    let frame = VideoFrame::alloc(None).unwrap();
    assert_eq!(encoder.send_frame(&frame).unwrap_err(), Error::NotInit);
  }

  #[test]
  fn test_release_is_idempotent() {
    let mut encoder = VideoEncoder::new();
    assert!(encoder.release().is_ok());
    assert!(encoder.release().is_ok());
    assert!(encoder.release().is_ok());
  }

  #[test]
  fn test_codec_options_carry_their_id() {
    // The generic dispatch of codec_priv_set hinges on these
    assert_eq!(HevcOptions::default().codec_id(), CodecId::Hevc);
    assert_eq!(Av1Options::default().codec_id(), CodecId::Av1);
    assert_ne!(
      Av1Options::default().codec_id(),
      sample_args().codec_id
    );
  }

  #[test]
  fn test_synthesized_pts_sequence() {
    // pts values are frame_index * base_pts; a 1/90000 stream time base at
    // 60 fps gives a step of 1500
    let (tb_num, tb_den) = (1i64, 90000i64);
    let (fps_num, fps_den) = (60i64, 1i64);
    let base_pts = tb_den / tb_num / fps_num * fps_den;
    assert_eq!(base_pts, 1500);
    let pts: Vec<i64> = (0..5).map(|i| i * base_pts).collect();
    assert_eq!(pts, vec![0, 1500, 3000, 4500, 6000]);
    assert!(pts.windows(2).all(|w| w[0] < w[1]));
  }
}
