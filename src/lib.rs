#![deny(clippy::all)]

//! framepipe - a video decode/encode pipeline library built on FFmpeg
//!
//! Two handles make up the public surface. A [`VideoDecoder`] ingests a url
//! (file path or network stream), decodes its video stream on a background
//! producer thread, and hands out frames from a bounded pool; it supports
//! seeking and optional pixel-format/size conversion. A [`VideoEncoder`]
//! accepts raw frames, packetizes them through a chosen codec into a chosen
//! container, and writes to a destination url while a background consumer
//! drains the encoder.
//!
//! ```no_run
//! use framepipe::{DecodeArgs, VideoDecoder, Error};
//!
//! let mut decoder = VideoDecoder::new();
//! decoder.param_set("input.mp4", Some(&DecodeArgs { cache_count: 4, ..Default::default() }))?;
//! loop {
//!     match decoder.result_get(1500) {
//!         Ok(frame) => {
//!             // consume frame.data / frame.linesize
//!             decoder.result_free(frame)?;
//!         }
//!         Err(Error::StreamEnd) => break,
//!         Err(err) => return Err(err),
//!     }
//! }
//! decoder.release()?;
//! # Ok::<(), framepipe::Error>(())
//! ```

// FFmpeg C bindings (hand-written, no bindgen)
pub mod ffi;

// Safe codec wrappers (RAII)
pub mod codec;

// Codec-private option mappers
pub mod options;

// Decode/encode pipeline cores
pub mod pipeline;

mod error;

// Re-export the public vocabulary at the crate root
pub use codec::muxer::ContainerFormat;
pub use codec::scaler::Scaler;
pub use error::{Error, Result};
pub use ffi::types::{CodecId, PixelFormat, Rational};
pub use options::{
  Av1Options, Av1RateControl, Av1Tune, CodecOptions, HevcOptions, HevcRateControl, HevcTune,
};
pub use pipeline::decoder::{
  DecodeArgs, StreamInfo, VideoDecoder, TIMEOUT_INFINITE, TIMEOUT_NONE,
};
pub use pipeline::encoder::{EncodeArgs, VideoEncoder};
pub use pipeline::frame::{ImageSpec, VideoFrame, MAX_PLANES};
