//! Hand-written FFmpeg C bindings (no bindgen)
//!
//! This module provides minimal FFmpeg bindings for the decode/encode
//! pipeline. All FFmpeg structs are opaque - we access fields via the thin C
//! accessor library.

pub mod accessors;
pub mod avcodec;
pub mod avformat;
pub mod avutil;
pub mod error;
pub mod swscale;
pub mod types;

pub use types::*;
