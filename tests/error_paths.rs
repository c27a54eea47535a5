//! Misuse and failure-path coverage for the public handles
//!
//! These tests run without any media fixtures: they drive the error arms of
//! the pipeline (bad urls, calls before configuration, repeated release).

use std::sync::Once;

use framepipe::{
  DecodeArgs, Error, ImageSpec, PixelFormat, VideoDecoder, VideoEncoder, VideoFrame, TIMEOUT_NONE,
};

static LOG_INIT: Once = Once::new();

fn init_logs() {
  LOG_INIT.call_once(|| {
    let _ = simplelog::SimpleLogger::init(
      simplelog::LevelFilter::Warn,
      simplelog::Config::default(),
    );
  });
}

#[test]
fn decode_param_set_rejects_missing_url() {
  init_logs();

  let mut decoder = VideoDecoder::new();
  let err = decoder
    .param_set("./no_such_input_file.mp4", None)
    .unwrap_err();
  assert_eq!(err, Error::ResourceAlloc);

  // A failed param_set leaves the handle unconfigured
  assert_eq!(decoder.result_get(TIMEOUT_NONE).unwrap_err(), Error::NotInit);
  assert!(decoder.release().is_ok());
}

#[test]
fn decode_operations_need_configuration() {
  init_logs();

  let mut decoder = VideoDecoder::new();
  assert_eq!(decoder.result_get(TIMEOUT_NONE).unwrap_err(), Error::NotInit);
  assert_eq!(decoder.result_get(250).unwrap_err(), Error::NotInit);
  assert_eq!(decoder.seek_file(0, 0, 0).unwrap_err(), Error::NotInit);

  let frame = VideoFrame::alloc(None).unwrap();
  assert_eq!(decoder.result_free(frame).unwrap_err(), Error::NotInit);

  // Back-to-back releases all succeed
  assert!(decoder.release().is_ok());
  assert!(decoder.release().is_ok());
  assert!(decoder.release().is_ok());
}

#[test]
fn decode_stream_info_is_cleared_until_configured() {
  init_logs();

  let decoder = VideoDecoder::new();
  assert_eq!(decoder.stream.width, 0);
  assert_eq!(decoder.stream.height, 0);
  assert_eq!(decoder.stream.duration, 0);
  assert_eq!(decoder.stream.pixel_format, PixelFormat::None);
}

#[test]
fn encode_operations_need_configuration() {
  init_logs();

  let mut encoder = VideoEncoder::new();
  assert_eq!(encoder.start().unwrap_err(), Error::NotInit);
  assert_eq!(encoder.stop().unwrap_err(), Error::NotInit);

  let frame = VideoFrame::alloc(None).unwrap();
  assert_eq!(encoder.send_frame(&frame).unwrap_err(), Error::NotInit);

  assert!(encoder.release().is_ok());
  assert!(encoder.release().is_ok());
}

#[test]
fn frame_alloc_rejects_invalid_descriptor() {
  init_logs();

  // The sentinel format can never be mapped onto a backend allocation
  let img = ImageSpec::new(64, 64, 0, PixelFormat::None);
  assert_eq!(VideoFrame::alloc(Some(&img)).unwrap_err(), Error::MemoryAlloc);
}

#[test]
fn decode_args_survive_clone() {
  init_logs();

  let args = DecodeArgs {
    cache_count: 8,
    thread_count: 2,
    fmt_cvt_img: Some(ImageSpec::new(1280, 720, 0, PixelFormat::Rgb24)),
  };
  let copy = args.clone();
  assert_eq!(copy.cache_count, 8);
  assert_eq!(copy.thread_count, 2);
  assert_eq!(copy.fmt_cvt_img.unwrap().format, PixelFormat::Rgb24);
}
