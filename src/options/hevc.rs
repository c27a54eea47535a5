//! HEVC (libx265) option mapping

use std::os::raw::c_void;

use log::info;

use crate::ffi::types::CodecId;

use super::{CodecOptions, clamp_level, opt_set, opt_set_from_string, LEVEL_MAX, LEVEL_MIN};

/// Bit rate control mode for HEVC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HevcRateControl {
  /// No change
  #[default]
  None,
  /// Constant Rate Factor (CRF) mode
  Crf,
  /// Constant bitrate
  Cbr,
  /// Variable bitrate
  Vbr,
}

/// Tune options for HEVC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HevcTune {
  /// No change
  #[default]
  None,
  /// Zero latency, suitable for live streaming
  Zerolatency,
  /// Optimize for fast encoding and decoding
  FastCodec,
}

/// Typed encoder arguments for HEVC
///
/// A field left at its zero value (`0`, `None`) means "no change".
#[derive(Debug, Clone, Default)]
pub struct HevcOptions {
  /// Encoding speed/preset level on the uniform 1..=16 scale; higher is
  /// faster. 0 leaves the encoder default.
  pub speed_level: i32,
  /// Rate control mode
  pub rc_mode: HevcRateControl,
  /// Quality level on the uniform 1..=16 scale; higher is better. Used for
  /// CRF mode; 0 leaves the encoder default.
  pub quality_level: i32,
  /// Target bitrate in Kbps, used for CBR/VBR; 0 leaves the default
  pub bitrate: i32,
  /// Tuning option
  pub tune_mode: HevcTune,
  /// Keyframe interval; 0 leaves the default
  pub gop_size: i32,
  /// Advanced options in `key1=val1:key2=val2` form, forwarded verbatim
  pub advanced_options: Option<String>,
}

/// Map a uniform speed level onto the libx265 preset ladder
pub(crate) fn map_speed_to_preset(speed_level: i32) -> &'static str {
  let speed_level = clamp_level(speed_level);

  if speed_level >= LEVEL_MAX {
    return "ultrafast";
  }
  if speed_level >= 14 {
    return "superfast";
  }
  if speed_level >= 12 {
    return "veryfast";
  }
  if speed_level >= 10 {
    return "faster";
  }
  if speed_level >= 8 {
    return "fast";
  }
  if speed_level >= 6 {
    return "medium";
  }
  if speed_level >= 4 {
    return "slow";
  }
  if speed_level >= 3 {
    return "slower";
  }
  if speed_level >= 2 {
    return "veryslow";
  }

  // `placebo` is not recommended for production but rounds out the ladder
  "placebo"
}

/// Map a uniform quality level onto the libx265 CRF scale
///
/// libx265 CRF runs 0-51, lower is better; the useful band is 18 (high
/// quality) to 33 (low). quality 16 lands on 18, quality 1 on 33.
pub(crate) fn map_quality_to_crf(quality_level: i32) -> i32 {
  let quality_level = clamp_level(quality_level);

  33 + (quality_level - 1) * (18 - 33) / (LEVEL_MAX - LEVEL_MIN)
}

impl CodecOptions for HevcOptions {
  fn codec_id(&self) -> CodecId {
    CodecId::Hevc
  }

  unsafe fn apply(&self, priv_data: *mut c_void) {
    if priv_data.is_null() {
      return;
    }

    if self.speed_level != 0 {
      let preset = map_speed_to_preset(self.speed_level);
      info!("`libx265`, preset: {}", preset);
      opt_set(priv_data, "preset", preset);
    }

    match self.rc_mode {
      HevcRateControl::Crf => {
        if self.quality_level != 0 {
          let crf = map_quality_to_crf(self.quality_level);
          info!("`libx265`, crf: {}", crf);
          opt_set(priv_data, "crf", &crf.to_string());
        }
      }
      HevcRateControl::Cbr | HevcRateControl::Vbr => {
        if self.bitrate > 0 {
          let bt_str = format!("{}K", self.bitrate);
          info!("`libx265`, bitrate: {}", bt_str);
          opt_set(priv_data, "b", &bt_str);
          opt_set(priv_data, "vbv-bufsize", &bt_str);
          opt_set(priv_data, "vbv-maxrate", &bt_str);
        }
      }
      HevcRateControl::None => {}
    }

    match self.tune_mode {
      HevcTune::Zerolatency => {
        info!("`libx265`, tune: zerolatency");
        opt_set(priv_data, "tune", "zerolatency");
      }
      HevcTune::FastCodec => {
        info!("`libx265`, tune: fastdecode");
        opt_set(priv_data, "tune", "fastdecode");
      }
      HevcTune::None => {}
    }

    if self.gop_size > 0 {
      info!("`libx265`, gop_size: {}", self.gop_size);
      opt_set(priv_data, "g", &self.gop_size.to_string());
    }

    if let Some(advanced) = &self.advanced_options {
      info!("`libx265`, advanced_options: {}", advanced);
      opt_set_from_string(priv_data, advanced);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_speed_preset_table() {
    assert_eq!(map_speed_to_preset(16), "ultrafast");
    assert_eq!(map_speed_to_preset(14), "superfast");
    assert_eq!(map_speed_to_preset(15), "superfast");
    assert_eq!(map_speed_to_preset(12), "veryfast");
    assert_eq!(map_speed_to_preset(10), "faster");
    assert_eq!(map_speed_to_preset(8), "fast");
    assert_eq!(map_speed_to_preset(6), "medium");
    assert_eq!(map_speed_to_preset(4), "slow");
    assert_eq!(map_speed_to_preset(3), "slower");
    assert_eq!(map_speed_to_preset(2), "veryslow");
    assert_eq!(map_speed_to_preset(1), "placebo");
  }

  #[test]
  fn test_speed_preset_monotonic() {
    // The preset ladder from slowest to fastest
    let ladder = [
      "placebo",
      "veryslow",
      "slower",
      "slow",
      "medium",
      "fast",
      "faster",
      "veryfast",
      "superfast",
      "ultrafast",
    ];
    let rank = |p: &str| ladder.iter().position(|&x| x == p).unwrap();

    for speed in 1..16 {
      let a = rank(map_speed_to_preset(speed));
      let b = rank(map_speed_to_preset(speed + 1));
      assert!(a <= b, "preset regressed between {} and {}", speed, speed + 1);
    }
  }

  #[test]
  fn test_quality_crf_endpoints() {
    assert_eq!(map_quality_to_crf(1), 33);
    assert_eq!(map_quality_to_crf(16), 18);
  }

  #[test]
  fn test_quality_crf_monotonic() {
    for q in 1..16 {
      assert!(map_quality_to_crf(q) >= map_quality_to_crf(q + 1));
    }
  }

  #[test]
  fn test_out_of_range_levels_clamp() {
    assert_eq!(map_speed_to_preset(0), map_speed_to_preset(1));
    assert_eq!(map_speed_to_preset(100), map_speed_to_preset(16));
    assert_eq!(map_quality_to_crf(-3), map_quality_to_crf(1));
    assert_eq!(map_quality_to_crf(40), map_quality_to_crf(16));
  }

  #[test]
  fn test_codec_id() {
    assert_eq!(HevcOptions::default().codec_id(), CodecId::Hevc);
  }
}
