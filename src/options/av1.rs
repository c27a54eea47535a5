//! AV1 (libsvtav1) option mapping

use std::os::raw::c_void;

use log::info;

use crate::ffi::types::CodecId;

use super::{CodecOptions, clamp_level, opt_set, opt_set_from_string, LEVEL_MAX, LEVEL_MIN};

/// Bit rate control mode for AV1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Av1RateControl {
  /// No change
  #[default]
  None,
  /// Constant Quality (CQ) mode, known as CRF in some encoders. The
  /// recommended mode for high-quality encoding.
  Cq,
  /// Constant bitrate
  Cbr,
  /// Variable bitrate
  Vbr,
}

/// Tune options for AV1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Av1Tune {
  /// No change
  #[default]
  None,
  /// Optimize for subjective visual quality
  VisualQuality,
  /// Optimize for objective metrics like PSNR/SSIM
  Psnr,
}

/// Typed encoder arguments for AV1
///
/// A field left at its zero value (`0`, `None`) means "no change".
#[derive(Debug, Clone, Default)]
pub struct Av1Options {
  /// Encoding speed/preset level on the uniform 1..=16 scale; higher is
  /// faster. 0 leaves the encoder default.
  pub speed_level: i32,
  /// Rate control mode
  pub rc_mode: Av1RateControl,
  /// Quality level on the uniform 1..=16 scale; higher is better. Used for
  /// CQ mode; 0 leaves the encoder default.
  pub quality_level: i32,
  /// Target bitrate in Kbps, used for CBR/VBR; 0 leaves the default
  pub bitrate: i32,
  /// Tuning option
  pub tune_mode: Av1Tune,
  /// Keyframe interval; 0 leaves the default
  pub gop_size: i32,
  /// Advanced options in `key1=val1:key2=val2` form, forwarded verbatim
  pub advanced_options: Option<String>,
}

/// Map a uniform speed level onto the libsvtav1 preset integers
///
/// libsvtav1 presets range from 0 (slowest) to 13 (fastest).
pub(crate) fn map_speed_to_preset(speed_level: i32) -> i32 {
  let speed_level = clamp_level(speed_level);

  if speed_level >= 16 {
    return 13;
  }
  if speed_level >= 15 {
    return 12;
  }
  if speed_level >= 14 {
    return 11;
  }
  if speed_level >= 13 {
    return 10;
  }
  if speed_level >= 11 {
    return 9;
  }
  if speed_level >= 9 {
    return 8; // Default preset for libsvtav1 is 8
  }
  if speed_level >= 7 {
    return 7;
  }
  if speed_level >= 6 {
    return 6;
  }
  if speed_level >= 5 {
    return 5;
  }
  if speed_level >= 4 {
    return 4;
  }
  if speed_level >= 3 {
    return 3;
  }
  if speed_level >= 2 {
    return 2;
  }

  1
}

/// Map a uniform quality level onto the libsvtav1 CRF scale
///
/// libsvtav1 CRF runs 0-63, lower is better; the useful band is 20 (high
/// quality) to 40 (low). quality 16 lands on 20, quality 1 on 40.
pub(crate) fn map_quality_to_crf(quality_level: i32) -> i32 {
  let quality_level = clamp_level(quality_level);

  let (crf_high_quality, crf_low_quality) = (20, 40);
  crf_low_quality
    + (quality_level - LEVEL_MIN) * (crf_high_quality - crf_low_quality) / (LEVEL_MAX - LEVEL_MIN)
}

impl CodecOptions for Av1Options {
  fn codec_id(&self) -> CodecId {
    CodecId::Av1
  }

  unsafe fn apply(&self, priv_data: *mut c_void) {
    if priv_data.is_null() {
      return;
    }

    if self.speed_level != 0 {
      let preset = map_speed_to_preset(self.speed_level);
      info!("`libsvtav1`, preset: {}", preset);
      opt_set(priv_data, "preset", &preset.to_string());
    }

    match self.rc_mode {
      Av1RateControl::Cq => {
        if self.quality_level != 0 {
          let crf = map_quality_to_crf(self.quality_level);
          info!("`libsvtav1`, crf: {}", crf);
          opt_set(priv_data, "crf", &crf.to_string());
        }
      }
      Av1RateControl::Cbr | Av1RateControl::Vbr => {
        if self.bitrate > 0 {
          let bt_str = format!("{}K", self.bitrate);
          info!("`libsvtav1`, bitrate: {}", bt_str);
          opt_set(priv_data, "b", &bt_str);
        }
      }
      Av1RateControl::None => {}
    }

    match self.tune_mode {
      Av1Tune::VisualQuality => {
        info!("`libsvtav1`, tune: visual_quality (0)");
        opt_set(priv_data, "tune", "0");
      }
      Av1Tune::Psnr => {
        info!("`libsvtav1`, tune: psnr (1)");
        opt_set(priv_data, "tune", "1");
      }
      Av1Tune::None => {}
    }

    if self.gop_size > 0 {
      info!("`libsvtav1`, gop_size: {}", self.gop_size);
      opt_set(priv_data, "g", &self.gop_size.to_string());
    }

    if let Some(advanced) = &self.advanced_options {
      info!("`libsvtav1`, advanced_options: {}", advanced);
      opt_set_from_string(priv_data, advanced);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_speed_preset_table() {
    assert_eq!(map_speed_to_preset(16), 13);
    assert_eq!(map_speed_to_preset(15), 12);
    assert_eq!(map_speed_to_preset(14), 11);
    assert_eq!(map_speed_to_preset(13), 10);
    assert_eq!(map_speed_to_preset(12), 9);
    assert_eq!(map_speed_to_preset(11), 9);
    assert_eq!(map_speed_to_preset(10), 8);
    assert_eq!(map_speed_to_preset(9), 8);
    assert_eq!(map_speed_to_preset(8), 7);
    assert_eq!(map_speed_to_preset(7), 7);
    assert_eq!(map_speed_to_preset(6), 6);
    assert_eq!(map_speed_to_preset(5), 5);
    assert_eq!(map_speed_to_preset(4), 4);
    assert_eq!(map_speed_to_preset(3), 3);
    assert_eq!(map_speed_to_preset(2), 2);
    assert_eq!(map_speed_to_preset(1), 1);
  }

  #[test]
  fn test_speed_preset_monotonic() {
    for speed in 1..16 {
      assert!(map_speed_to_preset(speed) <= map_speed_to_preset(speed + 1));
    }
  }

  #[test]
  fn test_quality_crf_endpoints() {
    assert_eq!(map_quality_to_crf(1), 40);
    assert_eq!(map_quality_to_crf(16), 20);
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
    assert_eq!(map_speed_to_preset(99), map_speed_to_preset(16));
    assert_eq!(map_quality_to_crf(0), map_quality_to_crf(1));
    assert_eq!(map_quality_to_crf(17), map_quality_to_crf(16));
  }

  #[test]
  fn test_codec_id() {
    assert_eq!(Av1Options::default().codec_id(), CodecId::Av1);
  }
}
