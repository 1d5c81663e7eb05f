//! Event blocks: central trigger data plus per-telescope raw data, timing and images.

use serde::{Deserialize, Serialize};

use super::camera::MAX_GAINS;

/// Which event record filled the current event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Triggered,
    Calibration,
}

/// Central trigger data of an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralEvent {
    /// Global event count.
    pub glob_count: i32,
    /// CPU time of the central trigger, seconds since the Unix epoch.
    pub cpu_time: i64,
    pub gps_time: i64,
    pub teltrg_pattern: i32,
    /// Identifiers of telescopes that triggered.
    pub teltrg_list: Vec<i32>,
    /// Relative trigger times, same order as `teltrg_list` [ns].
    pub teltrg_time: Vec<f32>,
    /// Identifiers of telescopes that sent data.
    pub teldata_list: Vec<i32>,
}

/// Raw ADC data of one telescope, per gain and per pixel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdcData {
    pub num_pixels: usize,
    /// Time slices per pixel in `adc_sample`; 0 when only sums were recorded.
    pub num_samples: usize,
    /// Per pixel: whether the pixel survived zero suppression.
    pub significant: Vec<bool>,
    /// `[gain][pixel]`: whether `adc_sum` holds a real value.
    pub adc_known: Vec<Vec<bool>>,
    /// `[gain][pixel]`: summed ADC counts.
    pub adc_sum: Vec<Vec<u32>>,
    /// `[gain][pixel * num_samples + slice]`: sampled ADC counts, possibly empty.
    pub adc_sample: Vec<Vec<u16>>,
}

impl AdcData {
    /// Number of gain channels present.
    pub fn num_gains(&self) -> usize {
        self.adc_sum.len()
    }

    pub fn is_significant(&self, pixel: usize) -> bool {
        self.significant.get(pixel).copied().unwrap_or(false)
    }

    pub fn is_known(&self, gain: usize, pixel: usize) -> bool {
        self.adc_known
            .get(gain)
            .and_then(|row| row.get(pixel))
            .copied()
            .unwrap_or(false)
    }

    pub fn sum(&self, gain: usize, pixel: usize) -> Option<u32> {
        self.adc_sum.get(gain).and_then(|row| row.get(pixel)).copied()
    }

    /// Time samples of one pixel in one gain, if samples were recorded.
    pub fn samples(&self, gain: usize, pixel: usize) -> Option<&[u16]> {
        if self.num_samples == 0 {
            return None;
        }
        let start = pixel.checked_mul(self.num_samples)?;
        let end = start.checked_add(self.num_samples)?;
        self.adc_sample.get(gain)?.get(start..end)
    }

    /// Checks that the per-gain tables agree with the declared dimensions.
    pub fn validate(&self) -> Result<(), String> {
        let gains = self.num_gains();
        if gains == 0 || gains > MAX_GAINS {
            return Err(format!("{gains} gain channels (expected 1..={MAX_GAINS})"));
        }
        if self.adc_known.len() != gains {
            return Err(format!(
                "{} known-flag tables for {gains} gains",
                self.adc_known.len()
            ));
        }
        if self.significant.len() != self.num_pixels {
            return Err(format!(
                "{} significance flags for {} pixels",
                self.significant.len(),
                self.num_pixels
            ));
        }
        for gain in 0..gains {
            if self.adc_sum[gain].len() != self.num_pixels
                || self.adc_known[gain].len() != self.num_pixels
            {
                return Err(format!("gain {gain} tables do not cover {} pixels", self.num_pixels));
            }
        }
        if !self.adc_sample.is_empty() {
            let expected = self
                .num_pixels
                .checked_mul(self.num_samples)
                .ok_or_else(|| "sample table size overflows".to_string())?;
            if self.adc_sample.len() != gains
                || self.adc_sample.iter().any(|s| s.len() != expected)
            {
                return Err(format!(
                    "sample tables do not cover {} pixels x {} slices",
                    self.num_pixels, self.num_samples
                ));
            }
        }
        Ok(())
    }
}

/// Pixel timing summary of one telescope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelTiming {
    pub num_pixels: usize,
    /// Kinds of timing values per pixel (peak position, rise time, ...).
    pub time_type: Vec<i32>,
    pub time_level: Vec<f32>,
    /// Minimum amplitude for a pixel to carry timing values.
    pub threshold: i32,
    /// Global peak position [time slices].
    pub peak_global: f32,
    /// `[pixel][type]` timing values [time slices].
    pub timval: Vec<Vec<f32>>,
}

impl PixelTiming {
    pub fn num_types(&self) -> usize {
        self.time_type.len()
    }
}

/// Hillas-style image parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageParameters {
    pub cut_id: i32,
    pub pixels: i32,
    pub amplitude: f64,
    pub x: f64,
    pub y: f64,
    pub phi: f64,
    pub l: f64,
    pub w: f64,
    pub num_conc: i32,
    pub concentration: f64,
}

/// Data one telescope contributed to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelEvent {
    pub tel_id: i32,
    pub loc_count: i32,
    pub glob_count: i32,
    pub readout_mode: i32,
    pub raw: Option<AdcData>,
    pub timing: Option<PixelTiming>,
    /// At most two image-parameter sets are kept.
    pub images: Vec<ImageParameters>,
}

/// A triggered array event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggeredEvent {
    pub central: CentralEvent,
    pub tel_events: Vec<TelEvent>,
}

/// A calibration event wraps an ordinary event with its calibration type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEvent {
    pub calibration_type: i32,
    pub event: TriggeredEvent,
}
