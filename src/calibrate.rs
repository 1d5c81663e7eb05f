//! Pixel amplitude calibration.
//!
//! Converts raw ADC sums into a peak photo-electron amplitude using the telescope's
//! monitoring pedestals and laser calibration factors. The high-gain channel is used
//! while its pedestal-subtracted signal stays inside its linear range, the low-gain
//! channel otherwise.

use crate::aggregate::{Aggregate, RunState};
use crate::records::{HI_GAIN, LO_GAIN};

/// Ratio between mean and peak photo-electron amplitude of a single photo-electron.
pub const CALIB_SCALE: f64 = 0.92;

/// Pedestal-subtracted high-gain signals inside this open interval are trusted.
pub const HI_GAIN_RANGE: (f64, f64) = (-1000.0, 10000.0);

/// Calibrated amplitude of `pixel` of the telescope at `telescope_pos`, in peak
/// photo-electrons. Zero whenever the event holds no usable raw data for the pixel.
pub fn amplitude(aggregate: &Aggregate, telescope_pos: usize, pixel: usize) -> f64 {
    aggregate
        .run()
        .map_or(0.0, |run| run_amplitude(run, telescope_pos, pixel))
}

/// [`amplitude`] for an open run.
pub fn run_amplitude(run: &RunState, telescope_pos: usize, pixel: usize) -> f64 {
    let (Some(tel), Some(slot)) = (run.telescope(telescope_pos), run.event_slot(telescope_pos))
    else {
        return 0.0;
    };
    if pixel >= tel.num_pixels() {
        return 0.0;
    }
    let Some(raw) = slot.known_raw() else {
        return 0.0;
    };
    if !raw.is_significant(pixel) {
        return 0.0;
    }

    let pedestal = |gain| tel.monitor.as_ref().map_or(0.0, |m| m.pedestal(gain, pixel));
    let factor = |gain| {
        tel.laser_calibration
            .as_ref()
            .map_or(0.0, |c| c.factor(gain, pixel))
    };
    let signal = |gain| {
        if raw.is_known(gain, pixel) {
            raw.sum(gain, pixel)
                .map_or(0.0, |sum| f64::from(sum) - pedestal(gain))
        } else {
            0.0
        }
    };

    let hg_known = raw.is_known(HI_GAIN, pixel);
    let sig_hg = signal(HI_GAIN);
    let npe_hg = sig_hg * factor(HI_GAIN);

    let npe = if hg_known && sig_hg > HI_GAIN_RANGE.0 && sig_hg < HI_GAIN_RANGE.1 {
        npe_hg
    } else if raw.num_gains() >= 2 {
        signal(LO_GAIN) * factor(LO_GAIN)
    } else {
        npe_hg
    };
    npe * CALIB_SCALE
}

/// Calibrated amplitudes of every configured pixel of one telescope.
pub fn telescope_amplitudes(run: &RunState, telescope_pos: usize) -> Vec<f64> {
    let n = run.telescope(telescope_pos).map_or(0, |t| t.num_pixels());
    (0..n)
        .map(|pix| run_amplitude(run, telescope_pos, pix))
        .collect()
}
