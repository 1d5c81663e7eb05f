//! Per-telescope configuration blocks.
//!
//! Each block is addressed to one telescope by the identifier in its record header and
//! lands in that telescope's slot of the run aggregate.

use serde::{Deserialize, Serialize};

/// Upper bound on pixels per camera.
pub const MAX_PIXELS: usize = 16384;

/// Upper bound on gain channels per pixel.
pub const MAX_GAINS: usize = 2;

/// Index of the high-gain channel in per-gain tables.
pub const HI_GAIN: usize = 0;

/// Index of the low-gain channel in per-gain tables.
pub const LO_GAIN: usize = 1;

/// Camera geometry and optics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Focal length [m].
    pub flen: f64,
    /// Effective focal length [m], 0 if unknown.
    pub eff_flen: f64,
    /// Number of mirror tiles.
    pub num_mirrors: i32,
    /// Total mirror area corrected for inclination [m^2].
    pub mirror_area: f64,
    /// Camera rotation angle [rad].
    pub cam_rot: f64,
    /// Pixel x positions in the camera [m].
    pub xpix: Vec<f64>,
    /// Pixel y positions in the camera [m].
    pub ypix: Vec<f64>,
    /// Pixel areas [m^2].
    pub area: Vec<f64>,
    /// Pixel sizes [m].
    pub size: Vec<f64>,
}

impl CameraSettings {
    /// Number of pixels in the camera, as configured.
    pub fn num_pixels(&self) -> usize {
        self.xpix.len()
    }
}

/// Camera electronics organisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraOrganisation {
    pub num_gains: i32,
    pub num_drawers: i32,
    pub num_sectors: i32,
    /// Drawer of each pixel.
    pub drawer: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelSettings {
    pub setup_id: i32,
    pub trigger_mode: i32,
    pub min_pixel_mult: i32,
    pub hv_dac: Vec<i32>,
    /// Number of time slices summed into the ADC sum.
    pub sum_bins: i32,
    /// Width of one time slice [ns].
    pub time_slice: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelDisabled {
    pub hv_disabled: Vec<i32>,
    pub trigger_disabled: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraSoftSettings {
    pub dyn_trig_mode: i32,
    pub dyn_trig_threshold: i32,
    pub dyn_hv_mode: i32,
    pub dyn_hv_threshold: i32,
    pub data_red_mode: i32,
    pub zero_sup_mode: i32,
    pub zero_sup_num_thr: i32,
    pub zero_sup_thresholds: Vec<i32>,
    pub unbiased_scale: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointingCorrection {
    pub function_type: i32,
    pub pointing_param: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingSetup {
    pub drive_type_az: i32,
    pub drive_type_alt: i32,
    pub zeta_az: f64,
    pub zeta_alt: f64,
    pub d_az: f64,
    pub d_alt: f64,
    pub r_az: f64,
    pub r_alt: f64,
    pub ref_az: f64,
    pub ref_alt: f64,
    pub range_low_az: f64,
    pub range_low_alt: f64,
    pub range_high_az: f64,
    pub range_high_alt: f64,
}

/// Slow-control monitoring, notably the pedestals used by the calibrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelescopeMonitor {
    pub monitor_id: i32,
    /// Monitoring time, seconds since the Unix epoch.
    pub moni_time: i64,
    /// Average pedestal on ADC sums, indexed `[gain][pixel]`.
    pub pedestal: Vec<Vec<f64>>,
    /// Average pedestal noise on ADC sums, indexed `[gain][pixel]`.
    pub noise: Vec<Vec<f64>>,
    pub hv_v_mean: f64,
    pub current_mean: f64,
}

impl TelescopeMonitor {
    /// Pedestal for one gain and pixel; missing entries read as zero.
    pub fn pedestal(&self, gain: usize, pixel: usize) -> f64 {
        self.pedestal
            .get(gain)
            .and_then(|row| row.get(pixel))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Laser/LED calibration: ADC to photo-electron conversion factors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserCalibration {
    pub lascal_id: i32,
    /// Conversion factor, indexed `[gain][pixel]`.
    pub calib: Vec<Vec<f64>>,
    pub max_int_frac: Vec<f64>,
    pub max_pixtm_frac: Vec<f64>,
}

impl LaserCalibration {
    /// Calibration factor for one gain and pixel; missing entries read as zero.
    pub fn factor(&self, gain: usize, pixel: usize) -> f64 {
        self.calib
            .get(gain)
            .and_then(|row| row.get(pixel))
            .copied()
            .unwrap_or(0.0)
    }
}
