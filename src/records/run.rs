//! Run-scoped blocks: run header, simulation header and run statistics.

use serde::{Deserialize, Serialize};

/// Upper bound on telescopes per run.
pub const MAX_TELESCOPES: usize = 1000;

/// Run header: defines the telescope set of a run and its position ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunHeader {
    /// Run number.
    pub run: i32,
    /// Run start, seconds since the Unix epoch.
    pub time: i64,
    pub run_type: i32,
    /// Tracking mode: 0 = Az/Alt, 1 = RA/Dec.
    pub tracking_mode: i32,
    /// Reverse-tracking flag (0 = normal).
    pub reverse_flag: i32,
    /// Tracking direction [rad] (Az/Alt or RA/Dec depending on mode).
    pub direction: [f64; 2],
    /// Offset of the pointing from the source [rad].
    pub offset_fov: [f64; 2],
    /// Atmospheric depth of convergence point [g/cm^2].
    pub conv_depth: f64,
    /// Reference position of the convergence point [m].
    pub conv_ref_pos: [f64; 2],
    /// Telescope identifiers; the index in this list is the telescope position.
    pub tel_id: Vec<i32>,
    /// Telescope positions [m], same order as `tel_id`.
    pub tel_pos: Vec<[f64; 3]>,
    /// Minimum number of telescopes for a valid array trigger.
    pub min_tel_trig: i32,
    /// Requested run duration [s].
    pub duration: i32,
    pub target: String,
    pub observer: String,
}

impl RunHeader {
    /// Number of telescopes in the run.
    pub fn ntel(&self) -> usize {
        self.tel_id.len()
    }

    /// Position of telescope `pos`, or the origin when the header carried none.
    pub fn telescope_position(&self, pos: usize) -> [f64; 3] {
        self.tel_pos.get(pos).copied().unwrap_or_default()
    }
}

/// Simulation-wide constants of a Monte-Carlo run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McRunHeader {
    pub shower_prog_id: i32,
    pub shower_prog_vers: i32,
    pub detector_prog_id: i32,
    pub detector_prog_vers: i32,
    /// Height of observation level [m].
    pub obsheight: f64,
    pub num_showers: i32,
    /// Number of uses of each shower.
    pub num_use: i32,
    pub core_pos_mode: i32,
    /// Core range [m]: lower, upper.
    pub core_range: [f64; 2],
    /// Altitude range [rad].
    pub alt_range: [f64; 2],
    /// Azimuth range [rad].
    pub az_range: [f64; 2],
    /// Non-zero for diffuse (viewcone) simulations.
    pub diffuse: i32,
    /// Viewcone [rad]: inner, outer.
    pub viewcone: [f64; 2],
    /// Energy range [TeV].
    pub e_range: [f64; 2],
    pub spectral_index: f64,
    pub b_total: f64,
    pub b_inclination: f64,
    pub b_declination: f64,
    pub injection_height: f64,
    pub atmosphere: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub run_num: i32,
    pub num_central_trig: i32,
    pub tel_ids: Vec<i32>,
    pub num_local_trig: Vec<i32>,
    pub num_local_sys_trig: Vec<i32>,
    pub num_events: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McRunStatistics {
    pub run_num: i32,
    pub num_showers: i32,
    pub num_events: i32,
}
