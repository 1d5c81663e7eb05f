//! Per-file run summary.

use std::fmt;

use serde::Serialize;

use crate::aggregate::RunState;

/// Column legend printed once before the first `@;` line.
pub const SUMMARY_LEGEND: &str = "\
#@; Column 1: Run number
#@;        2: ID of primary particle
#@;        3: Number of MC showers
#@;        4: Number of triggered events passing the layout
#@;        5: Altitude (mean) [deg.]
#@;        6: Azimuth (mean) [deg.]
#@;        7: Cone (max) [deg.]
#@;        8: Lower limit of energy range [TeV]
#@;        9: Upper limit of energy range [TeV]
#@;       10: Spectral index in simulation
#@;       11: Maximum core distance [m]";

/// Simulation parameters and event counts of one run.
///
/// Angles are converted to degrees. Without an MC run header every simulation field
/// is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub run: i32,
    /// Primary of the last MC shower seen.
    pub primary_id: i32,
    pub mc_events: u64,
    pub triggered: u64,
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
    pub viewcone_deg: f64,
    pub energy_min: f64,
    pub energy_max: f64,
    pub spectral_index: f64,
    pub core_range_max: f64,
}

impl RunSummary {
    pub fn from_run(run: &RunState, mc_events: u64, triggered: u64) -> Self {
        let mut summary = Self {
            run: run.run_number(),
            primary_id: run.mc_shower.as_ref().map_or(0, |s| s.primary_id),
            mc_events,
            triggered,
            ..Default::default()
        };
        if let Some(mc) = &run.mc_run_header {
            summary.altitude_deg = 0.5 * (mc.alt_range[0] + mc.alt_range[1]).to_degrees();
            summary.azimuth_deg = 0.5 * (mc.az_range[0] + mc.az_range[1]).to_degrees();
            summary.viewcone_deg = mc.viewcone[1].to_degrees();
            summary.energy_min = mc.e_range[0];
            summary.energy_max = mc.e_range[1];
            summary.spectral_index = mc.spectral_index;
            summary.core_range_max = mc.core_range[1];
        }
        summary
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@; {} {} {} {}   {:5.2} {:5.2} {:4.2}    {:6.4} {:6.4} {:5.3}   {:3.1}",
            self.run,
            self.primary_id,
            self.mc_events,
            self.triggered,
            self.altitude_deg,
            self.azimuth_deg,
            self.viewcone_deg,
            self.energy_min,
            self.energy_max,
            self.spectral_index,
            self.core_range_max,
        )
    }
}
