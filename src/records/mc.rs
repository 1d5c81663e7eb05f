//! Monte-Carlo truth blocks.

use serde::{Deserialize, Serialize};

/// Simulated air shower.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McShower {
    pub shower_num: i32,
    /// Primary particle: 0 = gamma, 1 = electron, 2 = muon, 100*A+Z for nucleons and nuclei.
    pub primary_id: i32,
    /// Primary energy [TeV].
    pub energy: f64,
    /// Azimuth of the shower direction [rad].
    pub azimuth: f64,
    /// Altitude of the shower direction [rad].
    pub altitude: f64,
    /// Atmospheric depth where particle tracking started [g/cm^2].
    pub depth_start: f64,
    /// Height of first interaction a.s.l. [m].
    pub h_first_int: f64,
    /// Depth of shower maximum [g/cm^2].
    pub xmax: f64,
    /// Height of shower maximum [m].
    pub hmax: f64,
    /// Depth of maximum of the electron count [g/cm^2].
    pub emax: f64,
    /// Depth of maximum of the Cherenkov emission [g/cm^2].
    pub cmax: f64,
}

/// One use of a shower: core position relative to the array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McEvent {
    pub event: i32,
    pub shower_num: i32,
    /// Core position [m].
    pub xcore: f64,
    pub ycore: f64,
}

/// Photon bunch statistics of one telescope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct McTelPhotons {
    pub tel_id: i32,
    /// Photons arriving at the telescope.
    pub photons: f64,
    /// Photons produced by the atmosphere model, before losses.
    pub photons_atm: f64,
    /// Photo-electrons from the simulation of this telescope.
    pub photoelectrons: f64,
}

/// Per-telescope photon statistics for an MC event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McTelArray {
    pub shower_num: i32,
    pub telescopes: Vec<McTelPhotons>,
}

/// Photo-electron sums, indexed by telescope position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McPeSum {
    pub event: i32,
    pub shower_num: i32,
    pub num_pe: Vec<i32>,
    pub num_pixels: Vec<i32>,
}
