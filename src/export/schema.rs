//! Column layouts of the exported tables.

use serde::Serialize;

/// Name of the run-header table, shared by all runs.
pub const RUN_HEADER_TABLE: &str = "HEADER_RUN";

/// Unit string of dimensionless or counted values.
pub const DN: &str = "DN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
}

/// One column of an exported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub unit: &'static str,
    pub kind: ColumnKind,
}

const fn int(name: &'static str, unit: &'static str) -> Column {
    Column {
        name,
        unit,
        kind: ColumnKind::Int,
    }
}

const fn float(name: &'static str, unit: &'static str) -> Column {
    Column {
        name,
        unit,
        kind: ColumnKind::Float,
    }
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        unit: DN,
        kind: ColumnKind::Text,
    }
}

pub const RUN_HEADER_COLUMNS: [Column; 17] = [
    int("run_number", DN),
    text("run_start_time"),
    int("run_type", DN),
    int("tracking_mode", DN),
    float("tracking_pos_x", "[rad]"),
    float("tracking_pos_y", "[rad]"),
    float("offset_fov_x", "[rad]"),
    float("offset_fov_y", "[rad]"),
    int("reverse_flag", DN),
    float("conv_depth", "[g/cm^2]"),
    float("conv_ref_pos_x", "[m]"),
    float("conv_ref_pos_y", "[m]"),
    int("number_telescopes", DN),
    int("min_number_telescopes_trigger", DN),
    int("duration", "[s]"),
    text("target"),
    text("observer"),
];

pub const TELESCOPE_COLUMNS: [Column; 11] = [
    int("tel_id", DN),
    float("tel_pos_x", "[m]"),
    float("tel_pos_y", "[m]"),
    float("tel_pos_z", "[m]"),
    float("focal_length", "[m]"),
    float("mirror_area", "[m^2]"),
    int("num_mirrors", DN),
    int("num_pixels", DN),
    float("camera_rot", "[rad]"),
    int("num_gains", DN),
    int("num_slices", DN),
];

pub const PIXEL_COLUMNS: [Column; 7] = [
    int("tel_id", DN),
    int("pixel_id", DN),
    float("pixel_pos_x", "[m]"),
    float("pixel_pos_y", "[m]"),
    float("pixel_area", "[m^2]"),
    float("pixel_size", "[m]"),
    int("drawer", DN),
];

pub const MC_SHOWER_COLUMNS: [Column; 12] = [
    int("seq", DN),
    int("shower_num", DN),
    int("primary_id", DN),
    float("energy", "[TeV]"),
    float("azimuth", "[rad]"),
    float("altitude", "[rad]"),
    float("depth_start", "[g/cm^2]"),
    float("h_first_int", "[m]"),
    float("xmax", "[g/cm^2]"),
    float("hmax", "[m]"),
    float("emax", "[g/cm^2]"),
    float("cmax", "[g/cm^2]"),
];

pub fn telescope_table(run: i32) -> String {
    format!("HEADER_TEL_{run}")
}

pub fn pixel_table(run: i32) -> String {
    format!("HEADER_CAM_{run}")
}

pub fn mc_shower_table(run: i32) -> String {
    format!("MC_SHOWER_{run}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_column_has_a_unit() {
        for columns in [
            &RUN_HEADER_COLUMNS[..],
            &TELESCOPE_COLUMNS[..],
            &PIXEL_COLUMNS[..],
            &MC_SHOWER_COLUMNS[..],
        ] {
            assert!(columns.iter().all(|c| !c.unit.is_empty() && !c.name.is_empty()));
        }
    }

    #[test]
    fn per_run_table_names() {
        assert_eq!(telescope_table(103), "HEADER_TEL_103");
        assert_eq!(pixel_table(103), "HEADER_CAM_103");
        assert_eq!(mc_shower_table(103), "MC_SHOWER_103");
    }
}
