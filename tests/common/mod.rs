//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rust_hessio::records::{
    AdcData, CameraOrganisation, CameraSettings, CentralEvent, LaserCalibration, McEvent,
    McRunHeader, McShower, PixelSettings, RecordKind, RunHeader, TelEvent, TelescopeMonitor,
    TriggeredEvent,
};
use rust_hessio::stream::{FramedWriter, MemorySource, RawRecord};
use serde::Serialize;

/// Builds the record sequence of one run.
pub struct RunBuilder {
    run: i32,
    records: Vec<RawRecord>,
}

impl RunBuilder {
    /// Run header with telescopes placed 10 m apart on the x axis.
    pub fn new(run: i32, tel_ids: &[i32]) -> Self {
        let header = RunHeader {
            run,
            time: 1_500_000_000,
            tel_id: tel_ids.to_vec(),
            tel_pos: (0..tel_ids.len()).map(|i| [10.0 * i as f64, 0.0, 0.0]).collect(),
            min_tel_trig: 1,
            target: "Crab".into(),
            observer: "sim_telarray".into(),
            ..Default::default()
        };
        Self::with_header(header)
    }

    pub fn with_header(header: RunHeader) -> Self {
        let run = header.run;
        let mut builder = Self {
            run,
            records: Vec::new(),
        };
        builder.push(RecordKind::RunHeader, run, &header);
        builder
    }

    pub fn push<T: Serialize>(&mut self, kind: RecordKind, ident: i32, value: &T) -> &mut Self {
        self.records
            .push(RawRecord::encode(kind, ident, value).unwrap());
        self
    }

    pub fn raw(&mut self, record: RawRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    /// Camera settings, organisation (two gains) and pixel settings.
    pub fn camera(&mut self, tel_id: i32, pixels: usize, mirror_area: f64) -> &mut Self {
        let settings = CameraSettings {
            flen: 16.0,
            eff_flen: 16.0,
            num_mirrors: 198,
            mirror_area,
            cam_rot: 0.0,
            xpix: (0..pixels).map(|p| p as f64 * 0.05).collect(),
            ypix: vec![0.0; pixels],
            area: vec![0.0025; pixels],
            size: vec![0.05; pixels],
        };
        let organisation = CameraOrganisation {
            num_gains: 2,
            num_drawers: 1,
            num_sectors: 1,
            drawer: (0..pixels as i32).collect(),
        };
        let pixel_settings = PixelSettings {
            sum_bins: 30,
            time_slice: 1.0,
            ..Default::default()
        };
        self.push(RecordKind::CameraSettings, tel_id, &settings)
            .push(RecordKind::CameraOrganisation, tel_id, &organisation)
            .push(RecordKind::PixelSettings, tel_id, &pixel_settings)
    }

    /// Monitoring pedestal and laser calibration factor, identical for every pixel.
    pub fn calibration(&mut self, tel_id: i32, pixels: usize, pedestal: f64, factor: f64) -> &mut Self {
        let monitor = TelescopeMonitor {
            pedestal: vec![vec![pedestal; pixels]; 2],
            noise: vec![vec![1.0; pixels]; 2],
            ..Default::default()
        };
        let laser = LaserCalibration {
            calib: vec![vec![factor; pixels]; 2],
            ..Default::default()
        };
        self.push(RecordKind::TelescopeMonitor, tel_id, &monitor)
            .push(RecordKind::LaserCalibration, tel_id, &laser)
    }

    pub fn mc_run_header(&mut self) -> &mut Self {
        let header = McRunHeader {
            core_range: [0.0, 1500.0],
            alt_range: [1.2217, 1.2217],
            az_range: [0.0, 0.0],
            viewcone: [0.0, 0.0],
            e_range: [0.003, 330.0],
            spectral_index: -2.0,
            ..Default::default()
        };
        let run = self.run;
        self.push(RecordKind::McRunHeader, run, &header)
    }

    pub fn shower(&mut self, shower_num: i32, energy: f64) -> &mut Self {
        let shower = McShower {
            shower_num,
            primary_id: 0,
            energy,
            altitude: 1.2217,
            xmax: 300.0,
            ..Default::default()
        };
        let event = McEvent {
            event: shower_num * 100,
            shower_num,
            xcore: 12.5,
            ycore: -3.0,
        };
        self.push(RecordKind::McShower, shower_num, &shower)
            .push(RecordKind::McEvent, shower_num * 100, &event)
    }

    /// Triggered event in which every telescope of `tel_ids` reports `sum` on both gains
    /// of every pixel.
    pub fn event(&mut self, event_id: i32, tel_ids: &[i32], pixels: usize, sum: u32) -> &mut Self {
        let event = TriggeredEvent {
            central: CentralEvent {
                glob_count: event_id,
                teltrg_list: tel_ids.to_vec(),
                teldata_list: tel_ids.to_vec(),
                ..Default::default()
            },
            tel_events: tel_ids
                .iter()
                .map(|&tel_id| TelEvent {
                    tel_id,
                    glob_count: event_id,
                    raw: Some(adc(pixels, sum)),
                    ..Default::default()
                })
                .collect(),
        };
        self.push(RecordKind::Event, event_id, &event)
    }

    pub fn build(&self) -> Vec<RawRecord> {
        self.records.clone()
    }

    pub fn source(&self) -> MemorySource {
        MemorySource::new(self.build())
    }

    /// Writes the framed records to `path`.
    pub fn write_to(&self, path: &Path) {
        write_records(path, &self.records);
    }
}

pub fn write_records(path: &Path, records: &[RawRecord]) {
    let mut writer = FramedWriter::new(BufWriter::new(File::create(path).unwrap()));
    for record in records {
        writer.write_raw(record).unwrap();
    }
    writer.flush().unwrap();
}

/// Two-gain raw data with every pixel significant and known.
pub fn adc(pixels: usize, sum: u32) -> AdcData {
    AdcData {
        num_pixels: pixels,
        num_samples: 0,
        significant: vec![true; pixels],
        adc_known: vec![vec![true; pixels]; 2],
        adc_sum: vec![vec![sum; pixels]; 2],
        adc_sample: Vec::new(),
    }
}
