//! Array-layout selection.
//!
//! A layout names a sub-array as four telescope lists, one per size class. A telescope
//! is included when its mirror area places it in a class and that class's list names its
//! identifier. Selection only flips the per-telescope [`Inclusion`] marker; decoded
//! configuration is never modified.
//!
//! Lists are comma-separated entries, each either an identifier or an inclusive
//! `first-last` range:
//!
//! ```
//! use rust_hessio::layout::TelescopeSelector;
//!
//! let lst = TelescopeSelector::parse("1,5-8,12");
//! assert!(lst.contains(6));
//! assert!(!lst.contains(9));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregate, Inclusion, RunState};
use crate::error::{AppResult, HessioError};

/// Telescope size classes, distinguished by mirror area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    Lst,
    Mst,
    Sst,
    Sct,
}

impl SizeClass {
    /// Order of the class lists in a layout table entry.
    pub const ALL: [SizeClass; 4] = [SizeClass::Lst, SizeClass::Mst, SizeClass::Sst, SizeClass::Sct];

    /// Nominal mirror area [m^2].
    pub const fn nominal_area(self) -> f64 {
        match self {
            SizeClass::Lst => 400.0,
            SizeClass::Mst => 100.0,
            SizeClass::Sst => 15.0,
            SizeClass::Sct => 1000.0,
        }
    }

    /// Half width of the accepted mirror-area window [m^2].
    pub const fn tolerance(self) -> f64 {
        match self {
            SizeClass::Sst => 10.0,
            SizeClass::Lst | SizeClass::Mst | SizeClass::Sct => 50.0,
        }
    }

    /// Whether `mirror_area` lies strictly inside this class's window.
    pub fn contains(self, mirror_area: f64) -> bool {
        let nominal = self.nominal_area();
        let tol = self.tolerance();
        mirror_area > nominal - tol && mirror_area < nominal + tol
    }

    /// Class whose window contains `mirror_area`, if any.
    pub fn classify(mirror_area: f64) -> Option<SizeClass> {
        Self::ALL.into_iter().find(|class| class.contains(mirror_area))
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SizeClass::Lst => "LST",
            SizeClass::Mst => "MST",
            SizeClass::Sst => "SST",
            SizeClass::Sct => "SCT",
        })
    }
}

/// Set of telescope identifiers parsed from a selector list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelescopeSelector {
    ranges: Vec<RangeInclusive<i32>>,
}

impl TelescopeSelector {
    /// Parses a comma-separated list. Malformed entries are skipped with a warning.
    pub fn parse(list: &str) -> Self {
        let mut ranges = Vec::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match parse_entry(entry) {
                Some(range) => ranges.push(range),
                None => warn!(entry, "Skipping malformed telescope list entry"),
            }
        }
        Self { ranges }
    }

    pub fn contains(&self, tel_id: i32) -> bool {
        self.ranges.iter().any(|r| r.contains(&tel_id))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_entry(entry: &str) -> Option<RangeInclusive<i32>> {
    if let Ok(id) = entry.parse::<i32>() {
        return Some(id..=id);
    }
    let (first, last) = entry.split_once('-')?;
    let first = first.trim().parse::<i32>().ok()?;
    let last = last.trim().parse::<i32>().ok()?;
    Some(first..=last)
}

/// Source of layout definitions.
pub trait LayoutTable {
    /// Selector lists for `name`, in [`SizeClass::ALL`] order.
    fn lookup(&self, name: &str) -> Option<[String; 4]>;
}

/// One layout as written in a catalog file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutEntry {
    pub lst: String,
    pub mst: String,
    pub sst: String,
    pub sct: String,
}

/// Layout definitions keyed by name, loaded from TOML:
///
/// ```toml
/// [layouts.baseline]
/// lst = "1-4"
/// mst = "5-28"
/// sst = "29-98"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutCatalog {
    #[serde(default)]
    pub layouts: HashMap<String, LayoutEntry>,
}

impl LayoutCatalog {
    pub fn from_toml_str(text: &str) -> AppResult<Self> {
        toml::from_str(text).map_err(|e| HessioError::Layout(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HessioError::Layout(format!("cannot read {}: {e}", path.display()))
        })?;
        let catalog = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), layouts = catalog.layouts.len(), "Loaded layout catalog");
        Ok(catalog)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: LayoutEntry) {
        self.layouts.insert(name.into(), entry);
    }
}

impl LayoutTable for LayoutCatalog {
    fn lookup(&self, name: &str) -> Option<[String; 4]> {
        self.layouts
            .get(name.trim())
            .map(|e| [e.lst.clone(), e.mst.clone(), e.sst.clone(), e.sct.clone()])
    }
}

/// Outcome of [`apply_layout`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub layout: String,
    /// Whether the reference table knew the layout.
    pub found: bool,
    pub included: usize,
    pub excluded: usize,
    /// Included telescopes per class, in [`SizeClass::ALL`] order.
    pub per_class: [usize; 4],
}

/// Marks every telescope of the live run as included in or excluded from `layout_name`.
///
/// Idempotent. An unknown layout excludes every telescope.
pub fn apply_layout(
    aggregate: &mut Aggregate,
    layout_name: &str,
    table: &dyn LayoutTable,
) -> LayoutReport {
    let mut report = LayoutReport {
        layout: layout_name.to_string(),
        ..Default::default()
    };
    let Some(run) = aggregate.run_mut() else {
        return report;
    };

    let lists = table.lookup(layout_name);
    report.found = lists.is_some();
    if !report.found {
        warn!(layout = layout_name, "Layout not found; all telescopes excluded");
    }
    let selectors: Vec<TelescopeSelector> = lists
        .map(|lists| lists.iter().map(|l| TelescopeSelector::parse(l)).collect())
        .unwrap_or_default();

    for tel in &mut run.telescopes {
        tel.inclusion = Inclusion::Excluded;
        let Some(area) = tel.mirror_area() else {
            continue;
        };
        for (i, (class, selector)) in SizeClass::ALL.iter().zip(&selectors).enumerate() {
            if class.contains(area) && selector.contains(tel.tel_id) {
                tel.inclusion = Inclusion::Included;
                report.per_class[i] += 1;
                debug!(tel_id = tel.tel_id, class = %class, "Telescope in layout");
            }
        }
    }

    report.included = run.telescopes.iter().filter(|t| t.is_included()).count();
    report.excluded = run.ntel() - report.included;
    info!(
        layout = layout_name,
        run = run.run_number(),
        included = report.included,
        excluded = report.excluded,
        "Applied array layout"
    );
    report
}

/// Whether the current event still has enough triggered telescopes once the telescopes
/// excluded by the layout are discounted.
pub fn passes_layout_trigger(run: &RunState) -> bool {
    let triggered = &run.current_event.central.teltrg_list;
    let excluded = triggered
        .iter()
        .filter(|id| run.telescope_by_id(**id).is_some_and(|t| !t.is_included()))
        .count();
    let remaining = triggered.len() - excluded;
    remaining as i64 >= i64::from(run.header.min_tel_trig)
}
