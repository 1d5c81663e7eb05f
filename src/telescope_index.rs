//! Telescope identifier to position map for one run.

use std::collections::HashMap;

/// Maps telescope identifiers to their position in the run header's telescope list.
///
/// Built once per run; positions are dense in `0..len()`.
#[derive(Debug, Clone, Default)]
pub struct TelescopeIndex {
    ids: Vec<i32>,
    positions: HashMap<i32, usize>,
}

impl TelescopeIndex {
    /// Builds the index from the run header's identifier list.
    ///
    /// Identifiers are expected to be unique; should one repeat, the first position wins.
    pub fn new(ids: &[i32]) -> Self {
        let mut positions = HashMap::with_capacity(ids.len());
        for (pos, id) in ids.iter().enumerate() {
            positions.entry(*id).or_insert(pos);
        }
        Self {
            ids: ids.to_vec(),
            positions,
        }
    }

    /// Position of telescope `tel_id`, if it belongs to the run.
    pub fn position(&self, tel_id: i32) -> Option<usize> {
        self.positions.get(&tel_id).copied()
    }

    /// Identifier of the telescope at `pos`.
    pub fn id_at(&self, pos: usize) -> Option<i32> {
        self.ids.get(pos).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers in position order.
    pub fn ids(&self) -> &[i32] {
        &self.ids
    }
}
