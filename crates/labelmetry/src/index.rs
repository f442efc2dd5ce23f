//! Object-id to row-index mapping.

use std::collections::{BTreeSet, HashMap};

use crate::image::LabelImage;

/// Injective map from object ids (positive, 0 is background) to dense row
/// indices in the measurement table.
///
/// Built once before scanning, read-only afterwards. Ids missing from the
/// index (filtered or pruned objects) simply resolve to `None` and their
/// pixels are skipped during the scan.
#[derive(Debug, Clone, Default)]
pub struct ObjectIndex {
    ids: Vec<u32>,
    rows: HashMap<u32, usize>,
}

impl ObjectIndex {
    /// Indexes every distinct non-zero id present in the label image.
    pub fn from_label_image(labels: &LabelImage) -> Self {
        let ids: BTreeSet<u32> = labels.data().iter().copied().filter(|&id| id != 0).collect();
        Self::from_sorted(ids.into_iter().collect())
    }

    /// Indexes an explicit id list; duplicates and zeros are dropped.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let ids: BTreeSet<u32> = ids.into_iter().filter(|&id| id != 0).collect();
        Self::from_sorted(ids.into_iter().collect())
    }

    fn from_sorted(ids: Vec<u32>) -> Self {
        let rows = ids.iter().enumerate().map(|(r, &id)| (id, r)).collect();
        Self { ids, rows }
    }

    /// Row index of `id`, or `None` when the id is not part of the
    /// measurement.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.rows.get(&id).copied()
    }

    /// Indexed ids, sorted ascending.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
