//! Per-object accumulation storage.

/// A dense `n_objects × width` table of per-object accumulation state.
///
/// Rows are default-initialized at allocation. During a parallel scan each
/// thread fills its own table over a disjoint set of lines; tables are then
/// combined row-wise with [`Records::merge_with`], whose `combine` argument is
/// the element merge operation (plain addition for raw-moment records, the
/// accumulator combine operator for accumulator records).
#[derive(Debug, Clone, Default)]
pub struct Records<T> {
    width: usize,
    data: Vec<T>,
}

impl<T: Default + Clone> Records<T> {
    pub fn new(n_objects: usize, width: usize) -> Self {
        Self {
            width,
            data: vec![T::default(); n_objects * width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn n_objects(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.data.len() / self.width
        }
    }

    pub fn row(&self, r: usize) -> &[T] {
        &self.data[r * self.width..(r + 1) * self.width]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [T] {
        &mut self.data[r * self.width..(r + 1) * self.width]
    }

    /// Combines `other` into `self` element by element. Both tables must have
    /// the same shape.
    pub fn merge_with<F>(&mut self, other: &Records<T>, mut combine: F)
    where
        F: FnMut(&mut T, &T),
    {
        assert_eq!(self.width, other.width, "record tables must share a width");
        assert_eq!(
            self.data.len(),
            other.data.len(),
            "record tables must share an object count"
        );
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            combine(a, b);
        }
    }

    /// Releases the storage. Used by the cleanup step once values are final.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.width = 0;
    }
}
