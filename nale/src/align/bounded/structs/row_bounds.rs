use super::cloud_bound_group::CloudBoundGroup;
use super::edgebounds::{reorient_diag_to_row, Edgebounds};

/// The by-row inner/outer edgebound pair a [`CloudBoundGroup`] reorients
/// into (spec.md §4.4), plus the query-row span they cover. This is what
/// [`super::dp_matrix_sparse::DpMatrixSparse`] shapes itself from and
/// what the bounded Forward/Backward/posterior passes iterate rows
/// over.
#[derive(Debug, Clone, Default)]
pub struct RowBounds {
    pub inner: Edgebounds,
    pub outer: Edgebounds,
    pub target_start: usize,
    pub target_end: usize,
}

impl RowBounds {
    /// Reorient `group`'s already-merged, already-padded antidiagonal
    /// sets into by-row form. `group.inner` must have been through
    /// [`CloudBoundGroup::finalize`]/[`CloudBoundGroup::join_bounds`],
    /// and `group.outer` through [`CloudBoundGroup::trim_wings`].
    pub fn new(group: &CloudBoundGroup) -> Self {
        let mut row_bounds = Self::default();
        row_bounds.reuse(group);
        row_bounds
    }

    pub fn reuse(&mut self, group: &CloudBoundGroup) {
        let mut inner_src = group.inner.clone();
        let mut outer_src = group.outer.clone();

        reorient_diag_to_row(&mut inner_src, &mut self.inner);
        reorient_diag_to_row(&mut outer_src, &mut self.outer);
        self.inner.sort();
        self.outer.sort();
        self.inner.index_rows();
        self.outer.index_rows();

        let (lo, hi) = row_extent(&self.inner);
        self.target_start = lo;
        self.target_end = hi;
    }

    /// True iff the reoriented cloud named at least one row (spec.md
    /// §7, "Empty cloud"). An empty `RowBounds` means the seed was
    /// rejected upstream and the pair must not be scored.
    pub fn valid(&self) -> bool {
        !self.inner.is_empty()
    }
}

fn row_extent(rows: &Edgebounds) -> (usize, usize) {
    match (rows.bounds.first(), rows.bounds.last()) {
        (Some(first), Some(last)) => (first.id, last.id),
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::super::bound::Bound;
    use super::*;

    #[test]
    fn reuse_builds_row_span_from_antidiagonal_cloud() {
        let mut group = CloudBoundGroup::new(10, 10);
        group.push(Bound::new(4, 2, 3));
        group.push(Bound::new(5, 2, 4));
        group.push(Bound::new(6, 3, 4));
        group.finalize();
        group.trim_wings();

        let row_bounds = RowBounds::new(&group);
        assert!(row_bounds.valid());
        assert!(row_bounds.target_start <= row_bounds.target_end);
    }

    #[test]
    fn empty_group_yields_invalid_row_bounds() {
        let group = CloudBoundGroup::new(10, 10);
        let row_bounds = RowBounds::new(&group);
        assert!(!row_bounds.valid());
    }
}
