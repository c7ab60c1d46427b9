use super::bound::Bound;
use super::cloud_matrix::NUM_STATES;
use super::edgebounds::Edgebounds;
use super::row_bounds::RowBounds;
use crate::structs::hmm::NUM_SPECIAL;

const NO_NEIGHBOUR: usize = usize::MAX;

/// The sparse `(Q+1) x (T+1) x 3` matrix of spec.md §4.5: one
/// contiguous data block sized by the *outer* (allocated) by-row
/// edgebound set, addressed per cell through the four offset vectors
/// `omap_cur`/`imap_prv`/`imap_cur`/`imap_nxt`. Plus a dense
/// `(Q+1) x 5` plane for the `{N,B,E,C,J}` special states, which are
/// never sparse.
///
/// Reused across the Forward, Backward and posterior passes without
/// reshaping, as long as the originating [`RowBounds`] is unchanged.
#[derive(Debug, Clone, Default)]
pub struct DpMatrixSparse {
    data: Vec<f32>,
    special: Vec<f32>,
    omap_cur: Vec<usize>,
    imap_prv: Vec<usize>,
    imap_cur: Vec<usize>,
    imap_nxt: Vec<usize>,
    inner: Edgebounds,
    target_length: usize,
    profile_length: usize,
}

impl DpMatrixSparse {
    pub fn new(target_length: usize, profile_length: usize, row_bounds: &RowBounds) -> Self {
        let mut matrix = Self::default();
        matrix.reuse(target_length, profile_length, row_bounds);
        matrix
    }

    /// Reshape from `row_bounds`' inner/outer by-row sets. See spec.md
    /// §4.5 steps 1-3.
    pub fn reuse(&mut self, target_length: usize, profile_length: usize, row_bounds: &RowBounds) {
        self.target_length = target_length;
        self.profile_length = profile_length;

        let outer = &row_bounds.outer;
        let inner = &row_bounds.inner;

        self.omap_cur.clear();
        self.omap_cur.reserve(outer.bounds.len());
        let mut offset = 0usize;
        for b in &outer.bounds {
            self.omap_cur.push(offset);
            offset += NUM_STATES * b.len();
        }
        if self.data.len() < offset {
            self.data.resize(offset, f32::NEG_INFINITY);
        }
        self.data[..offset].fill(f32::NEG_INFINITY);

        self.imap_prv.clear();
        self.imap_cur.clear();
        self.imap_nxt.clear();
        self.imap_prv.resize(inner.bounds.len(), NO_NEIGHBOUR);
        self.imap_cur.resize(inner.bounds.len(), NO_NEIGHBOUR);
        self.imap_nxt.resize(inner.bounds.len(), NO_NEIGHBOUR);

        for (i, b) in inner.bounds.iter().enumerate() {
            self.imap_cur[i] = find_outer_offset(outer, &self.omap_cur, b.id, b.lb);
            if b.id > 0 {
                self.imap_prv[i] = find_outer_offset(outer, &self.omap_cur, b.id - 1, b.lb);
            }
            self.imap_nxt[i] = find_outer_offset(outer, &self.omap_cur, b.id + 1, b.lb);
        }

        self.inner = inner.clone();

        let specials_needed = (target_length + 1) * NUM_SPECIAL;
        if self.special.len() < specials_needed {
            self.special.resize(specials_needed, f32::NEG_INFINITY);
        }
        self.special[..specials_needed].fill(f32::NEG_INFINITY);
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn profile_length(&self) -> usize {
        self.profile_length
    }

    /// The `[start, end)` index range of inner bounds belonging to row
    /// `q`, for iterating via [`Self::bound`]/[`Self::get_cur`].
    pub fn row_range(&self, q: usize) -> Option<(usize, usize)> {
        self.inner.id_range(q)
    }

    pub fn bound(&self, inner_idx: usize) -> Bound {
        self.inner.bounds[inner_idx]
    }

    #[inline]
    fn read(&self, base: usize, t: usize, lb: usize, state: usize) -> f32 {
        if base == NO_NEIGHBOUR {
            return f32::NEG_INFINITY;
        }
        let idx = base as isize + NUM_STATES as isize * (t as isize - lb as isize) + state as isize;
        if idx < 0 {
            return f32::NEG_INFINITY;
        }
        self.data[idx as usize]
    }

    #[inline]
    pub fn get_cur(&self, inner_idx: usize, t: usize, state: usize) -> f32 {
        let b = self.inner.bounds[inner_idx];
        self.read(self.imap_cur[inner_idx], t, b.lb, state)
    }

    #[inline]
    pub fn get_prv(&self, inner_idx: usize, t: usize, state: usize) -> f32 {
        let b = self.inner.bounds[inner_idx];
        self.read(self.imap_prv[inner_idx], t, b.lb, state)
    }

    #[inline]
    pub fn get_nxt(&self, inner_idx: usize, t: usize, state: usize) -> f32 {
        let b = self.inner.bounds[inner_idx];
        self.read(self.imap_nxt[inner_idx], t, b.lb, state)
    }

    #[inline]
    pub fn set_cur(&mut self, inner_idx: usize, t: usize, state: usize, value: f32) {
        let b = self.inner.bounds[inner_idx];
        let base = self.imap_cur[inner_idx];
        debug_assert_ne!(base, NO_NEIGHBOUR);
        let idx = base as isize + NUM_STATES as isize * (t as isize - b.lb as isize) + state as isize;
        self.data[idx as usize] = value;
    }

    #[inline]
    pub fn special(&self, q: usize, state: usize) -> f32 {
        self.special[q * NUM_SPECIAL + state]
    }

    #[inline]
    pub fn set_special(&mut self, q: usize, state: usize, value: f32) {
        self.special[q * NUM_SPECIAL + state] = value;
    }
}

/// Find the outer bound on row `row` that contains column `col`, and
/// return its data offset for that column (state 0). `None`
/// (`NO_NEIGHBOUR`) if `row` has no allocated cells, or none of its
/// bounds cover `col` — the recurrences never dereference this for a
/// cell the padding didn't cover.
fn find_outer_offset(outer: &Edgebounds, omap_cur: &[usize], row: usize, col: usize) -> usize {
    if let Some((start, end)) = outer.id_range(row) {
        for idx in start..end {
            let b = outer.bounds[idx];
            if b.contains(col) {
                return omap_cur[idx] + NUM_STATES * (col - b.lb);
            }
        }
    }
    NO_NEIGHBOUR
}

#[cfg(test)]
mod tests {
    use super::super::cloud_bound_group::CloudBoundGroup;
    use super::super::cloud_matrix::MATCH;
    use super::*;

    fn shaped_row_bounds() -> RowBounds {
        let mut group = CloudBoundGroup::new(10, 10);
        group.push(Bound::new(4, 2, 3));
        group.push(Bound::new(5, 2, 4));
        group.push(Bound::new(6, 3, 4));
        group.finalize();
        group.trim_wings();
        RowBounds::new(&group)
    }

    #[test]
    fn fresh_matrix_reads_neg_infinity() {
        let row_bounds = shaped_row_bounds();
        let matrix = DpMatrixSparse::new(10, 10, &row_bounds);
        let (start, end) = matrix.row_range(row_bounds.target_start).unwrap();
        for idx in start..end {
            let b = matrix.bound(idx);
            for t in b.lb..b.rb {
                assert_eq!(matrix.get_cur(idx, t, MATCH), f32::NEG_INFINITY);
            }
        }
    }

    #[test]
    fn set_then_get_round_trips_through_cur() {
        let row_bounds = shaped_row_bounds();
        let mut matrix = DpMatrixSparse::new(10, 10, &row_bounds);
        let (start, _end) = matrix.row_range(row_bounds.target_start).unwrap();
        let b = matrix.bound(start);
        matrix.set_cur(start, b.lb, MATCH, 3.5);
        assert_eq!(matrix.get_cur(start, b.lb, MATCH), 3.5);
    }

    #[test]
    fn cur_row_is_visible_as_prv_on_row_below() {
        let row_bounds = shaped_row_bounds();
        let mut matrix = DpMatrixSparse::new(10, 10, &row_bounds);

        let q = row_bounds.target_start;
        let (start, _) = matrix.row_range(q).unwrap();
        let b = matrix.bound(start);
        matrix.set_cur(start, b.lb, MATCH, 9.0);

        if let Some((next_start, _next_end)) = matrix.row_range(q + 1) {
            let nb = matrix.bound(next_start);
            if nb.contains(b.lb) {
                assert_eq!(matrix.get_prv(next_start, b.lb, MATCH), 9.0);
            }
        }
    }

    #[test]
    fn special_plane_round_trips() {
        let row_bounds = shaped_row_bounds();
        let mut matrix = DpMatrixSparse::new(10, 10, &row_bounds);
        matrix.set_special(3, 0, -1.25);
        assert_eq!(matrix.special(3, 0), -1.25);
    }
}
