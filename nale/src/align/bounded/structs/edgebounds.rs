use super::bound::Bound;

/// Which axis a [`Edgebounds`]' `id` field indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Antidiagonal,
    Row,
}

/// A sorted, orientation-tagged collection of [`Bound`]s: the
/// geometric skeleton of a sparse matrix. See spec.md §4.2.
#[derive(Debug, Clone)]
pub struct Edgebounds {
    pub bounds: Vec<Bound>,
    pub q: usize,
    pub t: usize,
    pub orientation: Orientation,
    /// Built by [`Edgebounds::index_rows`]: the distinct ids present,
    /// ascending, and a parallel array of start offsets into `bounds`
    /// with one trailing sentinel equal to `bounds.len()`, so that all
    /// bounds for `ids[k]` live in `bounds[id_starts[k]..id_starts[k+1])`.
    row_index: Option<(Vec<usize>, Vec<usize>)>,
}

impl Default for Edgebounds {
    fn default() -> Self {
        Self {
            bounds: Vec::new(),
            q: 0,
            t: 0,
            orientation: Orientation::Antidiagonal,
            row_index: None,
        }
    }
}

impl Edgebounds {
    pub fn new(q: usize, t: usize, orientation: Orientation) -> Self {
        Self {
            bounds: Vec::new(),
            q,
            t,
            orientation,
            row_index: None,
        }
    }

    pub fn reuse(&mut self, q: usize, t: usize, orientation: Orientation) {
        self.bounds.clear();
        self.q = q;
        self.t = t;
        self.orientation = orientation;
        self.row_index = None;
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// O(1) amortised append. `Vec::push` already doubles capacity on
    /// growth, so this is a thin wrapper kept for symmetry with the
    /// rest of the container's spec.md-named operations.
    pub fn push(&mut self, bnd: Bound) {
        self.row_index = None;
        self.bounds.push(bnd);
    }

    /// Sort ascending by `(id, lb, rb)`. Stability is not required by
    /// spec.md, so the standard unstable sort is used.
    pub fn sort(&mut self) {
        self.bounds
            .sort_unstable_by_key(|b| (b.id, b.lb, b.rb));
        self.row_index = None;
    }

    /// In place: assumes `sort()` has already run. For each run of
    /// bounds sharing an id, coalesce any whose ranges touch or
    /// overlap.
    pub fn merge(&mut self) {
        if self.bounds.is_empty() {
            return;
        }
        let mut merged: Vec<Bound> = Vec::with_capacity(self.bounds.len());
        for b in self.bounds.drain(..) {
            match merged.last_mut() {
                Some(prev) if prev.id == b.id && prev.abuts_or_overlaps(&b) => {
                    prev.rb = prev.rb.max(b.rb);
                    prev.lb = prev.lb.min(b.lb);
                }
                _ => merged.push(b),
            }
        }
        self.bounds = merged;
        self.row_index = None;
    }

    pub fn reverse(&mut self) {
        self.bounds.reverse();
        self.row_index = None;
    }

    /// Return the bound index whose id equals `id` and `lb <= t < rb`,
    /// or `None`.
    pub fn search(&self, id: usize, t: usize) -> Option<usize> {
        self.bounds
            .iter()
            .position(|b| b.id == id && b.contains(t))
    }

    pub fn count_cells(&self) -> usize {
        self.bounds.iter().map(Bound::len).sum()
    }

    /// Build the `(ids, id_starts)` index described on [`Edgebounds`].
    /// Assumes the set is sorted.
    pub fn index_rows(&mut self) -> (&[usize], &[usize]) {
        if self.row_index.is_none() {
            let mut ids = Vec::new();
            let mut starts = Vec::new();
            let mut i = 0;
            while i < self.bounds.len() {
                let id = self.bounds[i].id;
                ids.push(id);
                starts.push(i);
                while i < self.bounds.len() && self.bounds[i].id == id {
                    i += 1;
                }
            }
            starts.push(self.bounds.len());
            self.row_index = Some((ids, starts));
        }
        let (ids, starts) = self.row_index.as_ref().unwrap();
        (ids.as_slice(), starts.as_slice())
    }

    /// The range of bounds (if any) belonging to `id`, using the index
    /// built by [`Edgebounds::index_rows`].
    pub fn bounds_for_id(&self, id: usize) -> &[Bound] {
        match &self.row_index {
            Some((ids, starts)) => match ids.binary_search(&id) {
                Ok(k) => &self.bounds[starts[k]..starts[k + 1]],
                Err(_) => &[],
            },
            None => &[],
        }
    }

    /// Like [`Edgebounds::bounds_for_id`], but returns the `[start, end)`
    /// index range into `self.bounds` rather than the slice itself, so a
    /// caller can address a parallel per-bound array (e.g. the sparse
    /// matrix's offset vectors) by position.
    pub fn id_range(&self, id: usize) -> Option<(usize, usize)> {
        match &self.row_index {
            Some((ids, starts)) => ids
                .binary_search(&id)
                .ok()
                .map(|k| (starts[k], starts[k + 1])),
            None => None,
        }
    }
}

/// Bound-wise union of two by-antidiagonal, sorted edgebound sets:
/// concatenate, then sort + merge. See spec.md §4.2 `union`.
pub fn union(a: &Edgebounds, b: &Edgebounds, out: &mut Edgebounds) {
    debug_assert_eq!(a.orientation, Orientation::Antidiagonal);
    debug_assert_eq!(b.orientation, Orientation::Antidiagonal);

    out.reuse(a.q.max(b.q), a.t.max(b.t), Orientation::Antidiagonal);
    out.bounds.reserve(a.bounds.len() + b.bounds.len());
    out.bounds.extend_from_slice(&a.bounds);
    out.bounds.extend_from_slice(&b.bounds);
    out.sort();
    out.merge();
}

/// Reorient a by-antidiagonal set into a by-row set naming the same
/// cells. See spec.md §4.2 `reorient_diag_to_row`: for each row
/// `i in [0, Q]`, scan antidiagonals intersecting that row; antidiagonal
/// `d` contributes column `t = d - i` whenever `lb <= i < rb` on that
/// antidiagonal. Contiguous runs of covered columns become the row's
/// bounds.
pub fn reorient_diag_to_row(input: &mut Edgebounds, out: &mut Edgebounds) {
    debug_assert_eq!(input.orientation, Orientation::Antidiagonal);

    out.reuse(input.q, input.t, Orientation::Row);

    input.index_rows();

    for i in 0..=input.q {
        // Every antidiagonal d with lb <= i < rb contributes column
        // t = d - i to row i. Antidiagonals run 0..=Q+T.
        let mut columns: Vec<usize> = Vec::new();
        for d in 0..=(input.q + input.t) {
            if d < i {
                continue;
            }
            let t = d - i;
            if t > input.t {
                continue;
            }
            if let Some(bound_idx) = input.search(d, i) {
                let _ = bound_idx;
                columns.push(t);
            }
        }
        if columns.is_empty() {
            continue;
        }
        columns.sort_unstable();
        let mut lb = columns[0];
        let mut prev = columns[0];
        for &t in &columns[1..] {
            if t > prev + 1 {
                out.push(Bound::new(i, lb, prev + 1));
                lb = t;
            }
            prev = t;
        }
        out.push(Bound::new(i, lb, prev + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(bounds: &[(usize, usize, usize)], orientation: Orientation) -> Edgebounds {
        let mut e = Edgebounds::new(20, 20, orientation);
        for &(id, lb, rb) in bounds {
            e.push(Bound::new(id, lb, rb));
        }
        e
    }

    #[test]
    fn merge_coalesces_touching_ranges() {
        let mut e = set(&[(0, 0, 3), (0, 3, 5), (0, 7, 9)], Orientation::Row);
        e.sort();
        e.merge();
        assert_eq!(e.bounds, vec![Bound::new(0, 0, 5), Bound::new(0, 7, 9)]);
    }

    #[test]
    fn merge_no_overlap_no_abut() {
        let mut e = set(&[(1, 0, 2), (1, 3, 5)], Orientation::Row);
        e.sort();
        e.merge();
        // adjacent bounds with the same id must not touch (lb == prev.rb + 1 here)
        assert_eq!(e.bounds, vec![Bound::new(1, 0, 2), Bound::new(1, 3, 5)]);
        assert!(e.bounds[0].rb < e.bounds[1].lb);
    }

    #[test]
    fn union_commutes() {
        let a = set(&[(2, 1, 4), (3, 2, 5)], Orientation::Antidiagonal);
        let b = set(&[(2, 3, 6), (4, 0, 1)], Orientation::Antidiagonal);

        let mut ab = Edgebounds::default();
        let mut ba = Edgebounds::default();
        union(&a, &b, &mut ab);
        union(&b, &a, &mut ba);

        assert_eq!(ab.bounds, ba.bounds);
    }

    #[test]
    fn index_rows_sentinel_covers_all_bounds() {
        let mut e = set(&[(0, 0, 1), (0, 1, 2), (2, 0, 1)], Orientation::Row);
        e.sort();
        let (ids, starts) = e.index_rows();
        assert_eq!(ids, &[0, 2]);
        assert_eq!(starts[starts.len() - 1], e.bounds.len());
    }

    #[test]
    fn reorient_is_bijection_on_cells() {
        // antidiagonal d = q + t; cell (q=1,t=1) -> d=2, k=q=1
        let mut diag = Edgebounds::new(3, 3, Orientation::Antidiagonal);
        diag.push(Bound::new(2, 1, 2)); // d=2, k in [1,2) -> q=1, t=1
        diag.push(Bound::new(3, 1, 3)); // d=3, k in [1,3) -> (q=1,t=2),(q=2,t=1)
        diag.sort();

        let mut row = Edgebounds::default();
        reorient_diag_to_row(&mut diag, &mut row);

        let mut cells: Vec<(usize, usize)> = Vec::new();
        for b in &row.bounds {
            for t in b.lb..b.rb {
                cells.push((b.id, t));
            }
        }
        cells.sort_unstable();

        let mut expected = vec![(1usize, 1usize), (1, 2), (2, 1)];
        expected.sort_unstable();
        assert_eq!(cells, expected);
    }
}
