use crate::error::NaleError;

use super::bound::Bound;
use super::edgebounds::{union, Edgebounds, Orientation};

/// The by-antidiagonal edgebound set a single cloud-search sweep grows
/// into, plus the padded ("outer") set produced by [`Self::trim_wings`].
/// See spec.md §4.3 (construction) and §4.4 (merge & pad).
#[derive(Debug, Clone, Default)]
pub struct CloudBoundGroup {
    /// The unpadded cell set: either one sweep's surviving ranges, or
    /// (after [`Self::join_bounds`]) the forward/backward union.
    pub inner: Edgebounds,
    /// `inner` padded by one cell in every direction, after
    /// [`Self::trim_wings`]. Names every cell a bounded recurrence may
    /// need to read.
    pub outer: Edgebounds,
}

impl CloudBoundGroup {
    pub fn new(q: usize, t: usize) -> Self {
        let mut group = Self::default();
        group.reuse(q, t);
        group
    }

    pub fn reuse(&mut self, q: usize, t: usize) {
        self.inner.reuse(q, t, Orientation::Antidiagonal);
        self.outer.reuse(q, t, Orientation::Antidiagonal);
    }

    pub fn q(&self) -> usize {
        self.inner.q
    }

    pub fn t(&self) -> usize {
        self.inner.t
    }

    /// Append a surviving range found on one antidiagonal during the
    /// cloud search sweep.
    pub fn push(&mut self, bound: Bound) {
        self.inner.push(bound);
    }

    /// Sort + merge the set a sweep just finished building. A
    /// backward sweep builds its bounds in descending `id` order and
    /// must call [`Edgebounds::reverse`] (or rely on `sort`, which
    /// re-establishes ascending order regardless) before this.
    pub fn finalize(&mut self) {
        self.inner.sort();
        self.inner.merge();
    }

    /// True iff the cloud is non-empty, i.e. the search did not reject
    /// this seed (spec.md §7, "Empty cloud").
    pub fn valid(&self) -> bool {
        !self.inner.is_empty()
    }

    /// Union `other`'s inner cell set into `into`'s, in place. Both
    /// must already be by-antidiagonal and sorted+merged (the state
    /// every sweep leaves itself in after [`Self::finalize`]).
    pub fn join_bounds(into: &mut CloudBoundGroup, other: &CloudBoundGroup) -> Result<(), NaleError> {
        if into.q() != other.q() || into.t() != other.t() {
            return Err(NaleError::BadInput(
                "forward/backward cloud dimensions disagree".to_string(),
            ));
        }
        let mut out = Edgebounds::default();
        union(&into.inner, &other.inner, &mut out);
        into.inner = out;
        Ok(())
    }

    /// Pad the (already unioned) inner set by one cell in every
    /// matrix direction, producing the outer set. See spec.md §4.4:
    /// for every bound `{d, lb, rb}` emit `{d-1, lb-1, rb+1}`,
    /// `{d, lb-1, rb+1}`, `{d+1, lb-1, rb+1}`, then sort + merge.
    ///
    /// Named `trim_wings` after the call sites this pads for, even
    /// though it grows rather than shrinks the set.
    pub fn trim_wings(&mut self) {
        let q = self.inner.q;
        let t = self.inner.t;
        let max_d = q + t;

        self.outer.reuse(q, t, Orientation::Antidiagonal);

        for b in &self.inner.bounds {
            // Bounds here are by-antidiagonal and index the query
            // coordinate `q` (see cloud_search.rs), so the k-max on
            // any antidiagonal is the query extent, not the profile
            // length T.
            let lb = b.lb.saturating_sub(1);
            let rb = (b.rb + 1).min(q + 1);

            if b.id > 0 {
                self.outer.push(Bound::new(b.id - 1, lb, rb));
            }
            self.outer.push(Bound::new(b.id, lb, rb));
            if b.id < max_d {
                self.outer.push(Bound::new(b.id + 1, lb, rb));
            }
        }

        self.outer.sort();
        self.outer.merge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_wings_pads_by_one_antidiagonal_in_each_direction() {
        let mut group = CloudBoundGroup::new(10, 10);
        group.push(Bound::new(5, 2, 4));
        group.finalize();
        group.trim_wings();

        assert_eq!(
            group.outer.bounds,
            vec![Bound::new(4, 1, 5), Bound::new(5, 1, 5), Bound::new(6, 1, 5)]
        );
    }

    #[test]
    fn trim_wings_merges_overlapping_padded_ranges_across_bounds() {
        // a two-antidiagonal-wide band, like the tail end of a real
        // cloud-search sweep, tapering toward its seed.
        let mut group = CloudBoundGroup::new(10, 10);
        group.push(Bound::new(4, 2, 3));
        group.push(Bound::new(5, 2, 4));
        group.push(Bound::new(6, 3, 4));
        group.finalize();
        group.trim_wings();

        // every cell on the inner band must have all 6 recurrence
        // neighbours present in the padded outer band.
        let cell_in = |e: &Edgebounds, q: usize, t: usize| {
            let d = q + t;
            e.bounds.iter().any(|b| b.id == d && b.contains(q))
        };
        let inner_cells: Vec<(usize, usize)> = group
            .inner
            .bounds
            .iter()
            .flat_map(|b| (b.lb..b.rb).map(move |q| (q, b.id - q)))
            .collect();
        for (q, t) in inner_cells {
            let neighbours = [
                (q.wrapping_sub(1), t.wrapping_sub(1)),
                (q.wrapping_sub(1), t),
                (q, t.wrapping_sub(1)),
                (q + 1, t),
                (q, t + 1),
                (q + 1, t + 1),
            ];
            for (nq, nt) in neighbours {
                if nq == usize::MAX || nt == usize::MAX {
                    continue;
                }
                assert!(
                    cell_in(&group.outer, nq, nt),
                    "missing neighbour ({nq},{nt}) of active cell ({q},{t})"
                );
            }
        }
    }

    #[test]
    fn trim_wings_clamps_to_query_extent_not_profile_length() {
        // Q > T (target sequence longer than the profile) is the
        // normal case; the k-max on an antidiagonal is bounded by Q,
        // never by T. This bound's padded rb (9 + 1 = 10) exceeds
        // T + 1 (6) but must survive, since it is well within Q + 1
        // (21).
        let mut group = CloudBoundGroup::new(20, 5);
        group.push(Bound::new(10, 9, 10));
        group.finalize();
        group.trim_wings();

        assert!(group.outer.bounds.iter().all(|b| b.rb <= 21));
        assert!(
            group.outer.bounds.iter().any(|b| b.rb > 6),
            "bound wrongly clamped to profile length T + 1 instead of query extent Q + 1"
        );
    }
}
