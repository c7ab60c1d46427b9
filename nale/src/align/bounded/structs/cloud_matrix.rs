/// Index of the match/insert/delete planes within one cell's 3 floats.
pub const MATCH: usize = 0;
pub const INSERT: usize = 1;
pub const DELETE: usize = 2;
pub const NUM_STATES: usize = 3;

/// The three-row rolling buffer the antidiagonal cloud search reads
/// and writes. See spec.md §4.3 and §9 "Three-row rolling buffer".
///
/// Cells are addressed by `(antidiagonal, k)` where `k` is the
/// *profile* offset (`k == t`), not the query offset spec.md's prose
/// uses — see DESIGN.md for why: this is the convention that makes
/// the buffer's width depend only on the profile length, matching
/// `CloudMatrixLinear::new`/`reuse` taking just `profile_len`. The two
/// conventions describe the same cells; only the recurrence's
/// per-neighbour `k` vs `k-1` bookkeeping differs (spelled out at each
/// recurrence's call site in `cloud_search.rs`).
///
/// Physically a contiguous `3 * (T+1) * 3` slab: 3 rolling row slots
/// (`d % 3`), `T+1` profile-offset columns, 3 states.
#[derive(Debug, Clone, Default)]
pub struct CloudMatrixLinear {
    data: Vec<f32>,
    t_max: usize,
}

impl CloudMatrixLinear {
    pub fn new(profile_len: usize) -> Self {
        let mut m = Self {
            data: Vec::new(),
            t_max: 0,
        };
        m.reuse(profile_len);
        m
    }

    pub fn reuse(&mut self, profile_len: usize) {
        self.t_max = profile_len;
        let needed = 3 * (profile_len + 1) * NUM_STATES;
        if self.data.len() < needed {
            self.data.resize(needed, f32::NEG_INFINITY);
        }
        self.data[..needed].fill(f32::NEG_INFINITY);
    }

    #[inline]
    fn index(&self, d: usize, k: usize, state: usize) -> usize {
        debug_assert!(k <= self.t_max);
        let slot = d % 3;
        (slot * (self.t_max + 1) + k) * NUM_STATES + state
    }

    #[inline]
    pub fn get(&self, d: usize, k: usize, state: usize) -> f32 {
        self.data[self.index(d, k, state)]
    }

    #[inline]
    pub fn set(&mut self, d: usize, k: usize, state: usize, value: f32) {
        let idx = self.index(d, k, state);
        self.data[idx] = value;
    }

    /// Scrub the row slot belonging to antidiagonal `d` back to `-inf`
    /// so the rolling buffer is clean when that slot is reused two
    /// antidiagonals later.
    pub fn scrub(&mut self, d: usize) {
        let slot = d % 3;
        let start = slot * (self.t_max + 1) * NUM_STATES;
        let end = start + (self.t_max + 1) * NUM_STATES;
        self.data[start..end].fill(f32::NEG_INFINITY);
    }
}
