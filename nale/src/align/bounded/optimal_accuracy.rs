//! Maximum-expected-accuracy (MEA) decoding and traceback (SPEC_FULL.md
//! "supplemented feature: MEA traceback"). Same sparse shape as the
//! bounded Forward/Backward/posterior passes, but the recurrence
//! maximises expected correctly-placed match residues instead of
//! summing path probabilities, modelled after HMMER's generic
//! optimal-accuracy DP (`p7_GOptimalAccuracy`/`p7_GOATrace`): every
//! cell accumulates real-space posterior mass (already produced by
//! [`super::posterior::posterior_bounded`]) along whichever
//! predecessor maximises the running total, rather than log-summing
//! every predecessor the way Forward/Backward do.
//!
//! Only match cells carry a reward (the expected count of correctly
//! aligned match residues); insert/delete/flanking steps propagate
//! the best incoming total unchanged. This is the same simplification
//! HMMER's own accuracy metric makes: an inserted or deleted residue
//! has no well-defined "correct" profile position to score against.

use crate::structs::hmm::{Profile, S_B, S_C, S_E, S_J, S_N};
use crate::structs::trace::{Trace, TraceStep};

use super::structs::cloud_matrix::{DELETE, INSERT, MATCH};
use super::structs::{DpMatrixSparse, RowBounds};

const NEG_INF: f32 = f32::NEG_INFINITY;
const EPS: f32 = 1e-4;

fn max_all(values: &[f32]) -> f32 {
    values.iter().copied().fold(NEG_INF, f32::max)
}

fn approx_eq(a: f32, b: f32) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= EPS
}

/// Fill `optimal` from a finished `posterior` pass over the same
/// `row_bounds` shape. See the module doc for the reward rule.
pub fn optimal_accuracy_bounded(
    _profile: &Profile,
    posterior: &DpMatrixSparse,
    optimal: &mut DpMatrixSparse,
    _row_bounds: &RowBounds,
) {
    let q_max = posterior.target_length();

    optimal.set_special(0, S_N, 0.0);
    optimal.set_special(0, S_B, 0.0);
    optimal.set_special(0, S_E, NEG_INF);
    optimal.set_special(0, S_J, NEG_INF);
    optimal.set_special(0, S_C, NEG_INF);

    for q in 1..=q_max {
        let mut best_e = NEG_INF;

        if let Some((start, end)) = optimal.row_range(q) {
            for idx in start..end {
                let b = optimal.bound(idx);
                for t in b.lb..b.rb {
                    if t == 0 {
                        continue;
                    }
                    let tm1 = t - 1;

                    let m_reward = posterior.get_cur(idx, t, MATCH);
                    let prv_m = optimal.get_prv(idx, tm1, MATCH);
                    let prv_i = optimal.get_prv(idx, tm1, INSERT);
                    let prv_d = optimal.get_prv(idx, tm1, DELETE);
                    let prv_b = optimal.special(q - 1, S_B);
                    let m = m_reward + max_all(&[prv_m, prv_i, prv_d, prv_b]);

                    let prv_mi = optimal.get_prv(idx, t, MATCH);
                    let prv_ii = optimal.get_prv(idx, t, INSERT);
                    let i = max_all(&[prv_mi, prv_ii]);

                    let prv_md = optimal.get_cur(idx, tm1, MATCH);
                    let prv_dd = optimal.get_cur(idx, tm1, DELETE);
                    let d = max_all(&[prv_md, prv_dd]);

                    optimal.set_cur(idx, t, MATCH, m);
                    optimal.set_cur(idx, t, INSERT, i);
                    optimal.set_cur(idx, t, DELETE, d);

                    best_e = best_e.max(m).max(d);
                }
            }
        }

        optimal.set_special(q, S_E, best_e);

        let j = max_all(&[optimal.special(q - 1, S_J), best_e]);
        optimal.set_special(q, S_J, j);

        let c = max_all(&[optimal.special(q - 1, S_C), best_e]);
        optimal.set_special(q, S_C, c);

        let n = optimal.special(q - 1, S_N);
        optimal.set_special(q, S_N, n);

        let b = max_all(&[n, j]);
        optimal.set_special(q, S_B, b);
    }
}

/// One step of the backward walk from `C` at the cloud's named end
/// row down to `q = 0`. Recovers the path by recomputing, at each
/// cell, which predecessor the forward pass's `max` actually took —
/// the same recompute-don't-store-pointers style
/// [`crate::align::needleman_wunsch::needleman_wunsch`] already uses.
enum Cursor {
    Special { q: usize, state: SpecialState },
    Cell { q: usize, t: usize, state: CellState },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SpecialState {
    N,
    B,
    E,
    J,
    C,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CellState {
    Match,
    Insert,
    Delete,
}

/// Traceback from `q_end` (the last query row the cloud actually
/// names — `row_bounds.target_end`) down to `q = 0`, assuming the
/// path ends in `C`. Appends `(state, q, t)` points to `trace` in
/// reverse-chronological discovery order, then restores forward
/// order before returning; sets `trace.begin`/`trace.end` to the
/// first `B->M` / last `M->E` point indices.
pub fn traceback_bounded(
    profile: &Profile,
    posterior: &DpMatrixSparse,
    optimal: &DpMatrixSparse,
    trace: &mut Trace,
    q_end: usize,
) {
    let _ = profile;
    trace.points.clear();

    if q_end == 0 || optimal.special(q_end, S_C) == NEG_INF {
        trace.begin = 0;
        trace.end = 0;
        return;
    }

    let mut cursor = Cursor::Special {
        q: q_end,
        state: SpecialState::C,
    };

    loop {
        match cursor {
            Cursor::Special { q, state } => match state {
                SpecialState::N => {
                    trace.push(TraceStep::N, q, 0);
                    if q == 0 {
                        break;
                    }
                    cursor = Cursor::Special {
                        q: q - 1,
                        state: SpecialState::N,
                    };
                }
                SpecialState::C => {
                    let here = optimal.special(q, S_C);
                    if q > 0 && approx_eq(here, optimal.special(q - 1, S_C)) {
                        trace.push(TraceStep::C, q, 0);
                        cursor = Cursor::Special {
                            q: q - 1,
                            state: SpecialState::C,
                        };
                    } else {
                        trace.push(TraceStep::End, q, 0);
                        cursor = Cursor::Special {
                            q,
                            state: SpecialState::E,
                        };
                    }
                }
                SpecialState::J => {
                    let here = optimal.special(q, S_J);
                    if q > 0 && approx_eq(here, optimal.special(q - 1, S_J)) {
                        trace.push(TraceStep::J, q, 0);
                        cursor = Cursor::Special {
                            q: q - 1,
                            state: SpecialState::J,
                        };
                    } else {
                        trace.push(TraceStep::End, q, 0);
                        cursor = Cursor::Special {
                            q,
                            state: SpecialState::E,
                        };
                    }
                }
                SpecialState::E => {
                    let here = optimal.special(q, S_E);
                    let mut landed = None;
                    if let Some((start, end)) = optimal.row_range(q) {
                        'search: for idx in start..end {
                            let b = optimal.bound(idx);
                            for t in b.lb..b.rb {
                                if approx_eq(optimal.get_cur(idx, t, MATCH), here) {
                                    landed = Some((t, CellState::Match));
                                    break 'search;
                                }
                                if approx_eq(optimal.get_cur(idx, t, DELETE), here) {
                                    landed = Some((t, CellState::Delete));
                                    break 'search;
                                }
                            }
                        }
                    }
                    match landed {
                        Some((t, state)) => {
                            cursor = Cursor::Cell { q, t, state };
                        }
                        None => break,
                    }
                }
                SpecialState::B => {
                    trace.push(TraceStep::Begin, q, 0);
                    let n = optimal.special(q, S_N);
                    let j = optimal.special(q, S_J);
                    let b = optimal.special(q, S_B);
                    if approx_eq(b, j) && !approx_eq(b, n) {
                        cursor = Cursor::Special {
                            q,
                            state: SpecialState::J,
                        };
                    } else {
                        cursor = Cursor::Special {
                            q,
                            state: SpecialState::N,
                        };
                    }
                }
            },
            Cursor::Cell { q, t, state } => match state {
                CellState::Match => {
                    trace.push(TraceStep::Match, q, t);
                    if t == 0 || q == 0 {
                        break;
                    }
                    let idx = match optimal.row_range(q).and_then(|(s, e)| {
                        (s..e).find(|&i| optimal.bound(i).contains(t))
                    }) {
                        Some(i) => i,
                        None => break,
                    };
                    let tm1 = t - 1;
                    let here = optimal.get_cur(idx, t, MATCH) - posterior.get_cur(idx, t, MATCH);
                    let prv_m = optimal.get_prv(idx, tm1, MATCH);
                    let prv_i = optimal.get_prv(idx, tm1, INSERT);
                    let prv_d = optimal.get_prv(idx, tm1, DELETE);
                    let prv_b = optimal.special(q - 1, S_B);
                    if approx_eq(here, prv_b) {
                        cursor = Cursor::Special {
                            q: q - 1,
                            state: SpecialState::B,
                        };
                    } else if approx_eq(here, prv_i) {
                        cursor = Cursor::Cell {
                            q: q - 1,
                            t: tm1,
                            state: CellState::Insert,
                        };
                    } else if approx_eq(here, prv_d) {
                        cursor = Cursor::Cell {
                            q: q - 1,
                            t: tm1,
                            state: CellState::Delete,
                        };
                    } else {
                        let _ = prv_m;
                        cursor = Cursor::Cell {
                            q: q - 1,
                            t: tm1,
                            state: CellState::Match,
                        };
                    }
                }
                CellState::Insert => {
                    trace.push(TraceStep::Insert, q, t);
                    if q == 0 {
                        break;
                    }
                    let idx = match optimal.row_range(q).and_then(|(s, e)| {
                        (s..e).find(|&i| optimal.bound(i).contains(t))
                    }) {
                        Some(i) => i,
                        None => break,
                    };
                    let here = optimal.get_cur(idx, t, INSERT);
                    let prv_m = optimal.get_prv(idx, t, MATCH);
                    cursor = Cursor::Cell {
                        q: q - 1,
                        t,
                        state: if approx_eq(here, prv_m) {
                            CellState::Match
                        } else {
                            CellState::Insert
                        },
                    };
                }
                CellState::Delete => {
                    trace.push(TraceStep::Delete, q, t);
                    if t == 0 {
                        break;
                    }
                    let idx = match optimal.row_range(q).and_then(|(s, e)| {
                        (s..e).find(|&i| optimal.bound(i).contains(t))
                    }) {
                        Some(i) => i,
                        None => break,
                    };
                    let tm1 = t - 1;
                    let here = optimal.get_cur(idx, t, DELETE);
                    let prv_m = optimal.get_cur(idx, tm1, MATCH);
                    cursor = Cursor::Cell {
                        q,
                        t: tm1,
                        state: if approx_eq(here, prv_m) {
                            CellState::Match
                        } else {
                            CellState::Delete
                        },
                    };
                }
            },
        }
    }

    trace.points.reverse();
    trace.begin = trace
        .points
        .iter()
        .position(|p| p.state == TraceStep::Begin)
        .unwrap_or(0);
    trace.end = trace
        .points
        .iter()
        .rposition(|p| p.state == TraceStep::End)
        .unwrap_or(trace.points.len().saturating_sub(1));
}
