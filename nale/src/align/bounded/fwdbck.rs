//! Bounded Forward/Backward: the same log-sum-of-paths recurrences as
//! the antidiagonal cloud search's per-cell rules, but walked
//! row-by-row over the sparse shape a [`RowBounds`] describes, with
//! the `{N,B,E,C,J}` special states held dense in [`DpMatrixSparse`]'s
//! special plane.

use crate::numeric::logsum_all;
use crate::structs::hmm::{
    Profile, LOOP, MOVE, S_B, S_C, S_E, S_J, S_N, T_DD, T_DM, T_II, T_IM, T_MD, T_MI, T_MM,
};
use crate::structs::sequence::Sequence;

use super::structs::cloud_matrix::{DELETE, INSERT, MATCH};
use super::structs::{DpMatrixSparse, RowBounds};

/// Forward over the whole query range `[0, Q]`. Returns the overall
/// Forward score `C(Q) + tC_MOVE`.
pub fn forward_bounded(
    profile: &Profile,
    target: &Sequence,
    matrix: &mut DpMatrixSparse,
    row_bounds: &RowBounds,
) -> f32 {
    forward_bounded_in_range(profile, target, matrix, row_bounds, None)
}

/// Forward restricted to `range` (inclusive query positions); outside
/// it, normal cells stay at `-inf` while the specials still update, so
/// the same matrix can host a per-domain re-scoring pass (used by the
/// null2 bias correction).
pub fn forward_bounded_in_range(
    profile: &Profile,
    target: &Sequence,
    matrix: &mut DpMatrixSparse,
    _row_bounds: &RowBounds,
    range: Option<(usize, usize)>,
) -> f32 {
    let q_max = target.length;
    let in_range = |q: usize| range.is_none_or(|(lo, hi)| q >= lo && q <= hi);

    matrix.set_special(0, S_N, 0.0);
    matrix.set_special(0, S_B, profile.special(S_N, MOVE));
    matrix.set_special(0, S_E, f32::NEG_INFINITY);
    matrix.set_special(0, S_J, f32::NEG_INFINITY);
    matrix.set_special(0, S_C, f32::NEG_INFINITY);

    for q in 1..=q_max {
        let residue = target.residue(q);
        let mut e = f32::NEG_INFINITY;

        if in_range(q) {
            if let Some((start, end)) = matrix.row_range(q) {
                for idx in start..end {
                    let b = matrix.bound(idx);
                    for t in b.lb..b.rb {
                        if t == 0 {
                            continue;
                        }
                        let tm1 = t - 1;

                        let prv_m = matrix.get_prv(idx, tm1, MATCH) + profile.trans(tm1, T_MM);
                        let prv_i = matrix.get_prv(idx, tm1, INSERT) + profile.trans(tm1, T_IM);
                        let prv_d = matrix.get_prv(idx, tm1, DELETE) + profile.trans(tm1, T_DM);
                        let prv_b = matrix.special(q - 1, S_B) + profile.entry_score();
                        let m = profile.match_score(t, residue)
                            + logsum_all(&[prv_m, prv_i, prv_d, prv_b]);

                        let prv_mi = matrix.get_prv(idx, t, MATCH) + profile.trans(t, T_MI);
                        let prv_ii = matrix.get_prv(idx, t, INSERT) + profile.trans(t, T_II);
                        let i = profile.insert_score(t, residue) + logsum_all(&[prv_mi, prv_ii]);

                        let prv_md = matrix.get_cur(idx, tm1, MATCH) + profile.trans(tm1, T_MD);
                        let prv_dd = matrix.get_cur(idx, tm1, DELETE) + profile.trans(tm1, T_DD);
                        let d = logsum_all(&[prv_md, prv_dd]);

                        matrix.set_cur(idx, t, MATCH, m);
                        matrix.set_cur(idx, t, INSERT, i);
                        matrix.set_cur(idx, t, DELETE, d);

                        e = logsum_all(&[e, m + Profile::EXIT_SCORE, d + Profile::EXIT_SCORE]);
                    }
                }
            }
        }

        matrix.set_special(q, S_E, e);

        let j = logsum_all(&[
            matrix.special(q - 1, S_J) + profile.special(S_J, LOOP),
            e + profile.special(S_E, LOOP),
        ]);
        matrix.set_special(q, S_J, j);

        let c = logsum_all(&[
            matrix.special(q - 1, S_C) + profile.special(S_C, LOOP),
            e + profile.special(S_E, MOVE),
        ]);
        matrix.set_special(q, S_C, c);

        let n = matrix.special(q - 1, S_N) + profile.special(S_N, LOOP);
        matrix.set_special(q, S_N, n);

        let b = logsum_all(&[
            n + profile.special(S_N, MOVE),
            j + profile.special(S_J, MOVE),
        ]);
        matrix.set_special(q, S_B, b);
    }

    matrix.special(q_max, S_C) + profile.special(S_C, MOVE)
}

/// Backward over the whole query range. Returns the overall Backward
/// score, which lives at `N(0)` on completion.
pub fn backward_bounded(
    profile: &Profile,
    target: &Sequence,
    matrix: &mut DpMatrixSparse,
    row_bounds: &RowBounds,
) -> f32 {
    backward_bounded_in_range(profile, target, matrix, row_bounds, None)
}

/// Backward restricted to `range`, mirroring
/// [`forward_bounded_in_range`].
pub fn backward_bounded_in_range(
    profile: &Profile,
    target: &Sequence,
    matrix: &mut DpMatrixSparse,
    _row_bounds: &RowBounds,
    range: Option<(usize, usize)>,
) -> f32 {
    let q_max = target.length;
    let t_max = profile.length;
    let in_range = |q: usize| range.is_none_or(|(lo, hi)| q >= lo && q <= hi);

    matrix.set_special(q_max, S_J, f32::NEG_INFINITY);
    matrix.set_special(q_max, S_B, f32::NEG_INFINITY);
    matrix.set_special(q_max, S_N, f32::NEG_INFINITY);
    let c = profile.special(S_C, MOVE);
    matrix.set_special(q_max, S_C, c);
    let e = c + profile.special(S_E, MOVE);
    matrix.set_special(q_max, S_E, e);

    if in_range(q_max) {
        if let Some((start, end)) = matrix.row_range(q_max) {
            for idx in start..end {
                let b = matrix.bound(idx);
                for t in b.lb..b.rb {
                    matrix.set_cur(idx, t, MATCH, e + Profile::EXIT_SCORE);
                    matrix.set_cur(idx, t, INSERT, f32::NEG_INFINITY);
                    matrix.set_cur(idx, t, DELETE, e + Profile::EXIT_SCORE);
                }
            }
        }
    }

    for q in (0..q_max).rev() {
        let q1 = q + 1;
        let residue_next = target.residue(q1);

        // B(q): uniform-entry sum over every active cell of row q+1.
        let mut b_acc = f32::NEG_INFINITY;
        if in_range(q1) {
            if let Some((start, end)) = matrix.row_range(q1) {
                for idx in start..end {
                    let bnd = matrix.bound(idx);
                    for t in bnd.lb..bnd.rb {
                        let m = matrix.get_cur(idx, t, MATCH);
                        let term = m + profile.entry_score() + profile.match_score(t, residue_next);
                        b_acc = logsum_all(&[b_acc, term]);
                    }
                }
            }
        }
        matrix.set_special(q, S_B, b_acc);

        let j = logsum_all(&[
            matrix.special(q1, S_J) + profile.special(S_J, LOOP),
            b_acc + profile.special(S_J, MOVE),
        ]);
        matrix.set_special(q, S_J, j);

        let c = matrix.special(q1, S_C) + profile.special(S_C, LOOP);
        matrix.set_special(q, S_C, c);

        let e = logsum_all(&[
            j + profile.special(S_E, LOOP),
            c + profile.special(S_E, MOVE),
        ]);
        matrix.set_special(q, S_E, e);

        let n = logsum_all(&[
            matrix.special(q1, S_N) + profile.special(S_N, LOOP),
            b_acc + profile.special(S_N, MOVE),
        ]);
        matrix.set_special(q, S_N, n);

        if in_range(q) {
            if let Some((start, end)) = matrix.row_range(q) {
                for idx in start..end {
                    let b = matrix.bound(idx);
                    for t in b.lb..b.rb {
                        let to_m = if t + 1 <= t_max {
                            let tp1 = t + 1;
                            let msc = profile.match_score(tp1, residue_next);
                            let nxt_m = matrix.get_nxt(idx, tp1, MATCH);
                            profile.trans(t, T_MM) + msc + nxt_m
                        } else {
                            f32::NEG_INFINITY
                        };
                        let to_i = {
                            let isc = profile.insert_score(t, residue_next);
                            let nxt_i = matrix.get_nxt(idx, t, INSERT);
                            profile.trans(t, T_MI) + isc + nxt_i
                        };
                        let to_d = if t + 1 <= t_max {
                            matrix.get_cur(idx, t + 1, DELETE) + profile.trans(t, T_MD)
                        } else {
                            f32::NEG_INFINITY
                        };
                        let m = logsum_all(&[to_m, to_i, to_d, e + Profile::EXIT_SCORE]);

                        let to_m_i = if t + 1 <= t_max {
                            let tp1 = t + 1;
                            let msc = profile.match_score(tp1, residue_next);
                            let nxt_m = matrix.get_nxt(idx, tp1, MATCH);
                            profile.trans(t, T_IM) + msc + nxt_m
                        } else {
                            f32::NEG_INFINITY
                        };
                        let to_i_i = {
                            let isc = profile.insert_score(t, residue_next);
                            let nxt_i = matrix.get_nxt(idx, t, INSERT);
                            profile.trans(t, T_II) + isc + nxt_i
                        };
                        let i = logsum_all(&[to_m_i, to_i_i]);

                        let to_m_d = if t + 1 <= t_max {
                            let tp1 = t + 1;
                            let msc = profile.match_score(tp1, residue_next);
                            let nxt_m = matrix.get_nxt(idx, tp1, MATCH);
                            profile.trans(t, T_DM) + msc + nxt_m
                        } else {
                            f32::NEG_INFINITY
                        };
                        let to_d_d = if t + 1 <= t_max {
                            matrix.get_cur(idx, t + 1, DELETE) + profile.trans(t, T_DD)
                        } else {
                            f32::NEG_INFINITY
                        };
                        let d = logsum_all(&[to_m_d, to_d_d, e + Profile::EXIT_SCORE]);

                        matrix.set_cur(idx, t, MATCH, m);
                        matrix.set_cur(idx, t, INSERT, i);
                        matrix.set_cur(idx, t, DELETE, d);
                    }
                }
            }
        }
    }

    matrix.special(0, S_N)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::bounded::cloud_search::{cloud_search_backward, cloud_search_forward};
    use crate::align::bounded::structs::{
        Bound, CloudBoundGroup, CloudMatrixLinear, CloudSearchParams, Seed,
    };
    use crate::structs::hmm::{Hmm, NUM_CORE_TRANS};
    use crate::structs::sequence::NUM_AMINO;

    fn toy_profile(leng: usize) -> Profile {
        let mut match_emissions = vec![[0.0; NUM_AMINO]; leng + 1];
        let mut insert_emissions = vec![[0.0; NUM_AMINO]; leng + 1];
        let mut transitions = vec![[(0.5f32).ln(); NUM_CORE_TRANS]; leng + 1];
        for k in 0..=leng {
            for a in 0..NUM_AMINO {
                match_emissions[k][a] = (1.0 / NUM_AMINO as f32).ln();
                insert_emissions[k][a] = (1.0 / NUM_AMINO as f32).ln();
            }
        }
        transitions[0] = [f32::NEG_INFINITY; NUM_CORE_TRANS];
        let hmm = Hmm {
            name: "toy".to_string(),
            accession: "TOY".to_string(),
            leng,
            match_emissions,
            insert_emissions,
            transitions,
            viterbi_mu: 0.0,
            viterbi_lambda: 1.0,
            forward_tau: 0.0,
            forward_lambda: 1.0,
        };
        Profile::new(&hmm)
    }

    fn full_row_bounds(q: usize, t: usize) -> (DpMatrixSparse, RowBounds) {
        let mut group = CloudBoundGroup::new(q, t);
        for d in 0..=(q + t) {
            let lo = d.saturating_sub(t);
            let hi = d.min(q);
            if lo <= hi {
                group.push(Bound::new(d, lo, hi + 1));
            }
        }
        group.finalize();
        group.trim_wings();
        let row_bounds = RowBounds::new(&group);
        let matrix = DpMatrixSparse::new(q, t, &row_bounds);
        (matrix, row_bounds)
    }

    #[test]
    fn forward_score_is_finite_over_full_matrix() {
        let profile = toy_profile(8);
        let target = Sequence::from_utf8(b"ACDEFGHI").unwrap();
        let (mut matrix, row_bounds) = full_row_bounds(target.length, profile.length);
        let score = forward_bounded(&profile, &target, &mut matrix, &row_bounds);
        assert!(score.is_finite());
    }

    #[test]
    fn backward_score_is_finite_over_full_matrix() {
        let profile = toy_profile(8);
        let target = Sequence::from_utf8(b"ACDEFGHI").unwrap();
        let (mut matrix, row_bounds) = full_row_bounds(target.length, profile.length);
        let score = backward_bounded(&profile, &target, &mut matrix, &row_bounds);
        assert!(score.is_finite());
    }

    #[test]
    fn forward_and_backward_scores_agree_over_full_matrix() {
        let profile = toy_profile(6);
        let target = Sequence::from_utf8(b"ACDEFG").unwrap();
        let (mut fwd_matrix, row_bounds) = full_row_bounds(target.length, profile.length);
        let fwd = forward_bounded(&profile, &target, &mut fwd_matrix, &row_bounds);

        let mut bck_matrix = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        let bck = backward_bounded(&profile, &target, &mut bck_matrix, &row_bounds);

        assert!((fwd - bck).abs() < 1e-2, "fwd={fwd} bck={bck}");
    }

    #[test]
    fn bounded_forward_matches_cloud_search_when_cloud_covers_full_matrix() {
        // an interior seed with infinite x-drop never prunes, so the
        // resulting cloud should cover the whole matrix and the bounded
        // pass over that shape should still yield a finite score.
        let profile = toy_profile(6);
        let target = Sequence::from_utf8(b"ACDEFG").unwrap();
        let seed = Seed {
            target_name: "t".to_string(),
            target_start: 1,
            target_end: 6,
            profile_start: 1,
            profile_end: 6,
        };
        let params = CloudSearchParams {
            alpha: f32::INFINITY,
            beta: f32::INFINITY,
            gamma: usize::MAX,
        };
        let mut cloud_matrix = CloudMatrixLinear::new(profile.length);
        let mut fwd_bounds = CloudBoundGroup::new(target.length, profile.length);
        cloud_search_forward(&profile, &target, &seed, &mut cloud_matrix, &params, &mut fwd_bounds)
            .unwrap();

        let mut bck_bounds = CloudBoundGroup::new(target.length, profile.length);
        cloud_search_backward(&profile, &target, &seed, &mut cloud_matrix, &params, &mut bck_bounds)
            .unwrap();

        CloudBoundGroup::join_bounds(&mut fwd_bounds, &bck_bounds).unwrap();
        fwd_bounds.trim_wings();
        let row_bounds = RowBounds::new(&fwd_bounds);

        let mut matrix = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        let score = forward_bounded(&profile, &target, &mut matrix, &row_bounds);
        assert!(score.is_finite());
    }
}
