//! Antidiagonal cloud search (spec.md §4.3): a forward sweep from the
//! seed's begin point and a backward sweep from its end point, each
//! walking the DP lattice one antidiagonal at a time and pruning with
//! the double-x-drop edge-trim variant (spec.md §9 "Pruner variants"
//! names this as the one the core targets). Both sweeps write a
//! by-antidiagonal [`CloudBoundGroup`].
//!
//! Geometry follows spec.md §4.3: antidiagonal `d = q + t`, and a
//! [`Bound`]'s `lb`/`rb` range the *query* coordinate `q` (matching
//! [`CloudBoundGroup`]'s existing convention). [`CloudMatrixLinear`]
//! addresses the same cells by `(d, t)` instead (see its own doc
//! comment); every per-cell read/write below converts `q` to
//! `t = d - q` at the boundary.

use crate::error::NaleError;
use crate::numeric::logsum_all;
use crate::structs::hmm::{Profile, T_DD, T_DM, T_IM, T_II, T_MD, T_MI, T_MM};
use crate::structs::sequence::Sequence;

use super::structs::bound::Bound;
use super::structs::cloud_bound_group::CloudBoundGroup;
use super::structs::cloud_matrix::{CloudMatrixLinear, DELETE, INSERT, MATCH};
use super::structs::cloud_search_params::CloudSearchParams;
use super::structs::seed::Seed;

pub fn cloud_search_forward(
    profile: &Profile,
    target: &Sequence,
    seed: &Seed,
    cloud_matrix: &mut CloudMatrixLinear,
    params: &CloudSearchParams,
    out: &mut CloudBoundGroup,
) -> Result<(), NaleError> {
    let q_max = target.length;
    let t_max = profile.length;
    check_preconditions(q_max, t_max)?;

    let (q_beg, t_beg, _q_end, _t_end) = seed.clamped(q_max, t_max);

    cloud_matrix.reuse(t_max);
    out.reuse(q_max, t_max);

    let d_st = q_beg + t_beg;
    let d_last = q_max + t_max;

    let mut current_range = Some((q_beg, q_beg + 1));
    let mut total_max = f32::NEG_INFINITY;
    let mut terminate = false;
    let mut d = d_st;

    while let Some((prev_lb, prev_rb)) = current_range {
        if d > d_last {
            break;
        }

        let clip_lo = q_beg.max(d.saturating_sub(t_max));
        let clip_hi = q_max.min(d);
        let raw_lb = prev_lb.saturating_sub(1).max(clip_lo);
        let raw_rb = (prev_rb + 1).min(clip_hi + 1);

        if raw_lb >= raw_rb {
            break;
        }

        let mut row_max = vec![f32::NEG_INFINITY; raw_rb - raw_lb];
        let mut diag_max = f32::NEG_INFINITY;
        for q in raw_lb..raw_rb {
            let t = d - q;
            let residue = target.residue(q);
            let score = forward_cell(profile, cloud_matrix, d, t, residue, d == d_st);
            row_max[q - raw_lb] = score;
            diag_max = diag_max.max(score);
        }
        total_max = total_max.max(diag_max);

        let (lb, rb) = if d - d_st < params.gamma as usize {
            (raw_lb, raw_rb)
        } else {
            let diag_limit = diag_max - params.alpha;
            let total_limit = total_max - params.beta;
            if diag_max < total_limit && (d != d_st) {
                terminate = true;
            }
            trim_edges(&row_max, raw_lb, diag_limit)
        };

        if lb < rb {
            out.push(Bound::new(d, lb, rb));
            current_range = Some((lb, rb));
        } else {
            current_range = None;
        }

        if d >= 2 {
            cloud_matrix.scrub(d - 2);
        }

        if terminate || d == d_last {
            break;
        }
        d += 1;
    }

    out.finalize();
    Ok(())
}

pub fn cloud_search_backward(
    profile: &Profile,
    target: &Sequence,
    seed: &Seed,
    cloud_matrix: &mut CloudMatrixLinear,
    params: &CloudSearchParams,
    out: &mut CloudBoundGroup,
) -> Result<(), NaleError> {
    let q_max = target.length;
    let t_max = profile.length;
    check_preconditions(q_max, t_max)?;

    let (_q_beg, _t_beg, q_end, t_end) = seed.clamped(q_max, t_max);

    cloud_matrix.reuse(t_max);
    out.reuse(q_max, t_max);

    let d_end = q_end + t_end;

    let mut current_range = Some((q_end, q_end + 1));
    let mut total_max = f32::NEG_INFINITY;
    let mut terminate = false;
    let mut d = d_end;
    let mut steps = 0usize;

    loop {
        let Some((prev_lb, prev_rb)) = current_range else {
            break;
        };

        let clip_lo = d.saturating_sub(t_max);
        let clip_hi = q_end.min(d);
        let raw_lb = prev_lb.saturating_sub(1).max(clip_lo);
        let raw_rb = (prev_rb + 1).min(clip_hi + 1);

        if raw_lb >= raw_rb {
            break;
        }

        let mut row_max = vec![f32::NEG_INFINITY; raw_rb - raw_lb];
        let mut diag_max = f32::NEG_INFINITY;
        for q in raw_lb..raw_rb {
            let t = d - q;
            let residue_next = if q + 1 <= q_max { Some(target.residue(q + 1)) } else { None };
            let score = backward_cell(
                profile,
                cloud_matrix,
                d,
                t,
                t_max,
                q_max + t_max,
                residue_next,
                d == d_end,
            );
            row_max[q - raw_lb] = score;
            diag_max = diag_max.max(score);
        }
        total_max = total_max.max(diag_max);

        let (lb, rb) = if steps < params.gamma {
            (raw_lb, raw_rb)
        } else {
            let diag_limit = diag_max - params.alpha;
            let total_limit = total_max - params.beta;
            if diag_max < total_limit && d != d_end {
                terminate = true;
            }
            trim_edges(&row_max, raw_lb, diag_limit)
        };

        if lb < rb {
            out.push(Bound::new(d, lb, rb));
            current_range = Some((lb, rb));
        } else {
            current_range = None;
        }

        cloud_matrix.scrub(d + 2);

        steps += 1;
        if terminate || d == 0 {
            break;
        }
        d -= 1;
    }

    out.finalize();
    Ok(())
}

fn check_preconditions(q_max: usize, t_max: usize) -> Result<(), NaleError> {
    if q_max == 0 {
        return Err(NaleError::BadInput("query has zero length".to_string()));
    }
    if t_max == 0 {
        return Err(NaleError::BadInput("profile has zero length".to_string()));
    }
    Ok(())
}

/// Shrink `[lb, rb)` from both ends until a cell's score clears
/// `diag_limit` (spec.md §4.3 step 2c), or drop the range entirely.
fn trim_edges(row_max: &[f32], raw_lb: usize, diag_limit: f32) -> (usize, usize) {
    let Some(first) = row_max.iter().position(|&s| s >= diag_limit) else {
        return (raw_lb, raw_lb);
    };
    let last = row_max.iter().rposition(|&s| s >= diag_limit).unwrap();
    (raw_lb + first, raw_lb + last + 1)
}

#[allow(clippy::too_many_arguments)]
fn forward_cell(
    profile: &Profile,
    cloud_matrix: &mut CloudMatrixLinear,
    d: usize,
    t: usize,
    residue: u8,
    is_begin_anchor: bool,
) -> f32 {
    let b_term = if is_begin_anchor { 0.0 } else { f32::NEG_INFINITY };

    let (m_diag, i_diag, d_diag) = if d >= 2 && t >= 1 {
        let tm1 = t - 1;
        (
            cloud_matrix.get(d - 2, tm1, MATCH) + profile.trans(tm1, T_MM),
            cloud_matrix.get(d - 2, tm1, INSERT) + profile.trans(tm1, T_IM),
            cloud_matrix.get(d - 2, tm1, DELETE) + profile.trans(tm1, T_DM),
        )
    } else {
        (f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY)
    };
    let m = profile.match_score(t, residue) + logsum_all(&[m_diag, i_diag, d_diag, b_term]);

    let (m_vert, i_vert) = if d >= 1 {
        (
            cloud_matrix.get(d - 1, t, MATCH) + profile.trans(t, T_MI),
            cloud_matrix.get(d - 1, t, INSERT) + profile.trans(t, T_II),
        )
    } else {
        (f32::NEG_INFINITY, f32::NEG_INFINITY)
    };
    let i = profile.insert_score(t, residue) + logsum_all(&[m_vert, i_vert]);

    let (m_horiz, d_horiz) = if d >= 1 && t >= 1 {
        let tm1 = t - 1;
        (
            cloud_matrix.get(d - 1, tm1, MATCH) + profile.trans(tm1, T_MD),
            cloud_matrix.get(d - 1, tm1, DELETE) + profile.trans(tm1, T_DD),
        )
    } else {
        (f32::NEG_INFINITY, f32::NEG_INFINITY)
    };
    let del = logsum_all(&[m_horiz, d_horiz]);

    cloud_matrix.set(d, t, MATCH, m);
    cloud_matrix.set(d, t, INSERT, i);
    cloud_matrix.set(d, t, DELETE, del);

    m.max(i).max(del)
}

/// Mirror of [`forward_cell`], but true backward semantics: being in
/// state `(q,t)` has not yet paid for residue `q+1`'s emission, so
/// unlike [`forward_cell`] (which factors its own emission out front)
/// each outbound term here pays the *destination* state's emission
/// explicitly — `MSC(t+1, residue(q+1))` for a transition into `M`,
/// `ISC(t, residue(q+1))` into `I`, nothing into the silent `D`.
/// `residue_next` is `residue(q+1)`, `None` past the query's end.
#[allow(clippy::too_many_arguments)]
fn backward_cell(
    profile: &Profile,
    cloud_matrix: &mut CloudMatrixLinear,
    d: usize,
    t: usize,
    t_max: usize,
    d_max: usize,
    residue_next: Option<u8>,
    is_end_anchor: bool,
) -> f32 {
    let e_term = if is_end_anchor { 0.0 } else { f32::NEG_INFINITY };

    let (to_m_via_mm, to_m_via_im, to_m_via_dm) = if d + 2 <= d_max && t + 1 <= t_max {
        if let Some(r) = residue_next {
            let tp1 = t + 1;
            let msc = profile.match_score(tp1, r);
            let nxt = cloud_matrix.get(d + 2, tp1, MATCH);
            (
                profile.trans(t, T_MM) + msc + nxt,
                profile.trans(t, T_IM) + msc + nxt,
                profile.trans(t, T_DM) + msc + nxt,
            )
        } else {
            (f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY)
        }
    } else {
        (f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY)
    };

    let (to_i_via_mi, to_i_via_ii) = if d + 1 <= d_max {
        if let Some(r) = residue_next {
            let isc = profile.insert_score(t, r);
            let nxt = cloud_matrix.get(d + 1, t, INSERT);
            (profile.trans(t, T_MI) + isc + nxt, profile.trans(t, T_II) + isc + nxt)
        } else {
            (f32::NEG_INFINITY, f32::NEG_INFINITY)
        }
    } else {
        (f32::NEG_INFINITY, f32::NEG_INFINITY)
    };

    let (to_d_via_md, to_d_via_dd) = if d + 1 <= d_max && t + 1 <= t_max {
        let tp1 = t + 1;
        let nxt = cloud_matrix.get(d + 1, tp1, DELETE);
        (profile.trans(t, T_MD) + nxt, profile.trans(t, T_DD) + nxt)
    } else {
        (f32::NEG_INFINITY, f32::NEG_INFINITY)
    };

    let m = logsum_all(&[to_m_via_mm, to_i_via_mi, to_d_via_md, e_term]);
    let i = logsum_all(&[to_m_via_im, to_i_via_ii]);
    let del = logsum_all(&[to_m_via_dm, to_d_via_dd, e_term]);

    cloud_matrix.set(d, t, MATCH, m);
    cloud_matrix.set(d, t, INSERT, i);
    cloud_matrix.set(d, t, DELETE, del);

    m.max(i).max(del)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::hmm::{Hmm, NUM_CORE_TRANS};
    use crate::structs::sequence::NUM_AMINO;

    fn toy_profile(leng: usize) -> Profile {
        let mut match_emissions = vec![[0.0; NUM_AMINO]; leng + 1];
        let mut insert_emissions = vec![[0.0; NUM_AMINO]; leng + 1];
        let mut transitions = vec![[(-1.0f32).ln(); NUM_CORE_TRANS]; leng + 1];
        for k in 0..=leng {
            for a in 0..NUM_AMINO {
                match_emissions[k][a] = (1.0 / NUM_AMINO as f32).ln();
                insert_emissions[k][a] = (1.0 / NUM_AMINO as f32).ln();
            }
            transitions[k] = [(0.5f32).ln(); NUM_CORE_TRANS];
        }
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

    #[test]
    fn forward_sweep_on_trivial_diagonal_covers_expected_cells() {
        let profile = toy_profile(10);
        let target = Sequence::from_utf8(b"ACDEFGHIKL").unwrap();
        let seed = Seed {
            target_name: "t".to_string(),
            target_start: 1,
            target_end: 10,
            profile_start: 1,
            profile_end: 10,
        };
        let mut cloud_matrix = CloudMatrixLinear::new(profile.length);
        let mut out = CloudBoundGroup::new(target.length, profile.length);
        cloud_search_forward(
            &profile,
            &target,
            &seed,
            &mut cloud_matrix,
            &CloudSearchParams::default(),
            &mut out,
        )
        .unwrap();
        assert!(out.valid());
        assert!(out.inner.count_cells() >= 1);
    }

    #[test]
    fn backward_sweep_on_trivial_diagonal_is_nonempty() {
        let profile = toy_profile(10);
        let target = Sequence::from_utf8(b"ACDEFGHIKL").unwrap();
        let seed = Seed {
            target_name: "t".to_string(),
            target_start: 1,
            target_end: 10,
            profile_start: 1,
            profile_end: 10,
        };
        let mut cloud_matrix = CloudMatrixLinear::new(profile.length);
        let mut out = CloudBoundGroup::new(target.length, profile.length);
        cloud_search_backward(
            &profile,
            &target,
            &seed,
            &mut cloud_matrix,
            &CloudSearchParams::default(),
            &mut out,
        )
        .unwrap();
        assert!(out.valid());
    }

    #[test]
    fn zero_length_profile_is_bad_input() {
        let profile = toy_profile(0);
        let target = Sequence::from_utf8(b"ACD").unwrap();
        let seed = Seed {
            target_name: "t".to_string(),
            target_start: 1,
            target_end: 1,
            profile_start: 0,
            profile_end: 0,
        };
        let mut cloud_matrix = CloudMatrixLinear::new(profile.length);
        let mut out = CloudBoundGroup::new(target.length, profile.length);
        let result = cloud_search_forward(
            &profile,
            &target,
            &seed,
            &mut cloud_matrix,
            &CloudSearchParams::default(),
            &mut out,
        );
        assert!(result.is_err());
    }
}
