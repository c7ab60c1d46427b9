//! Posterior decoding: combine a finished Forward/Backward pair into
//! per-cell state-occupancy probabilities, normalised so that every
//! row sums to one.

use crate::structs::hmm::{Profile, LOOP, S_B, S_C, S_E, S_J, S_N};

use super::structs::cloud_matrix::{DELETE, INSERT, MATCH};
use super::structs::{DpMatrixSparse, RowBounds};

/// Fill `posterior` from `forward`/`backward`, both already run to
/// completion over the same `row_bounds` shape. `posterior` must have
/// been reshaped (via [`DpMatrixSparse::reuse`]) from the same
/// `row_bounds` as `forward`/`backward`.
pub fn posterior_bounded(
    profile: &Profile,
    forward: &DpMatrixSparse,
    backward: &DpMatrixSparse,
    posterior: &mut DpMatrixSparse,
    row_bounds: &RowBounds,
) {
    let q_max = forward.target_length();
    let z = forward.special(q_max, S_C) + profile.special(S_C, crate::structs::hmm::MOVE);

    posterior.set_special(0, S_N, 0.0);
    posterior.set_special(0, S_B, f32::NEG_INFINITY);
    posterior.set_special(0, S_E, f32::NEG_INFINITY);
    posterior.set_special(0, S_C, f32::NEG_INFINITY);
    posterior.set_special(0, S_J, f32::NEG_INFINITY);

    for q in 1..=q_max {
        if let Some((start, end)) = posterior.row_range(q) {
            for idx in start..end {
                let b = posterior.bound(idx);
                for t in b.lb..b.rb {
                    let m = forward.get_cur(idx, t, MATCH) + backward.get_cur(idx, t, MATCH) - z;
                    posterior.set_cur(idx, t, MATCH, m);

                    let at_right_edge = t + 1 == b.rb;
                    let i = if at_right_edge {
                        f32::NEG_INFINITY
                    } else {
                        forward.get_cur(idx, t, INSERT) + backward.get_cur(idx, t, INSERT) - z
                    };
                    posterior.set_cur(idx, t, INSERT, i);

                    posterior.set_cur(idx, t, DELETE, f32::NEG_INFINITY);
                }
            }
        }

        let n = forward.special(q - 1, S_N) + backward.special(q, S_N) + profile.special(S_N, LOOP) - z;
        posterior.set_special(q, S_N, n);
        let j = forward.special(q - 1, S_J) + backward.special(q, S_J) + profile.special(S_J, LOOP) - z;
        posterior.set_special(q, S_J, j);
        let c = forward.special(q - 1, S_C) + backward.special(q, S_C) + profile.special(S_C, LOOP) - z;
        posterior.set_special(q, S_C, c);
        posterior.set_special(q, S_E, f32::NEG_INFINITY);
        posterior.set_special(q, S_B, f32::NEG_INFINITY);
    }

    // convert to real space and row-normalise.
    for q in 0..=q_max {
        let mut denom = 0.0f32;

        if let Some((start, end)) = posterior.row_range(q) {
            for idx in start..end {
                let b = posterior.bound(idx);
                for t in b.lb..b.rb {
                    let m = posterior.get_cur(idx, t, MATCH).exp();
                    let i = posterior.get_cur(idx, t, INSERT).exp();
                    posterior.set_cur(idx, t, MATCH, m);
                    posterior.set_cur(idx, t, INSERT, i);
                    denom += m + i;
                }
            }
        }

        let n = posterior.special(q, S_N).exp();
        let j = posterior.special(q, S_J).exp();
        let c = posterior.special(q, S_C).exp();
        posterior.set_special(q, S_N, n);
        posterior.set_special(q, S_J, j);
        posterior.set_special(q, S_C, c);
        denom += n + j + c;

        if denom <= 0.0 {
            continue;
        }

        if let Some((start, end)) = posterior.row_range(q) {
            for idx in start..end {
                let b = posterior.bound(idx);
                for t in b.lb..b.rb {
                    let m = posterior.get_cur(idx, t, MATCH) / denom;
                    let i = posterior.get_cur(idx, t, INSERT) / denom;
                    posterior.set_cur(idx, t, MATCH, m);
                    posterior.set_cur(idx, t, INSERT, i);
                }
            }
        }
        posterior.set_special(q, S_N, n / denom);
        posterior.set_special(q, S_J, j / denom);
        posterior.set_special(q, S_C, c / denom);
    }

    let _ = row_bounds;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::bounded::fwdbck::{backward_bounded, forward_bounded};
    use crate::align::bounded::structs::{Bound, CloudBoundGroup};
    use crate::structs::hmm::{Hmm, NUM_CORE_TRANS};
    use crate::structs::sequence::{Sequence, NUM_AMINO};

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

    fn full_row_bounds(q: usize, t: usize) -> RowBounds {
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
        RowBounds::new(&group)
    }

    #[test]
    fn every_row_sums_to_one_after_normalisation() {
        let profile = toy_profile(5);
        let target = Sequence::from_utf8(b"ACDEF").unwrap();
        let row_bounds = full_row_bounds(target.length, profile.length);

        let mut fwd = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        forward_bounded(&profile, &target, &mut fwd, &row_bounds);
        let mut bck = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        backward_bounded(&profile, &target, &mut bck, &row_bounds);

        let mut post = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        posterior_bounded(&profile, &fwd, &bck, &mut post, &row_bounds);

        for q in 1..=target.length {
            let mut total = post.special(q, S_N) + post.special(q, S_J) + post.special(q, S_C);
            if let Some((start, end)) = post.row_range(q) {
                for idx in start..end {
                    let b = post.bound(idx);
                    for t in b.lb..b.rb {
                        total += post.get_cur(idx, t, MATCH) + post.get_cur(idx, t, INSERT);
                    }
                }
            }
            assert!((total - 1.0).abs() < 1e-2, "row {q} sums to {total}");
        }
    }

    #[test]
    fn posteriors_are_non_negative() {
        let profile = toy_profile(4);
        let target = Sequence::from_utf8(b"ACDE").unwrap();
        let row_bounds = full_row_bounds(target.length, profile.length);

        let mut fwd = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        forward_bounded(&profile, &target, &mut fwd, &row_bounds);
        let mut bck = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        backward_bounded(&profile, &target, &mut bck, &row_bounds);

        let mut post = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        posterior_bounded(&profile, &fwd, &bck, &mut post, &row_bounds);

        for q in 1..=target.length {
            if let Some((start, end)) = post.row_range(q) {
                for idx in start..end {
                    let b = post.bound(idx);
                    for t in b.lb..b.rb {
                        assert!(post.get_cur(idx, t, MATCH) >= 0.0);
                        assert!(post.get_cur(idx, t, INSERT) >= 0.0);
                    }
                }
            }
        }
    }
}
