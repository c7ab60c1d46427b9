//! Null-model scoring: the standard two-state background filter
//! (`null1`) and the per-domain composition bias correction
//! (`null2`), plus the domain-boundary state machine that names the
//! ranges `null2` corrects.

use crate::numeric::logsum;
use crate::structs::hmm::{Profile, LOOP, S_B, S_C, S_E, S_J, S_N};
use crate::structs::sequence::{Sequence, DEGENERATE_X, GAP, MISSING, NON_RESIDUE, NUM_AMINO};

use super::fwdbck::{backward_bounded_in_range, forward_bounded_in_range};
use super::posterior::posterior_bounded;
use super::structs::cloud_matrix::{INSERT, MATCH};
use super::structs::{DomainThresholds, DpMatrixSparse, RowBounds};

/// The background (null1) model score: HMMER's standard two-state
/// geometric length distribution, `p1 = L / (L + 1)`, in nats.
/// `null1_score(L) = L * ln(p1) + ln(1 - p1)`.
pub fn null1_score(target_length: usize) -> f32 {
    let l = target_length as f32;
    if l <= 0.0 {
        return 0.0;
    }
    let p1 = l / (l + 1.0);
    l * p1.ln() + (1.0 - p1).ln()
}

/// Cumulative begin/end posteriors and model occupancy per query
/// position, built from the dense special-state planes of a finished
/// Forward/Backward pair and the overall Forward score `z` (in nats).
/// `m_occ[q]` is the posterior probability that query position `q`
/// is explained by some match state rather than `N`/`J`/`C`.
pub fn domain_accumulators(
    profile: &Profile,
    forward: &DpMatrixSparse,
    backward: &DpMatrixSparse,
    z: f32,
) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let q_max = forward.target_length();
    let mut b_tot = vec![0.0f32; q_max + 1];
    let mut e_tot = vec![0.0f32; q_max + 1];
    let mut m_occ = vec![0.0f32; q_max + 1];

    for q in 1..=q_max {
        b_tot[q] = b_tot[q - 1]
            + (forward.special(q - 1, S_B) + backward.special(q - 1, S_B) - z).exp();
        e_tot[q] =
            e_tot[q - 1] + (forward.special(q, S_E) + backward.special(q, S_E) - z).exp();

        let njc_pr = (forward.special(q - 1, S_N) + backward.special(q, S_N)
            + profile.special(S_N, LOOP)
            - z)
            .exp()
            + (forward.special(q - 1, S_J) + backward.special(q, S_J)
                + profile.special(S_J, LOOP)
                - z)
                .exp()
            + (forward.special(q - 1, S_C) + backward.special(q, S_C)
                + profile.special(S_C, LOOP)
                - z)
                .exp();
        m_occ[q] = 1.0 - njc_pr;
    }

    (b_tot, e_tot, m_occ)
}

/// The domain-finding state machine: a single pass over
/// `m_occ`/`b_tot`/`e_tot` driven by `rt1`/`rt2`, naming every
/// `(q_beg, q_end)` range whose model occupancy crossed `rt1`. Begins
/// "outside"; while outside, `q_beg` tracks the most recent row where
/// the begin-posterior increment nearly accounts for all of `m_occ`
/// (a domain hasn't really started yet). Crossing `rt1` enters
/// "inside"; a domain closes, and the machine returns to "outside",
/// once the symmetric end-posterior condition holds.
pub fn find_domains(
    q_max: usize,
    b_tot: &[f32],
    e_tot: &[f32],
    m_occ: &[f32],
    thresholds: &DomainThresholds,
) -> Vec<(usize, usize)> {
    let mut domains = Vec::new();
    let mut inside = false;
    let mut q_beg: Option<usize> = None;

    for q in 1..=q_max {
        if !inside {
            if m_occ[q] - (b_tot[q] - b_tot[q - 1]) < thresholds.rt2 {
                q_beg = Some(q);
            }
            if m_occ[q] >= thresholds.rt1 {
                inside = true;
            }
        } else if m_occ[q] - (e_tot[q] - e_tot[q - 1]) < thresholds.rt2 {
            if let Some(beg) = q_beg {
                domains.push((beg, q));
            }
            inside = false;
            q_beg = None;
        }
    }

    if inside {
        if let Some(beg) = q_beg {
            domains.push((beg, q_max));
        }
    }

    domains
}

/// Null2 composition bias, modelled after HMMER's
/// `p7_GNull2_ByExpectation`: accumulate the posterior mass every
/// match/insert cell and every `N`/`J`/`C` special contributed, turn
/// that into an expected per-amino log-odds correction, then sum the
/// correction along the target sequence that `row_bounds` names. The
/// caller restricts `row_bounds`/`posterior` to a single detected
/// domain (via the `_in_range` Forward/Backward/posterior passes) for
/// true per-domain re-scoring; run over the whole cloud, it corrects
/// the bias of the match as a whole.
pub fn null2_score(
    posterior: &DpMatrixSparse,
    profile: &Profile,
    target: &Sequence,
    row_bounds: &RowBounds,
) -> f32 {
    let t_max = profile.length;
    let q_max = posterior.target_length();

    let mut st_freq_m = vec![0.0f32; t_max + 1];
    let mut st_freq_i = vec![0.0f32; t_max + 1];

    if row_bounds.target_start <= row_bounds.target_end {
        for q in row_bounds.target_start..=row_bounds.target_end {
            if let Some((start, end)) = posterior.row_range(q) {
                for idx in start..end {
                    let b = posterior.bound(idx);
                    for t in b.lb..b.rb {
                        st_freq_m[t] += posterior.get_cur(idx, t, MATCH);
                        st_freq_i[t] += posterior.get_cur(idx, t, INSERT);
                    }
                }
            }
        }
    }

    // special-state frequencies sum over the whole sequence, matching
    // HMMER's reference implementation, regardless of the domain range
    // `row_bounds` otherwise restricts normal-cell accumulation to.
    let mut sp_n = 0.0f32;
    let mut sp_j = 0.0f32;
    let mut sp_c = 0.0f32;
    for q in 0..=q_max {
        sp_n += posterior.special(q, S_N);
        sp_j += posterior.special(q, S_J);
        sp_c += posterior.special(q, S_C);
    }

    let neglog_q = -(q_max.max(1) as f32).ln();
    for t in 0..=t_max {
        st_freq_m[t] = st_freq_m[t].max(f32::MIN_POSITIVE).ln() + neglog_q;
        st_freq_i[t] = st_freq_i[t].max(f32::MIN_POSITIVE).ln() + neglog_q;
    }
    let f_n = sp_n.max(f32::MIN_POSITIVE).ln() + neglog_q;
    let f_j = sp_j.max(f32::MIN_POSITIVE).ln() + neglog_q;
    let f_c = sp_c.max(f32::MIN_POSITIVE).ln() + neglog_q;
    let x_factor = logsum(f_n, logsum(f_c, f_j));

    let mut null2 = [0.0f32; NUM_AMINO];
    for a in 0..NUM_AMINO {
        let mut acc = f32::NEG_INFINITY;
        for t in 1..t_max {
            acc = logsum(acc, st_freq_m[t] + profile.match_score(t, a as u8));
            acc = logsum(acc, st_freq_i[t] + profile.insert_score(t, a as u8));
        }
        if t_max > 0 {
            acc = logsum(acc, st_freq_m[t_max] + profile.match_score(t_max, a as u8));
        }
        acc = logsum(acc, x_factor);
        null2[a] = acc.exp();
    }

    let degenerate_mean = null2.iter().sum::<f32>() / NUM_AMINO as f32;

    let mut bias = 0.0f32;
    if row_bounds.target_start <= row_bounds.target_end {
        for q in row_bounds.target_start..=row_bounds.target_end {
            let residue = target.residue(q);
            let val = match residue {
                r if (r as usize) < NUM_AMINO => null2[r as usize],
                DEGENERATE_X => degenerate_mean,
                GAP | NON_RESIDUE | MISSING => 1.0,
                _ => degenerate_mean,
            };
            bias += val.ln();
        }
    }
    bias
}

/// Wire spec.md §4.8's domain-finding state machine into §4.9/§4.10's
/// scoring: build `b_tot`/`e_tot`/`m_occ` from the finished whole-cloud
/// Forward/Backward pair, find every domain `m_occ` crosses `rt1` for,
/// re-score each domain's envelope via the `_in_range` passes, and
/// return the `(forward_score_nats, bias_correction_nats)` of whichever
/// domain's corrected bit-score is highest.
///
/// `forward_matrix`/`backward_matrix` already hold a completed
/// whole-cloud Forward/Backward pass on entry and are overwritten by
/// each domain's restricted rerun; `domain_posterior_matrix` is scratch
/// space reused across domains and must not alias the caller's
/// whole-cloud posterior matrix (the MEA traceback needs that left
/// untouched). If no domain crosses `rt1`, spec.md §4.8's edge case
/// applies: the seed is reported on the whole-cloud Forward score alone,
/// with zero bias correction.
#[allow(clippy::too_many_arguments)]
pub fn best_domain_score(
    profile: &Profile,
    target: &Sequence,
    forward_matrix: &mut DpMatrixSparse,
    backward_matrix: &mut DpMatrixSparse,
    domain_posterior_matrix: &mut DpMatrixSparse,
    row_bounds: &RowBounds,
    whole_cloud_forward_nats: f32,
    thresholds: &DomainThresholds,
) -> (f32, f32) {
    let (b_tot, e_tot, m_occ) = domain_accumulators(
        profile,
        forward_matrix,
        backward_matrix,
        whole_cloud_forward_nats,
    );
    let domains = find_domains(target.length, &b_tot, &e_tot, &m_occ, thresholds);

    let null_sc = null1_score(target.length);
    let mut best: Option<(f32, f32, f32)> = None; // (bit_score, fwd_nats, bias)

    for (q_beg, q_end) in domains {
        let range = Some((q_beg, q_end));
        let fwd_nats =
            forward_bounded_in_range(profile, target, forward_matrix, row_bounds, range);
        backward_bounded_in_range(profile, target, backward_matrix, row_bounds, range);
        posterior_bounded(
            profile,
            forward_matrix,
            backward_matrix,
            domain_posterior_matrix,
            row_bounds,
        );

        let mut domain_row_bounds = row_bounds.clone();
        domain_row_bounds.target_start = q_beg;
        domain_row_bounds.target_end = q_end;

        let bias = null2_score(domain_posterior_matrix, profile, target, &domain_row_bounds);
        let bit_score = (fwd_nats - (null_sc + bias)) / std::f32::consts::LN_2;

        if best.is_none_or(|(best_bits, _, _)| bit_score > best_bits) {
            best = Some((bit_score, fwd_nats, bias));
        }
    }

    match best {
        Some((_, fwd_nats, bias)) => (fwd_nats, bias),
        None => (whole_cloud_forward_nats, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::bounded::fwdbck::{backward_bounded, forward_bounded};
    use crate::align::bounded::structs::{Bound, CloudBoundGroup, RowBounds};
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
    fn best_domain_score_falls_back_to_whole_cloud_when_no_domain_found() {
        // rt1 = 2.0 is unreachable by any posterior, so find_domains
        // never fires and the whole-cloud Forward score is returned
        // with zero bias, per spec.md §4.8's edge case.
        let profile = toy_profile(6);
        let target = Sequence::from_utf8(b"ACDEFG").unwrap();
        let row_bounds = full_row_bounds(target.length, profile.length);

        let mut forward_matrix = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        let mut backward_matrix = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        let mut scratch_matrix = DpMatrixSparse::new(target.length, profile.length, &row_bounds);

        let fwd = forward_bounded(&profile, &target, &mut forward_matrix, &row_bounds);
        backward_bounded(&profile, &target, &mut backward_matrix, &row_bounds);

        let thresholds = DomainThresholds {
            rt1: 2.0,
            rt2: 0.1,
        };
        let (fwd_nats, bias) = best_domain_score(
            &profile,
            &target,
            &mut forward_matrix,
            &mut backward_matrix,
            &mut scratch_matrix,
            &row_bounds,
            fwd,
            &thresholds,
        );

        assert_eq!(fwd_nats, fwd);
        assert_eq!(bias, 0.0);
    }

    #[test]
    fn best_domain_score_rescopes_to_a_detected_domain() {
        let profile = toy_profile(6);
        let target = Sequence::from_utf8(b"ACDEFG").unwrap();
        let row_bounds = full_row_bounds(target.length, profile.length);

        let mut forward_matrix = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        let mut backward_matrix = DpMatrixSparse::new(target.length, profile.length, &row_bounds);
        let mut scratch_matrix = DpMatrixSparse::new(target.length, profile.length, &row_bounds);

        let fwd = forward_bounded(&profile, &target, &mut forward_matrix, &row_bounds);
        backward_bounded(&profile, &target, &mut backward_matrix, &row_bounds);

        let thresholds = DomainThresholds::default();
        let (fwd_nats, _bias) = best_domain_score(
            &profile,
            &target,
            &mut forward_matrix,
            &mut backward_matrix,
            &mut scratch_matrix,
            &row_bounds,
            fwd,
            &thresholds,
        );

        assert!(fwd_nats.is_finite());
    }

    #[test]
    fn null1_score_is_zero_length_safe() {
        assert_eq!(null1_score(0), 0.0);
    }

    #[test]
    fn null1_score_grows_more_negative_with_length() {
        let short = null1_score(10);
        let long = null1_score(1000);
        assert!(long < short);
    }

    #[test]
    fn find_domains_reports_nothing_when_occupancy_never_crosses_rt1() {
        let q_max = 5;
        let b_tot = vec![0.0; q_max + 1];
        let e_tot = vec![0.0; q_max + 1];
        let m_occ = vec![0.0; q_max + 1];
        let thresholds = DomainThresholds::default();
        assert!(find_domains(q_max, &b_tot, &e_tot, &m_occ, &thresholds).is_empty());
    }

    #[test]
    fn find_domains_reports_one_range_for_a_single_occupancy_bump() {
        let q_max = 6;
        let mut b_tot = vec![0.0f32; q_max + 1];
        let mut e_tot = vec![0.0f32; q_max + 1];
        let mut m_occ = vec![0.0f32; q_max + 1];
        // occupancy rises through the middle of the sequence and falls
        // back to (near) zero by the end.
        for q in 1..=q_max {
            m_occ[q] = if (2..=4).contains(&q) { 0.9 } else { 0.0 };
            b_tot[q] = b_tot[q - 1];
            e_tot[q] = e_tot[q - 1];
        }
        let thresholds = DomainThresholds::default();
        let domains = find_domains(q_max, &b_tot, &e_tot, &m_occ, &thresholds);
        assert_eq!(domains.len(), 1);
        let (beg, end) = domains[0];
        assert!(beg <= 2);
        assert!(end >= 4);
    }

    #[test]
    fn find_domains_closes_an_unterminated_domain_at_q_max() {
        let q_max = 4;
        let b_tot = vec![0.0f32; q_max + 1];
        let e_tot = vec![0.0f32; q_max + 1];
        let mut m_occ = vec![0.0f32; q_max + 1];
        for q in 1..=q_max {
            m_occ[q] = 0.9;
        }
        let thresholds = DomainThresholds::default();
        let domains = find_domains(q_max, &b_tot, &e_tot, &m_occ, &thresholds);
        assert_eq!(domains, vec![(1, q_max)]);
    }
}
