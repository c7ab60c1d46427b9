//! Result aggregation (spec.md §4.10): bit-score conversion and
//! p/e-value assembly from a traceback and the per-stage nat-scores
//! the bounded passes produce.

use crate::align::bounded::null1_score;
use crate::structs::hmm::Profile;
use crate::structs::sequence::Sequence;
use crate::structs::trace::Trace;

const LN2: f32 = std::f32::consts::LN_2;

/// The per-pair score accumulator `pipeline/multithread.rs` builds up
/// across Forward, null1 and null2, then hands to
/// [`Alignment::from_trace`]. Field names mirror the teacher's
/// `nale::structs::alignment::ScoreParams` exactly, since the pipeline
/// constructs and mutates one by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreParams {
    pub target_count: usize,
    pub forward_score_nats: f32,
    pub null_score_nats: f32,
    pub bias_correction_score_nats: f32,
}

impl ScoreParams {
    pub fn new(target_count: usize) -> Self {
        Self {
            target_count,
            forward_score_nats: 0.0,
            null_score_nats: 0.0,
            bias_correction_score_nats: 0.0,
        }
    }
}

/// A scored, traced `(query, target)` hit, ready for the tabular
/// writer.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub query_name: String,
    pub target_name: String,
    pub query_start: usize,
    pub query_end: usize,
    pub target_start: usize,
    pub target_end: usize,
    pub pre_score_bits: f32,
    pub seq_score_bits: f32,
    pub bias_correction_nats: f32,
    pub pvalue: f64,
    pub evalue: f64,
}

impl Alignment {
    /// Convenience constructor for call sites that only have the
    /// traceback and a target count in hand, with no Forward score or
    /// bias correction to report. `forward_score_nats` and
    /// `bias_correction_score_nats` are left at zero, so `pre_sc`/
    /// `seq_sc` are not meaningful here; prefer
    /// [`Alignment::from_trace`] with a populated [`ScoreParams`].
    pub fn new(trace: &Trace, profile: &Profile, target: &Sequence, target_count: usize) -> Self {
        let mut score_params = ScoreParams::new(target_count);
        score_params.null_score_nats = null1_score(target.length);
        Self::from_trace(trace, profile, target, &score_params)
    }

    pub fn from_trace(
        trace: &Trace,
        profile: &Profile,
        target: &Sequence,
        score_params: &ScoreParams,
    ) -> Self {
        let (query_start, query_end) = trace.query_range().unwrap_or((0, 0));
        let (target_start, target_end) = target_range(trace).unwrap_or((0, 0));

        let fwd = score_params.forward_score_nats;
        let null_sc = score_params.null_score_nats;
        let bias = score_params.bias_correction_score_nats;

        let pre_score_bits = (fwd - null_sc) / LN2;
        let seq_score_bits = (fwd - (null_sc + bias)) / LN2;

        let ln_pval = forward_survivor_ln(seq_score_bits, profile.forward_tau, profile.forward_lambda);
        let pvalue = ln_pval.exp().min(1.0);
        let evalue = pvalue * score_params.target_count.max(1) as f64;

        Self {
            query_name: profile.name.clone(),
            target_name: target.name.clone(),
            query_start,
            query_end,
            target_start,
            target_end,
            pre_score_bits,
            seq_score_bits,
            bias_correction_nats: bias,
            pvalue,
            evalue,
        }
    }

    /// Tab-separated record matching the mmseqs `convertalis`
    /// `--format-output query,target,qstart,qend,tstart,tend,evalue`
    /// convention, with the corrected bit-score appended.
    pub fn tab_string(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:e}\t{:.2}",
            self.query_name,
            self.target_name,
            self.query_start,
            self.query_end,
            self.target_start,
            self.target_end,
            self.evalue,
            self.seq_score_bits,
        )
    }
}

fn target_range(trace: &Trace) -> Option<(usize, usize)> {
    use crate::structs::trace::TraceStep;
    let mut lo = None;
    let mut hi = None;
    for p in &trace.points {
        if matches!(p.state, TraceStep::Match | TraceStep::Delete) {
            lo = Some(lo.map_or(p.t, |l: usize| l.min(p.t)));
            hi = Some(hi.map_or(p.t, |h: usize| h.max(p.t)));
        }
    }
    lo.zip(hi)
}

/// Exponential-tail survivor function (GLOSSARY: used for Forward-
/// style scores): `ln S(x) = -lambda * (x - tau)` for `x >= tau`, `0`
/// otherwise (the score is at or below the tail's location parameter,
/// i.e. p-value 1).
fn forward_survivor_ln(bit_score: f32, tau: f32, lambda: f32) -> f64 {
    if lambda <= 0.0 {
        return 0.0;
    }
    let x = (bit_score - tau).max(0.0) as f64;
    -(lambda as f64) * x
}

/// Gumbel-tail survivor function (GLOSSARY: used for Viterbi-style
/// scores): `ln S(x) = -exp(-lambda * (x - mu))`.
pub fn gumbel_survivor_ln(score: f32, mu: f32, lambda: f32) -> f64 {
    if lambda <= 0.0 {
        return 0.0;
    }
    -((-(lambda as f64) * (score - mu) as f64).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survivor_at_tau_is_pvalue_one() {
        assert_eq!(forward_survivor_ln(5.0, 5.0, 0.7), 0.0);
    }

    #[test]
    fn survivor_decreases_with_score() {
        let low = forward_survivor_ln(5.0, 0.0, 0.7);
        let high = forward_survivor_ln(20.0, 0.0, 0.7);
        assert!(high < low);
    }
}
