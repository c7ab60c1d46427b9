//! The traceback path recovered from the optimal-accuracy matrix
//! (SPEC_FULL.md "MEA traceback"), and the seed alignment spec.md §3
//! describes at the interface level.

use serde::{Deserialize, Serialize};

/// States a [`Trace`] step can sit in. `Begin`/`End` bracket the path
/// as `B`/`E` passage markers; the flanking `N`/`C`/`J` states are
/// folded into the path the same way the teacher's `TRACE.st` field
/// does for HMMER-style tracebacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceStep {
    Begin,
    Match,
    Insert,
    Delete,
    End,
    N,
    C,
    J,
}

/// One `(state, q, t)` point on a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePoint {
    pub state: TraceStep,
    pub q: usize,
    pub t: usize,
}

/// An ordered sequence of trace points with a designated begin index
/// (first `B->M`) and end index (last `M->E`). Produced by
/// [`crate::align::bounded::traceback_bounded`]; consumed by
/// [`crate::structs::Alignment`].
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub points: Vec<TracePoint>,
    pub begin: usize,
    pub end: usize,
    pub target_length: usize,
    pub profile_length: usize,
}

impl Trace {
    pub fn new(target_length: usize, profile_length: usize) -> Self {
        Self {
            points: Vec::new(),
            begin: 0,
            end: 0,
            target_length,
            profile_length,
        }
    }

    pub fn push(&mut self, state: TraceStep, q: usize, t: usize) {
        self.points.push(TracePoint { state, q, t });
    }

    /// Query range `[q_beg, q_end]` spanned by `Match`/`Insert` steps,
    /// or `None` if the trace is empty of core-model steps.
    pub fn query_range(&self) -> Option<(usize, usize)> {
        let mut lo = None;
        let mut hi = None;
        for p in &self.points {
            if matches!(p.state, TraceStep::Match | TraceStep::Insert) {
                lo = Some(lo.map_or(p.q, |l: usize| l.min(p.q)));
                hi = Some(hi.map_or(p.q, |h: usize| h.max(p.q)));
            }
        }
        lo.zip(hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_range_spans_match_and_insert_steps() {
        let mut trace = Trace::new(10, 10);
        trace.push(TraceStep::Begin, 2, 2);
        trace.push(TraceStep::Match, 3, 3);
        trace.push(TraceStep::Insert, 4, 3);
        trace.push(TraceStep::Match, 5, 4);
        trace.push(TraceStep::End, 5, 4);
        assert_eq!(trace.query_range(), Some((3, 5)));
    }
}
