//! Plain quadratic global alignment (SPEC_FULL.md supplemented feature
//! "Needleman-Wunsch profile remapping"). Maps an MMseqs2 consensus
//! sequence's coordinates onto a profile's own consensus coordinates so
//! a seed found against one numbering can be reinterpreted against the
//! other; orthogonal to the cloud-search core, but the exact external
//! glue spec.md §1 calls out as supplying the seed alignment.

use crate::structs::sequence::Sequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleTraceStep {
    /// Consumes one residue from both sequences.
    Diagonal,
    /// Consumes one residue from `a` only (gap in `b`).
    Up,
    /// Consumes one residue from `b` only (gap in `a`).
    Left,
}

const MATCH_SCORE: i32 = 2;
const MISMATCH_SCORE: i32 = -1;
const GAP_SCORE: i32 = -2;

/// Global alignment of `a` against `b`, returning the path from the
/// first residue of each to the last, in forward order.
pub fn needleman_wunsch(a: &Sequence, b: &Sequence) -> Vec<SimpleTraceStep> {
    let n = a.length;
    let m = b.length;

    let mut score = vec![vec![0i32; m + 1]; n + 1];
    for i in 1..=n {
        score[i][0] = score[i - 1][0] + GAP_SCORE;
    }
    for j in 1..=m {
        score[0][j] = score[0][j - 1] + GAP_SCORE;
    }

    for i in 1..=n {
        for j in 1..=m {
            let sub = if a.residue(i) == b.residue(j) {
                MATCH_SCORE
            } else {
                MISMATCH_SCORE
            };
            let diag = score[i - 1][j - 1] + sub;
            let up = score[i - 1][j] + GAP_SCORE;
            let left = score[i][j - 1] + GAP_SCORE;
            score[i][j] = diag.max(up).max(left);
        }
    }

    let mut trace = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0
            && j > 0
            && score[i][j]
                == score[i - 1][j - 1]
                    + if a.residue(i) == b.residue(j) {
                        MATCH_SCORE
                    } else {
                        MISMATCH_SCORE
                    }
        {
            trace.push(SimpleTraceStep::Diagonal);
            i -= 1;
            j -= 1;
        } else if i > 0 && score[i][j] == score[i - 1][j] + GAP_SCORE {
            trace.push(SimpleTraceStep::Up);
            i -= 1;
        } else {
            trace.push(SimpleTraceStep::Left);
            j -= 1;
        }
    }
    trace.reverse();
    trace
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_align_diagonally() {
        let a = Sequence::from_utf8(b"ACDEFG").unwrap();
        let b = Sequence::from_utf8(b"ACDEFG").unwrap();
        let trace = needleman_wunsch(&a, &b);
        assert!(trace.iter().all(|s| *s == SimpleTraceStep::Diagonal));
        assert_eq!(trace.len(), 6);
    }

    #[test]
    fn trace_fully_covers_both_sequences() {
        let a = Sequence::from_utf8(b"ACDEFGHI").unwrap();
        let b = Sequence::from_utf8(b"ACDFGHI").unwrap();
        let trace = needleman_wunsch(&a, &b);
        let a_consumed = trace
            .iter()
            .filter(|s| matches!(s, SimpleTraceStep::Diagonal | SimpleTraceStep::Up))
            .count();
        let b_consumed = trace
            .iter()
            .filter(|s| matches!(s, SimpleTraceStep::Diagonal | SimpleTraceStep::Left))
            .count();
        assert_eq!(a_consumed, a.length);
        assert_eq!(b_consumed, b.length);
    }
}
