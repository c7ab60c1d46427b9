//! Stable addition in log space, and the probability <-> log-probability
//! helpers used at profile load time and at final score reporting.
//!
//! See spec.md §4.1. The lookup table is the only process-wide state
//! the core requires (spec.md §5, §9 "Globals"); it is built once,
//! lazily, behind a `OnceLock` and is read-only thereafter.

use std::sync::OnceLock;

/// `d` ranges over `[0, TABLE_SIZE)` at scale `SCALE`, i.e. the table
/// covers `|x - y|` up to `TABLE_SIZE / SCALE` nats.
const TABLE_SIZE: usize = 16_000;
const SCALE: f32 = 1000.0;

/// Beyond this difference, `logsum` just returns the larger operand:
/// the smaller one is below single-precision resolution once added.
const MAX_DIFF: f32 = 15.7;

static LOGSUM_TABLE: OnceLock<Vec<f32>> = OnceLock::new();

fn table() -> &'static [f32] {
    LOGSUM_TABLE
        .get_or_init(|| {
            (0..TABLE_SIZE)
                .map(|d| (1.0 + (-(d as f32) / SCALE).exp()).ln())
                .collect()
        })
        .as_slice()
}

/// `log(e^x + e^y)`, computed via a precomputed `log(1 + e^(-d/S))`
/// table so the hot loops in the cloud search and bounded recurrences
/// never call `exp`/`ln` directly.
///
/// Contract: `logsum(-inf, y) == y`; if the two operands differ by at
/// least [`MAX_DIFF`] nats the result is simply `max(x, y)`.
pub fn logsum(x: f32, y: f32) -> f32 {
    if x.is_infinite() && x < 0.0 {
        return y;
    }
    if y.is_infinite() && y < 0.0 {
        return x;
    }

    let (hi, lo) = if x > y { (x, y) } else { (y, x) };
    let diff = hi - lo;
    if diff >= MAX_DIFF {
        return hi;
    }

    let idx = (diff * SCALE) as usize;
    let idx = idx.min(TABLE_SIZE - 1);
    hi + table()[idx]
}

/// Fold a small, fixed set of log-space terms with [`logsum`]. Used
/// wherever a recurrence sums more than two paths (e.g. the M-state
/// recurrence's three incoming states).
pub fn logsum_all(values: &[f32]) -> f32 {
    values
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, |acc, v| logsum(acc, v))
}

/// `exp(-x)`: converts a profile's on-disk negated-log-probability
/// fields into a real-space probability.
pub fn negln_to_real(x: f64) -> f64 {
    (-x).exp()
}

/// `-log(x)`: the inverse of [`negln_to_real`], used when a final
/// score needs to be reported back in the profile's own units.
pub fn real_to_negln(x: f64) -> f64 {
    -x.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logsum_neg_inf_identity() {
        assert_eq!(logsum(f32::NEG_INFINITY, 3.0), 3.0);
        assert_eq!(logsum(3.0, f32::NEG_INFINITY), 3.0);
    }

    #[test]
    fn logsum_matches_naive_for_close_values() {
        let x = 1.0f32;
        let y = 1.5f32;
        let naive = (x.exp() + y.exp()).ln();
        assert!((logsum(x, y) - naive).abs() < 1e-3);
    }

    #[test]
    fn logsum_drops_below_resolution() {
        let x = 0.0f32;
        let y = 20.0f32;
        assert_eq!(logsum(x, y), y);
    }

    #[test]
    fn logsum_commutes() {
        assert_eq!(logsum(1.0, 2.0), logsum(2.0, 1.0));
    }

    #[test]
    fn negln_round_trip() {
        let p = 0.125f64;
        let back = negln_to_real(real_to_negln(p));
        assert!((back - p).abs() < 1e-9);
    }

    #[test]
    fn repeat_init_is_stable() {
        let a = logsum(1.0, 2.0);
        let b = logsum(1.0, 2.0);
        assert_eq!(a, b);
    }
}
