/// Pruning parameters for the antidiagonal cloud search. See spec.md
/// §4.3 and §6 "Cloud parameters".
#[derive(Debug, Clone, Copy)]
pub struct CloudSearchParams {
    /// Per-antidiagonal x-drop, in nats. A cell survives only if its
    /// best state score is within `alpha` of the antidiagonal's max.
    pub alpha: f32,
    /// Global x-drop, in nats, used for early sweep termination.
    pub beta: f32,
    /// Number of antidiagonals at the start of the sweep that are
    /// never pruned.
    pub gamma: usize,
}

impl Default for CloudSearchParams {
    fn default() -> Self {
        Self {
            alpha: 12.0,
            beta: 16.0,
            gamma: 5,
        }
    }
}

/// Domain-detection thresholds. See spec.md §4.8.
#[derive(Debug, Clone, Copy)]
pub struct DomainThresholds {
    pub rt1: f32,
    pub rt2: f32,
}

impl Default for DomainThresholds {
    fn default() -> Self {
        Self {
            rt1: 0.25,
            rt2: 0.1,
        }
    }
}
