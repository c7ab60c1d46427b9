use serde::{Deserialize, Serialize};

/// A seed alignment's begin/end trace points, reduced to the four
/// coordinates the cloud search actually consumes (spec.md §3 "Seed
/// alignment"). Round-trips through `seeds.json` between the teacher's
/// `pipeline::seed` and `pipeline::align` steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    pub target_name: String,
    pub target_start: usize,
    pub target_end: usize,
    pub profile_start: usize,
    pub profile_end: usize,
}

impl Seed {
    /// Clamp an on-edge seed inward by one, per spec.md §3/§7: both
    /// endpoints must lie strictly inside `[0, q_max] x [0, t_max]`.
    /// Returns `(q_beg, t_beg, q_end, t_end)`.
    pub fn clamped(&self, q_max: usize, t_max: usize) -> (usize, usize, usize, usize) {
        let q_beg = self.target_start.max(1).min(q_max.saturating_sub(1).max(1));
        let t_beg = self.profile_start.max(1).min(t_max.saturating_sub(1).max(1));
        let q_end = self
            .target_end
            .min(q_max.saturating_sub(1))
            .max(q_beg);
        let t_end = self
            .profile_end
            .min(t_max.saturating_sub(1))
            .max(t_beg);
        (q_beg, t_beg, q_end, t_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pulls_edge_seed_inward_by_one() {
        let seed = Seed {
            target_name: "t".to_string(),
            target_start: 0,
            target_end: 10,
            profile_start: 0,
            profile_end: 10,
        };
        let (q_beg, t_beg, q_end, t_end) = seed.clamped(10, 10);
        assert_eq!((q_beg, t_beg, q_end, t_end), (1, 1, 9, 9));
    }

    #[test]
    fn clamp_is_identity_for_interior_seed() {
        let seed = Seed {
            target_name: "t".to_string(),
            target_start: 3,
            target_end: 7,
            profile_start: 2,
            profile_end: 8,
        };
        let (q_beg, t_beg, q_end, t_end) = seed.clamped(10, 10);
        assert_eq!((q_beg, t_beg, q_end, t_end), (3, 2, 7, 8));
    }
}
