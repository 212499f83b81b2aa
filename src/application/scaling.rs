//! Load-based scaling policy.
//!
//! Turns a watcher [`Report`] into a single scaling decision. At most one
//! instance is added or removed per function per tick.

use crate::domain::Report;

/// Upper bound on the per-instance load threshold.
pub const MAX_THRESHOLD: u64 = 8;

/// What the reconciliation loop should do for one function this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Nothing is running yet; launch the first instance.
    ColdStart,
    /// Instances are saturated; launch one more.
    ScaleUp,
    /// Instances are saturated but the instance ceiling is reached.
    AtCeiling,
    /// Load is acceptable, or only the last instance is left.
    Hold,
    /// Instances are under-utilized; stop one.
    ScaleDown,
}

impl ScaleDecision {
    #[must_use]
    pub const fn launches(self) -> bool {
        matches!(self, Self::ColdStart | Self::ScaleUp)
    }
}

/// Thresholds derived from the machine's logical core count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingPolicy {
    threshold: u64,
    max_instances: usize,
}

impl ScalingPolicy {
    /// Derive the policy for a machine with `cores` logical cores.
    ///
    /// The threshold is half the cores, lowered to `ceiling` when one is
    /// configured, and never above [`MAX_THRESHOLD`]. A function never runs
    /// more instances than there are cores.
    #[must_use]
    pub fn new(cores: usize, ceiling: Option<usize>) -> Self {
        let mut threshold = (cores / 2) as u64;
        if let Some(ceiling) = ceiling {
            threshold = threshold.min(ceiling as u64);
        }
        Self {
            threshold: threshold.min(MAX_THRESHOLD),
            max_instances: cores,
        }
    }

    /// Policy for the current machine.
    #[must_use]
    pub fn detect(ceiling: Option<usize>) -> Self {
        Self::new(num_cpus::get(), ceiling)
    }

    #[must_use]
    pub const fn threshold(&self) -> u64 {
        self.threshold
    }

    #[must_use]
    pub const fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Decide the scaling action for one watcher snapshot.
    #[must_use]
    pub fn decide(&self, report: Option<&Report>) -> ScaleDecision {
        let Some(report) = report else {
            return ScaleDecision::ColdStart;
        };

        if report.average_load() >= self.threshold {
            if report.instance_count >= self.max_instances {
                ScaleDecision::AtCeiling
            } else {
                ScaleDecision::ScaleUp
            }
        } else if report.instance_count <= 1 {
            ScaleDecision::Hold
        } else {
            ScaleDecision::ScaleDown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(instance_count: usize, total_load: u64) -> Report {
        Report {
            instance_count,
            total_load,
            unhealthy_ports: Vec::new(),
        }
    }

    #[test]
    fn threshold_is_half_the_cores() {
        assert_eq!(ScalingPolicy::new(8, None).threshold(), 4);
        assert_eq!(ScalingPolicy::new(7, None).threshold(), 3);
    }

    #[test]
    fn threshold_is_capped_at_eight() {
        assert_eq!(ScalingPolicy::new(64, None).threshold(), MAX_THRESHOLD);
        assert_eq!(ScalingPolicy::new(64, Some(32)).threshold(), MAX_THRESHOLD);
    }

    #[test]
    fn ceiling_lowers_threshold() {
        assert_eq!(ScalingPolicy::new(16, Some(2)).threshold(), 2);
        assert_eq!(ScalingPolicy::new(4, Some(6)).threshold(), 2);
    }

    #[test]
    fn max_instances_matches_cores() {
        assert_eq!(ScalingPolicy::new(12, None).max_instances(), 12);
    }

    #[test]
    fn no_report_is_cold_start() {
        assert_eq!(ScalingPolicy::new(8, None).decide(None), ScaleDecision::ColdStart);
    }

    #[test]
    fn saturated_instances_scale_up() {
        let policy = ScalingPolicy::new(8, None);
        assert_eq!(policy.decide(Some(&report(2, 8))), ScaleDecision::ScaleUp);
        assert_eq!(policy.decide(Some(&report(2, 12))), ScaleDecision::ScaleUp);
    }

    #[test]
    fn saturated_at_core_count_hits_ceiling() {
        let policy = ScalingPolicy::new(4, None);
        assert_eq!(policy.decide(Some(&report(4, 40))), ScaleDecision::AtCeiling);
        assert_eq!(policy.decide(Some(&report(5, 50))), ScaleDecision::AtCeiling);
    }

    #[test]
    fn single_idle_instance_holds() {
        let policy = ScalingPolicy::new(8, None);
        assert_eq!(policy.decide(Some(&report(1, 0))), ScaleDecision::Hold);
        assert_eq!(policy.decide(Some(&report(1, 3))), ScaleDecision::Hold);
    }

    #[test]
    fn idle_instances_scale_down() {
        let policy = ScalingPolicy::new(8, None);
        assert_eq!(policy.decide(Some(&report(3, 6))), ScaleDecision::ScaleDown);
    }

    #[test]
    fn average_uses_integer_division() {
        // 7 / 2 = 3 < 4
        let policy = ScalingPolicy::new(8, None);
        assert_eq!(policy.decide(Some(&report(2, 7))), ScaleDecision::ScaleDown);
    }
}
