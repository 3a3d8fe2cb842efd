use crate::metrics::{TickSnapshot, Ticks, UsagePercentages};

/// Ticks accumulated in each category between two snapshots of the same counter set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickDelta {
    pub user: Ticks,
    pub system: Ticks,
    pub idle: Ticks,
    pub nice: Ticks,
}

impl TickDelta {
    /// A counter that went backwards (wrap or reset) contributes zero ticks for this interval,
    /// so that interval under-reports usage instead of producing a negative share.
    pub fn between(previous: &TickSnapshot, current: &TickSnapshot) -> Self {
        let delta = Self {
            user: current.user.saturating_sub(previous.user),
            system: current.system.saturating_sub(previous.system),
            idle: current.idle.saturating_sub(previous.idle),
            nice: current.nice.saturating_sub(previous.nice),
        };
        if current.user < previous.user
            || current.system < previous.system
            || current.idle < previous.idle
            || current.nice < previous.nice
        {
            log::debug!("tick counter went backwards, clamping its delta to zero");
        }
        delta
    }

    pub fn total(&self) -> Ticks {
        self.user
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.nice)
    }

    pub fn accumulate(&mut self, other: &TickDelta) {
        self.user = self.user.saturating_add(other.user);
        self.system = self.system.saturating_add(other.system);
        self.idle = self.idle.saturating_add(other.idle);
        self.nice = self.nice.saturating_add(other.nice);
    }

    /// Normalizes the delta into percentages. Nice ticks only widen the divisor.
    pub fn percentages(&self) -> UsagePercentages {
        let total = self.total();
        if total == 0 {
            return UsagePercentages::DEGENERATE;
        }
        let total = total as f64;
        UsagePercentages {
            user_usage: 100.0 * self.user as f64 / total,
            system_usage: 100.0 * self.system as f64 / total,
            idle_usage: 100.0 * self.idle as f64 / total,
        }
    }
}

pub fn compute_delta(previous: &TickSnapshot, current: &TickSnapshot) -> UsagePercentages {
    TickDelta::between(previous, current).percentages()
}

/// System-wide usage over several cores, weighted by each core's tick count
/// rather than averaging the per-core percentages.
pub fn tick_weighted<'a, I>(deltas: I) -> UsagePercentages
where
    I: IntoIterator<Item = &'a TickDelta>,
{
    let mut sum = TickDelta::default();
    for delta in deltas {
        sum.accumulate(delta);
    }
    sum.percentages()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn ticks(user: Ticks, system: Ticks, idle: Ticks, nice: Ticks) -> TickSnapshot {
        TickSnapshot::new(user, system, idle, nice)
    }

    #[test]
    fn worked_example_from_global_counters() {
        let previous = ticks(1000, 500, 8000, 500);
        let current = ticks(1100, 550, 8300, 500);

        let delta = TickDelta::between(&previous, &current);
        assert_eq!(delta, TickDelta { user: 100, system: 50, idle: 300, nice: 0 });
        assert_eq!(delta.total(), 450);

        let usage = compute_delta(&previous, &current);
        assert!((usage.user_usage - 22.222).abs() < 0.01);
        assert!((usage.system_usage - 11.111).abs() < 0.01);
        assert!((usage.idle_usage - 66.667).abs() < 0.01);
    }

    #[test]
    fn identical_snapshots_yield_degenerate_default() {
        let x = ticks(42, 7, 1000, 3);
        assert_eq!(compute_delta(&x, &x), UsagePercentages::DEGENERATE);
    }

    #[test]
    fn breakdown_sums_to_hundred_without_nice() {
        let cases = [
            (ticks(0, 0, 0, 0), ticks(10, 20, 70, 0)),
            (ticks(5, 5, 5, 5), ticks(6, 5, 5, 5)),
            (ticks(100, 200, 300, 0), ticks(1100, 1200, 1300, 0)),
            (ticks(0, 0, 0, 0), ticks(u32::MAX as u64, 1, 1, 0)),
        ];
        for (previous, current) in cases {
            let usage = compute_delta(&previous, &current);
            let sum = usage.user_usage + usage.system_usage + usage.idle_usage;
            assert!((sum - 100.0).abs() < EPSILON, "sum was {sum}");
        }
    }

    #[test]
    fn nice_widens_divisor_only() {
        let usage = compute_delta(&ticks(0, 0, 0, 0), &ticks(25, 25, 25, 25));
        assert!((usage.user_usage - 25.0).abs() < EPSILON);
        assert!((usage.system_usage - 25.0).abs() < EPSILON);
        assert!((usage.idle_usage - 25.0).abs() < EPSILON);
        assert!((usage.total_usage() - 50.0).abs() < EPSILON);
    }

    #[test]
    fn percentages_stay_in_range() {
        let pairs = [
            (ticks(10, 10, 10, 10), ticks(5, 20, 10, 10)),
            (ticks(0, 0, 0, 0), ticks(1, 0, 0, 0)),
            (ticks(9, 9, 9, 9), ticks(9, 9, 9, 1000)),
            (ticks(u64::MAX, 0, 0, 0), ticks(0, 3, 1, 0)),
        ];
        for (previous, current) in pairs {
            let usage = compute_delta(&previous, &current);
            for value in [usage.user_usage, usage.system_usage, usage.idle_usage] {
                assert!((0.0..=100.0).contains(&value), "{value} out of range");
            }
        }
    }

    #[test]
    fn wrapped_counter_is_clamped_to_zero() {
        let previous = ticks(4_000_000_000, 100, 100, 0);
        let current = ticks(50, 150, 250, 0);
        let delta = TickDelta::between(&previous, &current);
        assert_eq!(delta.user, 0);

        let usage = delta.percentages();
        assert_eq!(usage.user_usage, 0.0);
        assert!((usage.system_usage - 25.0).abs() < EPSILON);
        assert!((usage.idle_usage - 75.0).abs() < EPSILON);
    }

    #[test]
    fn weighted_aggregate_matches_mean_for_equal_tick_totals() {
        let busy = TickDelta { user: 100, ..Default::default() };
        let idle = TickDelta { idle: 100, ..Default::default() };

        let usage = tick_weighted([&busy, &idle]);
        assert!((usage.user_usage - 50.0).abs() < EPSILON);

        let mean = (busy.percentages().total_usage() + idle.percentages().total_usage()) / 2.0;
        assert!((usage.total_usage() - mean).abs() < EPSILON);
    }

    #[test]
    fn weighted_aggregate_diverges_from_mean_for_unequal_tick_totals() {
        let deltas = [
            TickDelta { user: 300, idle: 100, ..Default::default() },
            TickDelta { idle: 50, ..Default::default() },
            TickDelta { user: 10, idle: 40, ..Default::default() },
        ];

        let weighted = tick_weighted(&deltas);
        let mean: f64 =
            deltas.iter().map(|d| d.percentages().total_usage()).sum::<f64>() / deltas.len() as f64;

        // 310 busy ticks out of 500 against (75 + 0 + 20) / 3.
        assert!((weighted.total_usage() - 62.0).abs() < EPSILON);
        assert!((mean - 31.666_666_666).abs() < 1e-6);
        assert!((weighted.total_usage() - mean).abs() > 1.0);
    }

    #[test]
    fn weighted_aggregate_of_nothing_is_degenerate() {
        assert!(tick_weighted(&[] as &[TickDelta]).is_degenerate());
    }
}
