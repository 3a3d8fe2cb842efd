use serde::Serialize;
use std::fmt;
use std::time::Instant;

pub type CPUIndex = u32;
pub type Ticks = u64;

/// Cumulative kernel tick counters for one counter set (a core, or the whole host).
#[derive(Clone, Copy, Debug)]
pub struct TickSnapshot {
    pub user: Ticks,
    pub system: Ticks,
    pub idle: Ticks,
    pub nice: Ticks,
    pub taken_at: Instant,
}

impl TickSnapshot {
    pub fn new(user: Ticks, system: Ticks, idle: Ticks, nice: Ticks) -> Self {
        Self {
            user,
            system,
            idle,
            nice,
            taken_at: Instant::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct UsagePercentages {
    pub user_usage: f64,
    pub system_usage: f64,
    pub idle_usage: f64,
}

impl UsagePercentages {
    /// Fallback reading used whenever no real measurement can be computed.
    pub const DEGENERATE: Self = Self {
        user_usage: 0.0,
        system_usage: 0.0,
        idle_usage: 100.0,
    };

    /// Busy share of the interval. Nice time is part of the divisor but not reported.
    pub fn total_usage(&self) -> f64 {
        self.user_usage + self.system_usage
    }

    pub fn is_degenerate(&self) -> bool {
        *self == Self::DEGENERATE
    }
}

impl Default for UsagePercentages {
    fn default() -> Self {
        Self::DEGENERATE
    }
}

impl fmt::Display for UsagePercentages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.total_usage())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreKind {
    Performance,
    Efficiency,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CoreReading {
    pub index: CPUIndex,
    pub kind: CoreKind,
    pub usage: UsagePercentages,
}

/// Busiest or idlest core of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CoreExtreme {
    pub index: CPUIndex,
    pub usage: f64,
}

/// One sampling pass: the tick-weighted host figure and every core, taken from the same read.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MultiCoreSnapshot {
    pub global: UsagePercentages,
    pub cores: Vec<CoreReading>,
}

impl MultiCoreSnapshot {
    /// Zero cores, degenerate global usage. Published when the counters could not be read.
    pub fn unavailable() -> Self {
        Self {
            global: UsagePercentages::DEGENERATE,
            cores: Vec::new(),
        }
    }

    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    /// Arithmetic mean of per-core total usage. Zero when there are no cores.
    pub fn average_core_usage(&self) -> f64 {
        if self.cores.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.cores.iter().map(|c| c.usage.total_usage()).sum();
        sum / self.cores.len() as f64
    }

    /// First core with the highest total usage.
    pub fn max_core_usage(&self) -> Option<CoreExtreme> {
        self.cores
            .iter()
            .map(|c| CoreExtreme {
                index: c.index,
                usage: c.usage.total_usage(),
            })
            .reduce(|best, c| if c.usage > best.usage { c } else { best })
    }

    /// First core with the lowest total usage.
    pub fn min_core_usage(&self) -> Option<CoreExtreme> {
        self.cores
            .iter()
            .map(|c| CoreExtreme {
                index: c.index,
                usage: c.usage.total_usage(),
            })
            .reduce(|best, c| if c.usage < best.usage { c } else { best })
    }

    pub fn core_totals(&self) -> Vec<f64> {
        self.cores.iter().map(|c| c.usage.total_usage()).collect()
    }
}

/// Display-oriented value republished by the smoother.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplaySignal {
    pub total_usage: f64,
    pub core_usages: Vec<f64>,
}

impl DisplaySignal {
    pub fn from_snapshot(snapshot: &MultiCoreSnapshot) -> Self {
        Self {
            total_usage: snapshot.global.total_usage(),
            core_usages: snapshot.core_totals(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(index: CPUIndex, user: f64) -> CoreReading {
        CoreReading {
            index,
            kind: CoreKind::Unknown,
            usage: UsagePercentages {
                user_usage: user,
                system_usage: 0.0,
                idle_usage: 100.0 - user,
            },
        }
    }

    #[test]
    fn derived_statistics_over_cores() {
        let snapshot = MultiCoreSnapshot {
            global: UsagePercentages::DEGENERATE,
            cores: vec![reading(0, 20.0), reading(1, 80.0), reading(2, 5.0), reading(3, 80.0)],
        };

        assert!((snapshot.average_core_usage() - 46.25).abs() < 1e-9);
        assert_eq!(snapshot.max_core_usage(), Some(CoreExtreme { index: 1, usage: 80.0 }));
        assert_eq!(snapshot.min_core_usage(), Some(CoreExtreme { index: 2, usage: 5.0 }));
    }

    #[test]
    fn unavailable_snapshot_has_no_statistics() {
        let snapshot = MultiCoreSnapshot::unavailable();
        assert_eq!(snapshot.core_count(), 0);
        assert_eq!(snapshot.average_core_usage(), 0.0);
        assert!(snapshot.max_core_usage().is_none());
        assert!(snapshot.min_core_usage().is_none());
        assert!(snapshot.global.is_degenerate());
    }

    #[test]
    fn total_usage_display() {
        let usage = UsagePercentages {
            user_usage: 22.22,
            system_usage: 11.11,
            idle_usage: 66.67,
        };
        assert_eq!(usage.to_string(), "33.3%");
    }
}
