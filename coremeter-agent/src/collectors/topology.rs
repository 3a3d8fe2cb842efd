use crate::metrics::CoreKind;
use std::fs;
use std::path::{Path, PathBuf};

/// Performance and efficiency core counts of a heterogeneous CPU. Both zero when undetectable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopologyInfo {
    pub performance_cores: usize,
    pub efficiency_cores: usize,
}

impl TopologyInfo {
    pub fn new(performance_cores: usize, efficiency_cores: usize) -> Self {
        Self {
            performance_cores,
            efficiency_cores,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.performance_cores > 0 || self.efficiency_cores > 0
    }

    /// Positional mapping. Assumes the OS enumerates every performance core before any
    /// efficiency core; nothing here can verify that, it is a platform contract.
    pub fn classify(&self, index: usize) -> CoreKind {
        if index < self.performance_cores {
            CoreKind::Performance
        } else if index < self.performance_cores + self.efficiency_cores {
            CoreKind::Efficiency
        } else {
            CoreKind::Unknown
        }
    }
}

/// Detects the core layout once at startup.
pub trait CoreTopology: Send + Sync {
    fn detect(&self) -> TopologyInfo;
}

/// Hybrid Intel parts expose one PMU node per core type under sysfs.
pub struct SysfsTopology {
    performance_list: PathBuf,
    efficiency_list: PathBuf,
}

impl SysfsTopology {
    pub fn new() -> Self {
        Self::with_paths("/sys/devices/cpu_core/cpus", "/sys/devices/cpu_atom/cpus")
    }

    pub fn with_paths(performance_list: impl Into<PathBuf>, efficiency_list: impl Into<PathBuf>) -> Self {
        Self {
            performance_list: performance_list.into(),
            efficiency_list: efficiency_list.into(),
        }
    }
}

impl Default for SysfsTopology {
    fn default() -> Self {
        Self::new()
    }
}

fn count_listed_cpus(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|s| parse_cpu_list(s.trim()).len())
        .unwrap_or(0)
}

impl CoreTopology for SysfsTopology {
    fn detect(&self) -> TopologyInfo {
        let info = TopologyInfo::new(
            count_listed_cpus(&self.performance_list),
            count_listed_cpus(&self.efficiency_list),
        );
        if info.is_detected() {
            log::info!(
                "hybrid CPU detected: {} performance cores, {} efficiency cores",
                info.performance_cores,
                info.efficiency_cores
            );
        } else {
            log::info!("no performance/efficiency split detected, cores are unclassified");
        }
        info
    }
}

pub struct UndetectableTopology;

impl CoreTopology for UndetectableTopology {
    fn detect(&self) -> TopologyInfo {
        TopologyInfo::default()
    }
}

/// Parses kernel cpu lists such as `0-3,8,10-11`.
pub fn parse_cpu_list(list_str: &str) -> Vec<usize> {
    let mut cpus = Vec::new();
    for part in list_str.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            if let (Ok(s), Ok(e)) = (start.parse::<usize>(), end.parse::<usize>()) {
                cpus.extend(s..=e);
            }
        } else if let Ok(i) = part.parse::<usize>() {
            cpus.push(i);
        }
    }
    cpus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_plus_four_layout() {
        let topology = TopologyInfo::new(4, 4);
        for i in 0..4 {
            assert_eq!(topology.classify(i), CoreKind::Performance);
        }
        for i in 4..8 {
            assert_eq!(topology.classify(i), CoreKind::Efficiency);
        }
        assert_eq!(topology.classify(8), CoreKind::Unknown);
    }

    #[test]
    fn undetected_topology_is_all_unknown() {
        let topology = UndetectableTopology.detect();
        assert!(!topology.is_detected());
        assert_eq!(topology.classify(0), CoreKind::Unknown);
    }

    #[test]
    fn cpu_list_ranges_and_singles() {
        assert_eq!(parse_cpu_list("0-3,8,10-11"), vec![0, 1, 2, 3, 8, 10, 11]);
        assert_eq!(parse_cpu_list(""), Vec::<usize>::new());
        assert_eq!(parse_cpu_list("16-23"), (16..=23).collect::<Vec<_>>());
    }

    #[test]
    fn missing_sysfs_nodes_yield_zero_topology() {
        let topology =
            SysfsTopology::with_paths("/nonexistent/cpu_core/cpus", "/nonexistent/cpu_atom/cpus").detect();
        assert_eq!(topology, TopologyInfo::default());
    }
}
