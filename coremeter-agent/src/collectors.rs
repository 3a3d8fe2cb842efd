pub mod cpu;
pub mod ticks;
pub mod topology;

use std::sync::Arc;

use crate::collectors::cpu::{GlobalSampler, MultiCoreSampler, Sampler};
use crate::collectors::ticks::TickSampler;
use crate::collectors::topology::{CoreTopology, TopologyInfo};
use crate::mode::SamplingMode;

#[cfg(target_os = "linux")]
pub fn platform_tick_sampler() -> Arc<dyn TickSampler> {
    // Aggregate and per-core counters both come from /proc/stat
    Arc::new(ticks::ProcStatSampler::new())
}

#[cfg(not(target_os = "linux"))]
pub fn platform_tick_sampler() -> Arc<dyn TickSampler> {
    log::warn!("tick counters are not supported on {}", std::env::consts::OS);
    Arc::new(ticks::UnsupportedSampler)
}

#[cfg(target_os = "linux")]
pub fn platform_topology() -> Box<dyn CoreTopology> {
    // Hybrid PMU nodes exist only on P/E parts
    Box::new(topology::SysfsTopology::new())
}

#[cfg(not(target_os = "linux"))]
pub fn platform_topology() -> Box<dyn CoreTopology> {
    // Every core reports as unknown
    Box::new(topology::UndetectableTopology)
}

/// Builds a sampler with an empty history.
pub fn new_sampler(
    mode: SamplingMode,
    ticks: Arc<dyn TickSampler>,
    topology: TopologyInfo,
) -> Box<dyn Sampler> {
    match mode {
        SamplingMode::MultiCore => Box::new(MultiCoreSampler::new(ticks, topology)),
        // Aggregate line only, no per-core rows
        SamplingMode::Global => Box::new(GlobalSampler::new(ticks)),
    }
}
