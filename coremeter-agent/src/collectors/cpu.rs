use crate::collectors::ticks::TickSampler;
use crate::collectors::topology::TopologyInfo;
use crate::metrics::{CoreKind, CoreReading, MultiCoreSnapshot, TickSnapshot, UsagePercentages};
use crate::usage::{self, TickDelta};
use std::sync::Arc;

/// One sampling pass producing a snapshot. Implementors own their previous-tick history.
pub trait Sampler: Send {
    fn sample(&mut self) -> MultiCoreSnapshot;
}

/// Per-core usage plus a tick-weighted host figure, computed from a single per-core read.
pub struct MultiCoreSampler {
    ticks: Arc<dyn TickSampler>,
    topology: TopologyInfo,
    // Keyed by kernel cpu id; `None` for ids without a previous read.
    previous: Vec<Option<TickSnapshot>>,
}

impl MultiCoreSampler {
    pub fn new(ticks: Arc<dyn TickSampler>, topology: TopologyInfo) -> Self {
        Self {
            ticks,
            topology,
            previous: Vec::new(),
        }
    }

    fn core_kind(&self, index: usize) -> CoreKind {
        if self.topology.is_detected() {
            self.topology.classify(index)
        } else {
            CoreKind::Unknown
        }
    }
}

impl Sampler for MultiCoreSampler {
    fn sample(&mut self) -> MultiCoreSnapshot {
        let current = match self.ticks.sample_per_core() {
            Ok(current) => current,
            Err(e) => {
                log::warn!("per-core tick read failed: {}", e);
                return MultiCoreSnapshot::unavailable();
            }
        };

        // History is rebuilt from the ids present in this read: an id that went offline
        // loses its baseline, one that appeared starts without one.
        let slots = current.iter().map(|(id, _)| *id as usize + 1).max().unwrap_or(0);
        let mut next: Vec<Option<TickSnapshot>> = vec![None; slots];

        let mut deltas = Vec::with_capacity(current.len());
        let mut cores = Vec::with_capacity(current.len());
        let mut appeared = 0usize;
        let mut elapsed = None;

        for (id, now) in &current {
            let slot = *id as usize;
            next[slot] = Some(*now);
            let usage = match self.previous.get(slot).copied().flatten() {
                Some(before) => {
                    elapsed = Some(now.taken_at.duration_since(before.taken_at));
                    let delta = TickDelta::between(&before, now);
                    deltas.push(delta);
                    delta.percentages()
                }
                None => {
                    appeared += 1;
                    UsagePercentages::DEGENERATE
                }
            };
            cores.push(CoreReading {
                index: *id,
                kind: self.core_kind(slot),
                usage,
            });
        }

        let known = self.previous.iter().filter(|p| p.is_some()).count();
        if appeared > 0 || known != current.len() - appeared {
            log::info!(
                "online core set changed: {} known, {} now online, {} new",
                known,
                current.len(),
                appeared
            );
        }
        self.previous = next;

        let global = usage::tick_weighted(&deltas);
        log::debug!(
            "sampled {} cores over {:?}, global usage {}",
            cores.len(),
            elapsed.unwrap_or_default(),
            global
        );

        MultiCoreSnapshot { global, cores }
    }
}

/// Host-wide usage from the aggregate counters only. Reports no cores.
pub struct GlobalSampler {
    ticks: Arc<dyn TickSampler>,
    previous: Option<TickSnapshot>,
}

impl GlobalSampler {
    pub fn new(ticks: Arc<dyn TickSampler>) -> Self {
        Self { ticks, previous: None }
    }
}

impl Sampler for GlobalSampler {
    fn sample(&mut self) -> MultiCoreSnapshot {
        let current = match self.ticks.sample_global() {
            Ok(current) => current,
            Err(e) => {
                log::warn!("global tick read failed: {}", e);
                return MultiCoreSnapshot::unavailable();
            }
        };

        let global = match self.previous.replace(current) {
            Some(before) => usage::compute_delta(&before, &current),
            None => UsagePercentages::DEGENERATE,
        };
        log::debug!("sampled global usage {}", global);

        MultiCoreSnapshot {
            global,
            cores: Vec::new(),
        }
    }
}
