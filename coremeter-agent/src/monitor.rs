use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select, tick};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::collectors::{self, cpu::Sampler, ticks::TickSampler, topology::TopologyInfo};
use crate::error::MonitorError;
use crate::metrics::MultiCoreSnapshot;
use crate::mode::SamplingMode;

/// Shortest accepted sampling period. Shorter positive periods are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Snapshots buffered per subscriber before new ones are dropped for it.
pub const SUBSCRIBER_QUEUE: usize = 16;

/// Converts a period in seconds, rejecting anything that is not strictly positive.
pub fn interval_from_secs(secs: f64) -> Result<Duration, MonitorError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(MonitorError::InvalidInterval(secs));
    }
    let interval = Duration::try_from_secs_f64(secs).map_err(|_| MonitorError::InvalidInterval(secs))?;
    Ok(interval.max(MIN_INTERVAL))
}

struct Publisher {
    // Bumped on every start; a sampling thread may only publish under its own generation.
    generation: u64,
    running: bool,
    subscribers: Vec<Sender<MultiCoreSnapshot>>,
}

impl Publisher {
    fn publish(&mut self, generation: u64, snapshot: MultiCoreSnapshot) {
        if !self.running || self.generation != generation {
            log::trace!("discarding snapshot from a stopped run");
            return;
        }
        self.subscribers.retain(|tx| match tx.try_send(snapshot.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("subscriber queue full, dropping snapshot");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

fn lock(publisher: &Mutex<Publisher>) -> MutexGuard<'_, Publisher> {
    publisher.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Samples on a timer from a background thread and publishes every pass to subscribers.
///
/// The previous-tick history lives inside the sampling thread and is dropped on `stop`,
/// so each `start` measures from a fresh baseline.
pub struct MonitorLoop {
    ticks: Arc<dyn TickSampler>,
    topology: TopologyInfo,
    mode: SamplingMode,
    publisher: Arc<Mutex<Publisher>>,
    worker: Option<Worker>,
}

impl MonitorLoop {
    pub fn new(ticks: Arc<dyn TickSampler>, topology: TopologyInfo, mode: SamplingMode) -> Self {
        Self {
            ticks,
            topology,
            mode,
            publisher: Arc::new(Mutex::new(Publisher {
                generation: 0,
                running: false,
                subscribers: Vec::new(),
            })),
            worker: None,
        }
    }

    /// Uses this host's counters and detects its core topology once.
    pub fn for_platform(mode: SamplingMode) -> Self {
        let topology = collectors::platform_topology().detect();
        Self::new(collectors::platform_tick_sampler(), topology, mode)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Raw snapshots from every pass published after this call.
    pub fn subscribe(&self) -> Receiver<MultiCoreSnapshot> {
        let (tx, rx) = bounded(SUBSCRIBER_QUEUE);
        lock(&self.publisher).subscribers.push(tx);
        rx
    }

    /// Starts sampling every `interval`. Does nothing if already running.
    pub fn start(&mut self, interval: Duration) -> Result<(), MonitorError> {
        if self.worker.is_some() {
            return Ok(());
        }
        if interval.is_zero() {
            return Err(MonitorError::InvalidInterval(0.0));
        }
        let interval = interval.max(MIN_INTERVAL);

        let generation = {
            let mut publisher = lock(&self.publisher);
            publisher.generation += 1;
            publisher.running = true;
            publisher.generation
        };

        let sampler = collectors::new_sampler(self.mode, Arc::clone(&self.ticks), self.topology);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let publisher = Arc::clone(&self.publisher);

        let spawned = thread::Builder::new()
            .name("coremeter-sampler".to_string())
            .spawn(move || run_sampling(sampler, interval, stop_rx, publisher, generation));

        match spawned {
            Ok(handle) => {
                log::info!("monitoring started, interval {:?}, mode {:?}", interval, self.mode);
                self.worker = Some(Worker { stop_tx, handle });
                Ok(())
            }
            Err(e) => {
                lock(&self.publisher).running = false;
                Err(MonitorError::Spawn(e))
            }
        }
    }

    /// Stops sampling. No snapshot is published once this returns.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        lock(&self.publisher).running = false;

        drop(worker.stop_tx);
        if worker.handle.join().is_err() {
            log::warn!("sampling thread panicked");
        }
        log::info!("monitoring stopped");
    }
}

impl Drop for MonitorLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_sampling(
    mut sampler: Box<dyn Sampler>,
    interval: Duration,
    stop_rx: Receiver<()>,
    publisher: Arc<Mutex<Publisher>>,
    generation: u64,
) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                let snapshot = sampler.sample();
                lock(&publisher).publish(generation, snapshot);
            }
        }
    }
    log::debug!("sampling thread for run {} exiting", generation);
}
