use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::MonitorError;
use crate::metrics::{DisplaySignal, MultiCoreSnapshot};
use crate::monitor::SUBSCRIBER_QUEUE;

#[derive(Clone, Copy, Debug)]
pub struct SmoothingConfig {
    /// Smallest change, in percentage points, worth republishing.
    pub threshold: f64,
    /// Quiet period that must pass after the latest accepted change. Zero republishes at once.
    pub window: Duration,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            window: Duration::from_millis(100),
        }
    }
}

/// Change threshold followed by a trailing debounce, driven by caller-supplied instants.
pub struct SignalSmoother {
    config: SmoothingConfig,
    last_accepted: Option<DisplaySignal>,
    pending: Option<(DisplaySignal, Instant)>,
}

impl SignalSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            config,
            last_accepted: None,
            pending: None,
        }
    }

    /// Returns whether the value passed the change threshold. Accepted values
    /// replace any pending one and restart the debounce window.
    pub fn offer(&mut self, signal: DisplaySignal, now: Instant) -> bool {
        if let Some(last) = &self.last_accepted {
            if !is_significant(self.config.threshold, last, &signal) {
                return false;
            }
        }
        self.last_accepted = Some(signal.clone());
        self.pending = Some((signal, now + self.config.window));
        true
    }

    /// The pending value, once its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<DisplaySignal> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(signal, _)| signal),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    pub fn flush(&mut self) -> Option<DisplaySignal> {
        self.pending.take().map(|(signal, _)| signal)
    }
}

fn is_significant(threshold: f64, old: &DisplaySignal, new: &DisplaySignal) -> bool {
    if (new.total_usage - old.total_usage).abs() >= threshold {
        return true;
    }
    if old.core_usages.len() != new.core_usages.len() {
        return true;
    }
    old.core_usages
        .iter()
        .zip(&new.core_usages)
        .any(|(a, b)| (a - b).abs() >= threshold)
}

/// Runs a smoother over a snapshot stream on its own thread. The returned stream ends
/// when the input disconnects, after any pending value has been delivered.
pub fn spawn_smoother(
    input: Receiver<MultiCoreSnapshot>,
    config: SmoothingConfig,
) -> Result<Receiver<DisplaySignal>, MonitorError> {
    let (tx, rx) = bounded(SUBSCRIBER_QUEUE);
    let mut smoother = SignalSmoother::new(config);

    thread::Builder::new()
        .name("coremeter-smoother".to_string())
        .spawn(move || {
            loop {
                let received = match smoother.deadline() {
                    Some(deadline) => input.recv_deadline(deadline),
                    None => input.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };
                match received {
                    Ok(snapshot) => {
                        smoother.offer(DisplaySignal::from_snapshot(&snapshot), Instant::now());
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        if let Some(signal) = smoother.flush() {
                            let _ = tx.send(signal);
                        }
                        break;
                    }
                }
                if let Some(signal) = smoother.poll(Instant::now()) {
                    if tx.send(signal).is_err() {
                        break;
                    }
                }
            }
            log::debug!("smoother thread exiting");
        })
        .map_err(MonitorError::Spawn)?;

    Ok(rx)
}
