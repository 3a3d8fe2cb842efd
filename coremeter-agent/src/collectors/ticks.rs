use crate::error::SampleError;
use crate::metrics::{CPUIndex, TickSnapshot, Ticks};
use std::fs;
use std::path::PathBuf;

/// Point-in-time reads of cumulative tick counters.
pub trait TickSampler: Send + Sync {
    fn sample_global(&self) -> Result<TickSnapshot, SampleError>;

    /// One snapshot per online logical core, keyed by the kernel's cpu id. Ids may have gaps
    /// when cores are offline.
    fn sample_per_core(&self) -> Result<Vec<(CPUIndex, TickSnapshot)>, SampleError>;
}

/// Reads `/proc/stat`.
pub struct ProcStatSampler {
    path: PathBuf,
}

impl ProcStatSampler {
    pub fn new() -> Self {
        Self::with_path("/proc/stat")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<ProcStat, SampleError> {
        let content = fs::read_to_string(&self.path)?;
        parse_proc_stat(&content)
    }
}

impl Default for ProcStatSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSampler for ProcStatSampler {
    fn sample_global(&self) -> Result<TickSnapshot, SampleError> {
        self.read()?
            .global
            .ok_or_else(|| SampleError::Unavailable("no aggregate cpu line".to_string()))
    }

    fn sample_per_core(&self) -> Result<Vec<(CPUIndex, TickSnapshot)>, SampleError> {
        Ok(self.read()?.cores)
    }
}

/// Stand-in for platforms without a tick counter source.
pub struct UnsupportedSampler;

impl TickSampler for UnsupportedSampler {
    fn sample_global(&self) -> Result<TickSnapshot, SampleError> {
        Err(SampleError::Unavailable(format!(
            "no tick counter source on {}",
            std::env::consts::OS
        )))
    }

    fn sample_per_core(&self) -> Result<Vec<(CPUIndex, TickSnapshot)>, SampleError> {
        Err(SampleError::Unavailable(format!(
            "no tick counter source on {}",
            std::env::consts::OS
        )))
    }
}

#[derive(Debug)]
pub struct ProcStat {
    pub global: Option<TickSnapshot>,
    pub cores: Vec<(CPUIndex, TickSnapshot)>,
}

pub fn parse_proc_stat(content: &str) -> Result<ProcStat, SampleError> {
    let mut global = None;
    let mut cores = Vec::new();

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next() else { continue };
        let Some(suffix) = label.strip_prefix("cpu") else { continue };
        // Offline cores are missing from the file, so the id is the only stable key.
        let id = if suffix.is_empty() {
            None
        } else {
            match suffix.parse::<CPUIndex>() {
                Ok(id) => Some(id),
                Err(_) => continue,
            }
        };

        let snapshot = parse_cpu_fields(fields).ok_or_else(|| SampleError::Parse(line.to_string()))?;
        match id {
            Some(id) => cores.push((id, snapshot)),
            None => global = Some(snapshot),
        }
    }

    if global.is_none() && cores.is_empty() {
        return Err(SampleError::Unavailable("no cpu lines in /proc/stat".to_string()));
    }
    Ok(ProcStat { global, cores })
}

// Columns: user nice system idle iowait irq softirq steal guest guest_nice.
// Guest time is already counted in user; iowait is idle time.
fn parse_cpu_fields<'a>(fields: impl Iterator<Item = &'a str>) -> Option<TickSnapshot> {
    let values: Vec<Ticks> = fields
        .map(|f| f.parse::<Ticks>())
        .collect::<Result<_, _>>()
        .ok()?;
    if values.len() < 4 {
        return None;
    }
    let column = |i: usize| values.get(i).copied().unwrap_or(0);

    let user = column(0);
    let nice = column(1);
    let system = column(2)
        .saturating_add(column(5))
        .saturating_add(column(6))
        .saturating_add(column(7));
    let idle = column(3).saturating_add(column(4));

    Some(TickSnapshot::new(user, system, idle, nice))
}
