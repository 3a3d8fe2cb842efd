use serde::Serialize;
use std::fmt::Write as _;
use sysinfo::System;

use crate::metrics::{CoreExtreme, CoreKind, DisplaySignal, MultiCoreSnapshot};
use crate::mode::OutputFormat;

#[derive(Serialize)]
pub struct Report<'a, T: Serialize> {
    pub timestamp: i64,
    pub hostname: &'a str,
    #[serde(flatten)]
    pub body: T,
}

/// Raw pass with its derived per-core statistics.
#[derive(Serialize)]
pub struct SnapshotBody<'a> {
    #[serde(flatten)]
    pub snapshot: &'a MultiCoreSnapshot,
    pub total_usage: f64,
    pub average_core_usage: f64,
    pub max_core: Option<CoreExtreme>,
    pub min_core: Option<CoreExtreme>,
}

impl<'a> SnapshotBody<'a> {
    pub fn new(snapshot: &'a MultiCoreSnapshot) -> Self {
        Self {
            snapshot,
            total_usage: snapshot.global.total_usage(),
            average_core_usage: snapshot.average_core_usage(),
            max_core: snapshot.max_core_usage(),
            min_core: snapshot.min_core_usage(),
        }
    }
}

pub fn hostname() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}

pub fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn render_snapshot(
    snapshot: &MultiCoreSnapshot,
    hostname: &str,
    timestamp: i64,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(&Report {
            timestamp,
            hostname,
            body: SnapshotBody::new(snapshot),
        }),
        OutputFormat::Text => Ok(snapshot_text(snapshot)),
    }
}

pub fn render_signal(
    signal: &DisplaySignal,
    hostname: &str,
    timestamp: i64,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(&Report {
            timestamp,
            hostname,
            body: signal,
        }),
        OutputFormat::Text => {
            let mut line = format!("CPU {:.1}%", signal.total_usage);
            for (index, usage) in signal.core_usages.iter().enumerate() {
                let _ = write!(line, " | {}:{:.0}%", index, usage);
            }
            Ok(line)
        }
    }
}

fn kind_tag(kind: CoreKind) -> &'static str {
    match kind {
        CoreKind::Performance => "P",
        CoreKind::Efficiency => "E",
        CoreKind::Unknown => "-",
    }
}

fn snapshot_text(snapshot: &MultiCoreSnapshot) -> String {
    let global = &snapshot.global;
    let mut text = format!(
        "CPU {} (User: {:.1}%, System: {:.1}%, Idle: {:.1}%)",
        global, global.user_usage, global.system_usage, global.idle_usage
    );
    for core in &snapshot.cores {
        let _ = write!(
            text,
            "\n  core {:>3} [{}] {:>6}",
            core.index,
            kind_tag(core.kind),
            core.usage.to_string()
        );
    }
    if let (Some(max), Some(min)) = (snapshot.max_core_usage(), snapshot.min_core_usage()) {
        let _ = write!(
            text,
            "\n  avg {:.1}%, max core {} ({:.1}%), min core {} ({:.1}%)",
            snapshot.average_core_usage(),
            max.index,
            max.usage,
            min.index,
            min.usage
        );
    }
    text
}
