pub mod collectors;
pub mod error;
pub mod metrics;
pub mod mode;
pub mod monitor;
pub mod output;
pub mod smoother;
pub mod usage;

pub use collectors::cpu::{GlobalSampler, MultiCoreSampler, Sampler};
pub use collectors::ticks::TickSampler;
pub use collectors::topology::{CoreTopology, TopologyInfo};
pub use error::{MonitorError, SampleError};
pub use metrics::{CoreKind, CoreReading, DisplaySignal, MultiCoreSnapshot, TickSnapshot, UsagePercentages};
pub use monitor::MonitorLoop;
pub use smoother::{SignalSmoother, SmoothingConfig};
