use clap::ValueEnum;

/// Which counter set drives a sampling pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SamplingMode {
    /// Per-core counters, host figure aggregated from them
    #[default]
    MultiCore,
    /// Host-wide counters only, no per-core readings
    Global,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}
