use std::path::PathBuf;

/// Rejected simulation parameters.
///
/// Every invalid value is reported at construction time; nothing is clamped
/// into range silently.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("data rate must be a positive finite number, got {0}")]
    InvalidDataRate(f64),
    #[error("max window size must be at least 1")]
    ZeroMaxWindow,
    #[error("initial slow start threshold must be at least 1")]
    ZeroThreshold,
    #[error("initial bandwidth estimate must be a non-negative finite number, got {0}")]
    InvalidBandwidthEstimate(f64),
    #[error("loss frequency must be a positive finite number, got {0}")]
    InvalidLossFrequency(f64),
    #[error("loss modulus must be at least 1")]
    ZeroLossModulus,
    #[error("loss probability must be within [0, 1], got {0}")]
    InvalidLossProbability(f64),
    #[error("horizon must be a positive finite number, got {0}")]
    InvalidHorizon(f64),
    #[error("horizon times data rate must be at most 1e8 ticks, got {0}")]
    TooManyTicks(f64),
    #[error("loss bound must be at least 1")]
    ZeroLossBound,
    #[error("sweep step must be a positive finite number, got {0}")]
    InvalidSweepStep(f64),
    #[error("at least one worker is required")]
    ZeroWorkers,
    #[error("at least one congestion control algorithm is required")]
    NoAlgorithms,
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}
