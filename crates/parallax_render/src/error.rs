use thiserror::Error;

/// Rejected controller or gate configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{controller} sample window must hold at least one frame")]
    EmptyWindow { controller: &'static str },

    #[error("low mode exit threshold ({exit} fps) must be above the enter threshold ({enter} fps)")]
    InvertedThresholds { enter: f64, exit: f64 },

    #[error("intersection threshold must be within 0..=1, got {0}")]
    ThresholdOutOfRange(f64),
}
