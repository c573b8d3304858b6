use thiserror::Error;

/// Configuration-time failures: bad CLI argument, unknown literal suffix,
/// invalid topology. Reported to stderr and cause exit 1 before any
/// simulation work starts (§7 taxonomy, first bullet).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid literal {0:?}")]
    InvalidLiteral(String),

    #[error("unknown time suffix {0:?}")]
    UnknownTimeSuffix(String),

    #[error("unknown bandwidth suffix {0:?}")]
    UnknownBandwidthSuffix(String),

    #[error("unknown node {0:?} referenced in topology")]
    UnknownHost(String),

    #[error("topology does not name a module")]
    MissingModule,
}
