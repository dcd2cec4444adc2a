use thiserror::Error;

/// Failure kinds surfaced by the synchronization core.
///
/// Numeric edge cases (zero correlation energy, zero median absolute
/// deviation) are handled by clamping inside the algorithms and never
/// reach this type.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A configuration value violates a structural invariant, e.g. a
    /// detection threshold outside [0, 1] or a Schmidl-Cox preamble with
    /// mismatched halves.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An operation was asked to produce output from fewer samples than it
    /// needs, e.g. emitting a timing-corrected symbol from less than one
    /// sample pair.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The caller invoked operations out of order, e.g. correcting a CFO
    /// before one was estimated.
    #[error("usage error: {0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
