//! Baseband collaborators for the synchronization core: QPSK mapping,
//! root-raised-cosine pulse shaping, channel impairment simulators, and
//! preamble/frame assembly.
//!
//! These are the transmit-side and channel-side counterparts the receive
//! chain in `rx_sync` is exercised against.

use thiserror::Error;

pub mod channel;
pub mod filters;
pub mod framing;
pub mod modulation;

#[derive(Debug, Error)]
pub enum BasebandError {
    /// A parameter violates a structural requirement, e.g. an even
    /// Zadoff-Chu length or a payload that does not divide into frames.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, BasebandError>;
