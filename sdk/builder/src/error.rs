//! Error Types
//!
//! Three tiers with different reporting channels. Programmer misuse
//! (version gating, result accessors) panics. Bad external input is a
//! `false` return at the call that introduced it. Business failures
//! surface only through the final [`crate::BuildResult`].

use thiserror::Error;

/// Failures of a build. These never leave a partial transaction
/// behind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("change cannot be negative")]
    NegativeChange,

    #[error("could not determine change address")]
    NoChangeAddress,

    #[error("spend is invalid")]
    InvalidSpend,

    #[error("raw spends or outputs remain unconverted")]
    UnconvertedIntents,

    #[error("amount out of range")]
    ValueOutOfRange,

    #[error("proving failed: {0}")]
    Prover(#[from] ProverError),

    #[error("failed to sign transparent input {0}")]
    TransparentSignature(usize),
}

/// Failure reported by the proving backend.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ProverError(pub String);

/// Failures of the offline signing protocol codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("offline request has no spends")]
    EmptySpends,

    #[error("unrecognized protocol tag")]
    BadTag,

    #[error("unsupported protocol version {0}")]
    BadVersion(String),

    #[error("expected {expected} fields, found {found}")]
    BadFieldCount { expected: usize, found: usize },

    #[error("checksum mismatch: message says {received}, derived {derived}")]
    BadChecksum { received: u64, derived: u64 },

    #[error("malformed field {0}")]
    BadField(&'static str),

    #[error("value cannot be represented on the wire")]
    ValueOutOfRange,
}
