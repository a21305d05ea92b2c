//! Typed failures returned by the pot engine.
//!
//! Every transition is all-or-nothing: when one of these is returned the
//! committed pot state is unchanged.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PotError {
    #[error("Amount must be a positive integer in base units")]
    InvalidAmount,

    #[error("Claimed total does not match the sum of deposits")]
    TotalMismatch,

    #[error("Proof public inputs do not match the commitments on record")]
    ProofMismatch,

    #[error("Malformed proof: {0}")]
    MalformedProof(&'static str),

    #[error("Insufficient shares: have {have}, need {need}")]
    InsufficientShares { have: usize, need: usize },

    #[error("Invalid share: {0}")]
    InvalidShare(&'static str),

    #[error("Identity is already a member of this pot")]
    AlreadyMember,

    #[error("Caller is not a member of this pot")]
    NotAMember,

    #[error("Nullifier already seen for this pot")]
    DuplicateNullifier,

    #[error("Pot is closed to this action")]
    PotClosed,

    #[error("Reveal threshold not met: {collected}/{threshold} shares")]
    ThresholdNotMet { collected: usize, threshold: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown pot")]
    UnknownPot,

    #[error("Request signature does not verify for caller")]
    Unauthorized,

    #[error("Only the pot owner may do this")]
    NotOwner,

    #[error("Pot is under contention, transition not applied")]
    Contention,

    #[error("Operation timed out")]
    Timeout,

    #[error("Sealed opening error: {0}")]
    Seal(&'static str),
}

impl PotError {
    /// Stable machine-readable kind, for display collaborators.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "InvalidAmount",
            Self::TotalMismatch => "TotalMismatch",
            Self::ProofMismatch => "ProofMismatch",
            Self::MalformedProof(_) => "MalformedProof",
            Self::InsufficientShares { .. } => "InsufficientShares",
            Self::InvalidShare(_) => "InvalidShare",
            Self::AlreadyMember => "AlreadyMember",
            Self::NotAMember => "NotAMember",
            Self::DuplicateNullifier => "DuplicateNullifier",
            Self::PotClosed => "PotClosed",
            Self::ThresholdNotMet { .. } => "ThresholdNotMet",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::UnknownPot => "UnknownPot",
            Self::Unauthorized => "Unauthorized",
            Self::NotOwner => "NotOwner",
            Self::Contention => "Contention",
            Self::Timeout => "Timeout",
            Self::Seal(_) => "Seal",
        }
    }

    /// Whether retrying with unchanged input could succeed. Only contention,
    /// timeouts and conditions another member's transition can lift qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientShares { .. }
                | Self::NotAMember
                | Self::ThresholdNotMet { .. }
                | Self::Contention
                | Self::Timeout
        )
    }
}

pub type PotResult<T> = Result<T, PotError>;
