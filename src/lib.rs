//! PRIVPOT private savings pot engine
//!
//! A group pools deposits without publishing individual amounts:
//! - commitment: Pedersen commitments and per-(member, pot) nullifiers
//! - proof: Fiat-Shamir sum proofs over committed deposits (merlin transcripts)
//! - shares: Shamir M-of-N reveal shares with integrity tags
//! - seal: deposit openings sealed to the pot's X25519 reveal key
//! - pot: pot aggregate and lifecycle (Created → Open → ThresholdMet → Revealed)
//! - ledger: signed transitions applied by version compare-and-swap
//! - health: pot health score from activity, proof cadence and streaks
//! - identity: Ed25519 member wallets
//! - store: JSON persistence for the ledger and owner material

pub mod commitment;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod health;
pub mod identity;
pub mod ledger;
pub mod pot;
pub mod proof;
pub mod seal;
pub mod shares;
pub mod store;

pub use commitment::{commit, open, Commitment, MemberSecret, Nullifier, Opening};
pub use config::EngineConfig;
pub use core::{format_amount, parse_amount, Amount, Hash32, MemberId, PotId};
pub use error::{PotError, PotResult};
pub use health::PotHealth;
pub use identity::MemberWallet;
pub use ledger::{
    CreatePot, CreatedPot, PotLedger, PotSnapshot, SignedTransition, TransitionOutcome,
    TransitionRequest,
};
pub use pot::{
    DepositNote, Pot, PotEvent, PotParams, PotState, PrivacyMode, RevealDealer, MAX_DEPOSIT,
    NATIVE_TOKEN,
};
pub use proof::{prove, verify, Proof};
pub use shares::{combine, split, Share, ShareScheme};
