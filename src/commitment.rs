//! Pedersen deposit commitments
//!
//! C = v·H + r·G
//!
//! Where:
//! - G = Ristretto basepoint (blinding base)
//! - H = cSHAKE256("POT-PEDERSEN-H") (value base)
//! - r = KMAC256(member_secret, "POT-BLIND.v1") reduced mod ℓ
//!
//! Security:
//! - Binding: opening to two amounts requires log_G(H)
//! - Hiding: without r the point is uniformly distributed
//! - Nullifier = KMAC256(member_secret, "POT-NULLIFIER.v1"); the member
//!   secret is per (wallet, pot), so there is one nullifier per member per pot

#![forbid(unsafe_code)]
#![allow(non_snake_case)]

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT as G,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use serde::{Deserialize, Serialize};
use tiny_keccak::{CShake, Hasher};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::core::{Amount, Hash32};
use crate::crypto::kmac::{kmac256_tag, kmac256_wide};
use crate::error::{PotError, PotResult};

pub const TAG_BLIND: &[u8] = b"POT-BLIND.v1";
pub const TAG_NULLIFIER: &[u8] = b"POT-NULLIFIER.v1";

pub type Nullifier = Hash32;

/* ============================================================================
 * Generators
 * ========================================================================== */

/// H generator (value base), derived via cSHAKE256("POT-PEDERSEN-H")
#[inline(always)]
pub fn generator_H() -> RistrettoPoint {
    let cs = CShake::v256(b"POT-PEDERSEN-H", b"");
    let mut bytes = [0u8; 64];
    cs.finalize(&mut bytes);
    RistrettoPoint::from_uniform_bytes(&bytes)
}

/* ============================================================================
 * Member secret
 * ========================================================================== */

/// Per-pot member secret. Never leaves the member's wallet.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MemberSecret([u8; 32]);

impl MemberSecret {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn blinding(&self) -> Scalar {
        let wide = Zeroizing::new(kmac256_wide(&self.0, TAG_BLIND, b""));
        Scalar::from_bytes_mod_order_wide(&wide)
    }

    pub fn nullifier(&self) -> Nullifier {
        kmac256_tag(&self.0, TAG_NULLIFIER, b"")
    }
}

impl std::fmt::Debug for MemberSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MemberSecret(..)")
    }
}

/* ============================================================================
 * Commitment
 * ========================================================================== */

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn decompress(&self) -> Option<RistrettoPoint> {
        CompressedRistretto(self.0).decompress()
    }

    /// Homomorphic sum of commitments; `None` if any point is invalid.
    pub fn sum<'a, I>(items: I) -> Option<RistrettoPoint>
    where
        I: IntoIterator<Item = &'a Commitment>,
    {
        let mut acc = RistrettoPoint::default();
        for c in items {
            acc += c.decompress()?;
        }
        Some(acc)
    }
}

impl std::fmt::Debug for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Commitment({})", hex::encode(&self.0[..8]))
    }
}

/// Opening of a commitment: the hidden amount and its blinding factor.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Opening {
    pub amount: Amount,
    pub blind: [u8; 32],
}

impl Opening {
    pub fn new(amount: Amount, secret: &MemberSecret) -> Self {
        Self { amount, blind: secret.blinding().to_bytes() }
    }

    pub(crate) fn blind_scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.blind)
    }

    pub fn commitment(&self) -> Commitment {
        commit_raw(self.amount, &self.blind_scalar())
    }

    /// Returns true if this opening matches `commitment`.
    pub fn opens(&self, commitment: &Commitment) -> bool {
        self.amount > 0 && &self.commitment() == commitment
    }
}

impl std::fmt::Debug for Opening {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opening").field("amount", &self.amount).finish_non_exhaustive()
    }
}

fn commit_raw(amount: Amount, blind: &Scalar) -> Commitment {
    let C = Scalar::from(amount) * generator_H() + blind * G;
    Commitment(C.compress().to_bytes())
}

/// Commit to a private deposit amount.
pub fn commit(amount: Amount, secret: &MemberSecret) -> PotResult<(Commitment, Nullifier)> {
    if amount == 0 {
        return Err(PotError::InvalidAmount);
    }
    let opening = Opening::new(amount, secret);
    Ok((opening.commitment(), secret.nullifier()))
}

/// Verify a claimed opening of `commitment`.
pub fn open(commitment: &Commitment, amount: Amount, secret: &MemberSecret) -> bool {
    Opening::new(amount, secret).opens(commitment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rand::RngCore;

    fn random_secret() -> MemberSecret {
        let mut b = [0u8; 32];
        OsRng.fill_bytes(&mut b);
        MemberSecret::from_bytes(b)
    }

    #[test]
    fn test_generator_independent() {
        let H1 = generator_H();
        let H2 = generator_H();
        assert_eq!(H1, H2, "H generator must be deterministic");
        assert_ne!(H1, G, "H and G must be independent");
    }

    #[test]
    fn test_commit_open_roundtrip() {
        let s = random_secret();
        let (c, nf) = commit(1000, &s).unwrap();
        assert!(open(&c, 1000, &s));
        assert!(!open(&c, 999, &s), "Wrong amount must fail");
        assert!(!open(&c, 1000, &random_secret()), "Wrong secret must fail");
        assert_eq!(nf, s.nullifier());
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert_eq!(commit(0, &random_secret()).unwrap_err(), PotError::InvalidAmount);
    }

    #[test]
    fn test_binding_distinct_amounts() {
        let s = random_secret();
        let (c1, _) = commit(100, &s).unwrap();
        let (c2, _) = commit(101, &s).unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_hiding_same_amount_different_secrets() {
        let (c1, n1) = commit(500, &random_secret()).unwrap();
        let (c2, n2) = commit(500, &random_secret()).unwrap();
        assert_ne!(c1, c2, "Equal amounts must not produce equal commitments");
        assert_ne!(n1, n2);
    }

    #[test]
    fn test_homomorphic_sum() {
        let a = random_secret();
        let b = random_secret();
        let oa = Opening::new(100, &a);
        let ob = Opening::new(150, &b);
        let sum = Commitment::sum([oa.commitment(), ob.commitment()].iter()).unwrap();

        let r = oa.blind_scalar() + ob.blind_scalar();
        let expected = Scalar::from(250u64) * generator_H() + r * G;
        assert_eq!(sum, expected, "Homomorphic addition must work");
    }

    #[test]
    fn test_large_amounts() {
        let s = random_secret();
        let amount: Amount = 1_000_000 * 10u128.pow(18);
        let (c, _) = commit(amount, &s).unwrap();
        assert!(open(&c, amount, &s));
    }
}
