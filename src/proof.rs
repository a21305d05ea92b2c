#![forbid(unsafe_code)]

//! Aggregate sum proofs over Pedersen deposit commitments
//!
//! Statement: the commitments C_1..C_k open to amounts summing to T.
//!
//! P = ΣC_i − T·H = (Σr_i)·G
//!
//! The prover shows knowledge of R = Σr_i with a Schnorr proof on P,
//! made non-interactive by a merlin transcript that binds every public
//! commitment and T. Binding of the commitments turns knowledge of R into
//! the sum relation; no individual amount is revealed.

#![allow(non_snake_case)]

use bincode::Options;
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT as G,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use merlin::Transcript;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::commitment::{generator_H, Commitment, Opening};
use crate::core::{Amount, Hash32};
use crate::crypto::kmac::kmac256_hash;
use crate::error::{PotError, PotResult};

pub const PROOF_VERSION: u8 = 1;
pub const SUM_LABEL: &[u8] = b"POT-SUM-PROOF.v1";
const INPUTS_DOMAIN: &[u8] = b"POT-SUM-INPUTS.v1";
const PROOF_MAX_SIZE: u64 = 1 << 10;

/// Opaque proof bytes, as submitted to the ledger.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof(pub Vec<u8>);

impl Proof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Proof({} bytes)", self.0.len())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SumProofWire {
    version: u8,
    count: u32,
    inputs_digest: Hash32,
    A: [u8; 32],
    s: [u8; 32],
}

/* ---------- helpers ---------- */

fn wire_options() -> impl Options {
    bincode::options()
        .with_limit(PROOF_MAX_SIZE)
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

fn challenge_scalar(t: &mut Transcript, label: &'static [u8]) -> Scalar {
    let mut buf = [0u8; 64];
    t.challenge_bytes(label, &mut buf);
    Scalar::from_bytes_mod_order_wide(&buf)
}

/// Digest of the public inputs a proof is bound to.
pub fn inputs_digest(commitments: &[Commitment], claimed_total: Amount) -> Hash32 {
    let count = (commitments.len() as u64).to_le_bytes();
    let total = claimed_total.to_le_bytes();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(commitments.len() + 2);
    parts.push(&count);
    for c in commitments {
        parts.push(c.as_bytes());
    }
    parts.push(&total);
    kmac256_hash(INPUTS_DOMAIN, &parts)
}

fn statement_transcript(commitments: &[Commitment], claimed_total: Amount) -> Transcript {
    let mut t = Transcript::new(SUM_LABEL);
    t.append_u64(b"n", commitments.len() as u64);
    for c in commitments {
        t.append_message(b"C", c.as_bytes());
    }
    t.append_message(b"T", &claimed_total.to_le_bytes());
    t
}

/// Public point P = ΣC − T·H.
fn statement_point(commitments: &[Commitment], claimed_total: Amount) -> Option<RistrettoPoint> {
    let sum = Commitment::sum(commitments.iter())?;
    Some(sum - Scalar::from(claimed_total) * generator_H())
}

/// Sum of amounts, rejecting zero amounts, empty input and overflow.
pub fn checked_total(amounts: impl IntoIterator<Item = Amount>) -> PotResult<Amount> {
    let mut total: Amount = 0;
    let mut seen = 0usize;
    for a in amounts {
        if a == 0 {
            return Err(PotError::InvalidAmount);
        }
        total = total.checked_add(a).ok_or(PotError::InvalidAmount)?;
        seen += 1;
    }
    if seen == 0 {
        return Err(PotError::InvalidAmount);
    }
    Ok(total)
}

/* ---------- prove / verify ---------- */

/// Prove that `openings` sum to `claimed_total`, exactly.
pub fn prove(openings: &[Opening], claimed_total: Amount) -> PotResult<Proof> {
    let actual = checked_total(openings.iter().map(|o| o.amount))?;
    if actual != claimed_total {
        return Err(PotError::TotalMismatch);
    }

    let commitments: Vec<Commitment> = openings.iter().map(Opening::commitment).collect();
    let R: Scalar = openings.iter().map(Opening::blind_scalar).sum();

    let mut t = statement_transcript(&commitments, claimed_total);

    // Nonce bound to transcript, witness and fresh randomness.
    let mut rng = t
        .build_rng()
        .rekey_with_witness_bytes(b"R", R.as_bytes())
        .finalize(&mut OsRng);
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    let k = Scalar::from_bytes_mod_order_wide(&wide);

    let A = (k * G).compress();
    t.append_message(b"A", A.as_bytes());
    let c = challenge_scalar(&mut t, b"c");
    let s = k + c * R;

    let wire = SumProofWire {
        version: PROOF_VERSION,
        count: commitments.len() as u32,
        inputs_digest: inputs_digest(&commitments, claimed_total),
        A: A.to_bytes(),
        s: s.to_bytes(),
    };
    let bytes = wire_options()
        .serialize(&wire)
        .map_err(|_| PotError::MalformedProof("encode failed"))?;
    Ok(Proof(bytes))
}

/// Verify a sum proof against the commitments on record.
///
/// `Ok(false)` means the proof is well formed and bound to these inputs but
/// the Schnorr equation does not hold.
pub fn verify(proof: &Proof, commitments: &[Commitment], claimed_total: Amount) -> PotResult<bool> {
    let wire: SumProofWire = wire_options()
        .deserialize(&proof.0)
        .map_err(|_| PotError::MalformedProof("undecodable proof bytes"))?;
    if wire.version != PROOF_VERSION {
        return Err(PotError::MalformedProof("unsupported proof version"));
    }
    let A = CompressedRistretto(wire.A)
        .decompress()
        .ok_or(PotError::MalformedProof("bad commitment point"))?;
    let s: Scalar = Option::from(Scalar::from_canonical_bytes(wire.s))
        .ok_or(PotError::MalformedProof("non-canonical response scalar"))?;

    if wire.count as usize != commitments.len()
        || wire.inputs_digest != inputs_digest(commitments, claimed_total)
    {
        return Err(PotError::ProofMismatch);
    }
    let P = statement_point(commitments, claimed_total).ok_or(PotError::ProofMismatch)?;

    let mut t = statement_transcript(commitments, claimed_total);
    t.append_message(b"A", &wire.A);
    let c = challenge_scalar(&mut t, b"c");

    Ok(s * G == A + c * P)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::MemberSecret;

    fn openings(amounts: &[Amount]) -> Vec<Opening> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| Opening::new(*a, &MemberSecret::from_bytes([i as u8 + 1; 32])))
            .collect()
    }

    fn commitments(ops: &[Opening]) -> Vec<Commitment> {
        ops.iter().map(Opening::commitment).collect()
    }

    #[test]
    fn test_prove_verify() {
        let ops = openings(&[100, 150]);
        let proof = prove(&ops, 250).unwrap();
        assert!(verify(&proof, &commitments(&ops), 250).unwrap());
    }

    #[test]
    fn test_total_mismatch() {
        let ops = openings(&[100, 150]);
        assert_eq!(prove(&ops, 251).unwrap_err(), PotError::TotalMismatch);
        assert_eq!(prove(&ops, 249).unwrap_err(), PotError::TotalMismatch);
    }

    #[test]
    fn test_invalid_amounts() {
        assert_eq!(prove(&[], 0).unwrap_err(), PotError::InvalidAmount);
        let ops = openings(&[0, 5]);
        assert_eq!(prove(&ops, 5).unwrap_err(), PotError::InvalidAmount);
        let ops = openings(&[Amount::MAX, 1]);
        assert_eq!(prove(&ops, 0).unwrap_err(), PotError::InvalidAmount);
    }

    #[test]
    fn test_wrong_claimed_total_is_mismatch() {
        let ops = openings(&[10, 20, 30]);
        let proof = prove(&ops, 60).unwrap();
        assert_eq!(verify(&proof, &commitments(&ops), 61).unwrap_err(), PotError::ProofMismatch);
    }

    #[test]
    fn test_other_commitments_are_mismatch() {
        let ops = openings(&[10, 20]);
        let proof = prove(&ops, 30).unwrap();
        let others = commitments(&openings(&[15, 15]));
        assert_eq!(verify(&proof, &others, 30).unwrap_err(), PotError::ProofMismatch);
        assert_eq!(
            verify(&proof, &commitments(&ops)[..1], 30).unwrap_err(),
            PotError::ProofMismatch
        );
    }

    #[test]
    fn test_malformed() {
        let ops = openings(&[7]);
        let mut bytes = prove(&ops, 7).unwrap().0;
        assert!(matches!(
            verify(&Proof(bytes[..10].to_vec()), &commitments(&ops), 7),
            Err(PotError::MalformedProof(_))
        ));
        bytes[0] = 9;
        assert!(matches!(
            verify(&Proof(bytes), &commitments(&ops), 7),
            Err(PotError::MalformedProof(_))
        ));
    }

    #[test]
    fn test_tampered_response_fails() {
        let ops = openings(&[1, 2, 3]);
        let proof = prove(&ops, 6).unwrap();
        let mut wire: SumProofWire = wire_options().deserialize(&proof.0).unwrap();
        let s = Scalar::from_canonical_bytes(wire.s).unwrap() + Scalar::ONE;
        wire.s = s.to_bytes();
        let forged = Proof(wire_options().serialize(&wire).unwrap());
        assert!(!verify(&forged, &commitments(&ops), 6).unwrap());
    }

    #[test]
    fn test_verify_idempotent() {
        let ops = openings(&[42, 58]);
        let cs = commitments(&ops);
        let proof = prove(&ops, 100).unwrap();
        assert!(verify(&proof, &cs, 100).unwrap());
        assert!(verify(&proof, &cs, 100).unwrap());
    }
}
