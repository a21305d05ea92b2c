#![forbid(unsafe_code)]

//! Sealed deposit openings
//!
//! Each deposit carries its opening (amount, blinding) encrypted to the
//! pot's X25519 reveal key:
//!
//! - ephemeral X25519 DH with the reveal public key
//! - key = KMAC256(shared, "POT-SEAL.key", commitment)
//! - XChaCha20-Poly1305, AAD = commitment
//!
//! Only a holder of the reveal private key (reconstructed from a threshold of
//! shares) can open the deposits.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::commitment::{Commitment, Opening};
use crate::crypto::kmac::kmac256_derive_key;
use crate::error::{PotError, PotResult};

pub const TAG_SEAL_KEY: &[u8] = b"POT-SEAL.key";
const OPENING_LEN: usize = 16 + 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedOpening {
    pub ephemeral_pk: [u8; 32],
    pub nonce24: [u8; 24],
    pub ciphertext: Vec<u8>,
}

fn seal_key(shared: &[u8; 32], commitment: &Commitment) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(kmac256_derive_key(shared, TAG_SEAL_KEY, commitment.as_bytes()))
}

/// Encrypt `opening` to `reveal_pk`, bound to `commitment`.
pub fn seal_opening(
    opening: &Opening,
    commitment: &Commitment,
    reveal_pk: &[u8; 32],
) -> PotResult<SealedOpening> {
    let eph = EphemeralSecret::random_from_rng(OsRng);
    let eph_pk = PublicKey::from(&eph);
    let shared = eph.diffie_hellman(&PublicKey::from(*reveal_pk));
    let key = seal_key(shared.as_bytes(), commitment);

    let mut pt = Zeroizing::new(Vec::with_capacity(OPENING_LEN));
    pt.extend_from_slice(&opening.amount.to_le_bytes());
    pt.extend_from_slice(&opening.blind);

    let mut nonce24 = [0u8; 24];
    OsRng.fill_bytes(&mut nonce24);
    let cipher = XChaCha20Poly1305::new_from_slice(&*key).map_err(|_| PotError::Seal("bad key"))?;
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce24),
            Payload { msg: pt.as_ref(), aad: commitment.as_bytes() },
        )
        .map_err(|_| PotError::Seal("encrypt failed"))?;

    Ok(SealedOpening { ephemeral_pk: eph_pk.to_bytes(), nonce24, ciphertext })
}

/// Decrypt a sealed opening with the reveal private key.
pub fn unseal_opening(
    sealed: &SealedOpening,
    commitment: &Commitment,
    reveal_sk: &StaticSecret,
) -> PotResult<Opening> {
    let shared = reveal_sk.diffie_hellman(&PublicKey::from(sealed.ephemeral_pk));
    let key = seal_key(shared.as_bytes(), commitment);
    let cipher = XChaCha20Poly1305::new_from_slice(&*key).map_err(|_| PotError::Seal("bad key"))?;
    let pt = Zeroizing::new(
        cipher
            .decrypt(
                XNonce::from_slice(&sealed.nonce24),
                Payload { msg: &sealed.ciphertext, aad: commitment.as_bytes() },
            )
            .map_err(|_| PotError::Seal("decrypt failed"))?,
    );
    if pt.len() != OPENING_LEN {
        return Err(PotError::Seal("bad opening length"));
    }
    let mut amount = [0u8; 16];
    amount.copy_from_slice(&pt[..16]);
    let mut blind = [0u8; 32];
    blind.copy_from_slice(&pt[16..]);
    Ok(Opening { amount: u128::from_le_bytes(amount), blind })
}
