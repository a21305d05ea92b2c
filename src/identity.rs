#![forbid(unsafe_code)]

//! Member wallets: Ed25519 identity keys and per-pot member secrets.
//!
//! Everything derives from one 32-byte seed:
//! - identity key = Ed25519(KMAC256(seed, "POT-ID-KEY.v1"))
//! - member secret for pot P = KMAC256(seed, "POT-MEMBER-SECRET.v1", P)

use std::path::Path;

use anyhow::{ensure, Context, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::commitment::MemberSecret;
use crate::core::{MemberId, PotId};
use crate::crypto::kmac::kmac256_derive_key;

pub const TAG_ID_KEY: &[u8] = b"POT-ID-KEY.v1";
pub const TAG_MEMBER_SECRET: &[u8] = b"POT-MEMBER-SECRET.v1";
pub const WALLET_VERSION: u32 = 1;

pub struct MemberWallet {
    seed: Zeroizing<[u8; 32]>,
    signing: SigningKey,
}

#[derive(Serialize, Deserialize)]
struct WalletFile {
    version: u32,
    seed_hex: String,
}

impl MemberWallet {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let sk = Zeroizing::new(kmac256_derive_key(&seed, TAG_ID_KEY, b""));
        let signing = SigningKey::from_bytes(&sk);
        Self { seed: Zeroizing::new(seed), signing }
    }

    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn id(&self) -> MemberId {
        MemberId(self.signing.verifying_key().to_bytes())
    }

    /// Secret used for this member's commitment and nullifier in `pot`.
    pub fn member_secret(&self, pot: &PotId) -> MemberSecret {
        MemberSecret::from_bytes(kmac256_derive_key(&*self.seed, TAG_MEMBER_SECRET, pot.as_bytes()))
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.signing.sign(msg).to_bytes().to_vec()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let buf = std::fs::read(path).with_context(|| format!("read wallet {}", path.display()))?;
        let wf: WalletFile = serde_json::from_slice(&buf)?;
        ensure!(wf.version == WALLET_VERSION, "unsupported wallet version {}", wf.version);
        let raw = Zeroizing::new(hex::decode(&wf.seed_hex)?);
        ensure!(raw.len() == 32, "wallet seed must be 32 bytes");
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&raw);
        Ok(Self::from_seed(seed))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let wf = WalletFile { version: WALLET_VERSION, seed_hex: hex::encode(*self.seed) };
        let buf = serde_json::to_vec_pretty(&wf)?;
        write_private(path.as_ref(), &buf)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, buf: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut f = std::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("create wallet {}", path.display()))?;
    f.write_all(buf)?;
    f.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, buf: &[u8]) -> Result<()> {
    use std::io::Write;
    let mut f = std::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create wallet {}", path.display()))?;
    f.write_all(buf)?;
    f.sync_all()?;
    Ok(())
}

/// Check an Ed25519 signature by `who` over `msg`.
pub fn verify_signature(who: &MemberId, msg: &[u8], sig: &[u8]) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(&who.0) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(sig) else {
        return false;
    };
    vk.verify(msg, &sig).is_ok()
}
