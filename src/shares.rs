#![forbid(unsafe_code)]

//! Threshold reveal shares (Shamir M-of-N over GF(256), via `sharks`).
//!
//! - `split` deals N shares of a secret, any T of which reconstruct it.
//! - `combine` checks every share's integrity tag, drops exact duplicates,
//!   rejects conflicting ones and interpolates.
//! - `ShareScheme` pins the scheme id, threshold and a digest of the secret
//!   so that a reconstruction can be validated.
//! - `ShareDealer` keeps the polynomial seed so that further shares of the
//!   same polynomial can be issued later (members joining after creation).
//!
//! The tag is keyed by the public scheme id: it catches corruption and
//! cross-scheme mixing. Authenticity of a member's share comes from the
//! digest the dealer registers on the pot.

use std::collections::BTreeMap;

use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sharks::Sharks;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::core::Hash32;
use crate::crypto::kmac::{kmac256_hash, kmac256_tag};
use crate::error::{PotError, PotResult};

pub const MAX_SHARES: usize = u8::MAX as usize;
pub const TAG_SHARE: &[u8] = b"POT-SHARE.tag";
const SCHEME_DOMAIN: &[u8] = b"POT-SHARE.scheme";
const SECRET_LABEL: &[u8] = b"POT-SHARE.secret";
const DIGEST_DOMAIN: &[u8] = b"POT-SHARE.digest";

/// Public description of one secret-sharing instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareScheme {
    pub id: Hash32,
    pub threshold: u8,
    pub secret_digest: Hash32,
}

/// One Shamir fragment. `payload` is the `sharks` encoding (x ‖ y…).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub scheme_id: Hash32,
    pub index: u8,
    pub payload: Vec<u8>,
    pub tag: Hash32,
}

impl std::fmt::Debug for Share {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Share")
            .field("scheme", &hex::encode(&self.scheme_id[..6]))
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

fn share_tag(scheme_id: &Hash32, index: u8, payload: &[u8]) -> Hash32 {
    let mut msg = Vec::with_capacity(1 + payload.len());
    msg.push(index);
    msg.extend_from_slice(payload);
    kmac256_tag(scheme_id, TAG_SHARE, &msg)
}

impl Share {
    fn new(scheme_id: Hash32, payload: Vec<u8>) -> Self {
        let index = payload[0];
        let tag = share_tag(&scheme_id, index, &payload);
        Self { scheme_id, index, payload, tag }
    }

    /// Tag matches and the payload's x-coordinate matches `index`.
    pub fn check_integrity(&self) -> bool {
        self.payload.len() >= 2
            && self.payload[0] == self.index
            && self.index != 0
            && share_tag(&self.scheme_id, self.index, &self.payload) == self.tag
    }

    /// Public fingerprint; the pot registers this per member.
    pub fn digest(&self) -> Hash32 {
        kmac256_hash(DIGEST_DOMAIN, &[&self.scheme_id, &[self.index], &self.payload, &self.tag])
    }
}

impl ShareScheme {
    /// Scheme bound to `context` (the pot id) and threshold.
    pub fn new(context: &[u8], threshold: u8, secret: &[u8]) -> Self {
        let id = kmac256_hash(SCHEME_DOMAIN, &[context, &[threshold]]);
        let secret_digest = kmac256_tag(&id, SECRET_LABEL, secret);
        Self { id, threshold, secret_digest }
    }

    /// Combine `shares` and check the result against `secret_digest`.
    pub fn reconstruct(&self, shares: &[Share]) -> PotResult<Zeroizing<Vec<u8>>> {
        if shares.iter().any(|s| s.scheme_id != self.id) {
            return Err(PotError::InvalidShare("share belongs to another scheme"));
        }
        let secret = combine(shares, self.threshold)?;
        if kmac256_tag(&self.id, SECRET_LABEL, &secret) != self.secret_digest {
            return Err(PotError::InvalidShare("reconstructed secret does not match scheme"));
        }
        Ok(secret)
    }
}

fn check_params(n: usize, t: u8) -> PotResult<()> {
    if t == 0 || (t as usize) > n || n > MAX_SHARES {
        return Err(PotError::InvalidConfig(format!(
            "share parameters must satisfy 1 <= t <= n <= {MAX_SHARES} (t={t}, n={n})"
        )));
    }
    Ok(())
}

/// Dealer of one sharing; holds the secret and the polynomial seed.
pub struct ShareDealer {
    scheme: ShareScheme,
    context: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
    poly_seed: Zeroizing<[u8; 32]>,
}

/// Everything needed to rebuild a dealer. Secret material.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct DealerBackup {
    pub context: Vec<u8>,
    pub threshold: u8,
    pub secret: Vec<u8>,
    pub poly_seed: [u8; 32],
}

impl ShareDealer {
    pub fn new(context: &[u8], secret: &[u8], threshold: u8) -> PotResult<Self> {
        check_params(MAX_SHARES, threshold)?;
        if secret.is_empty() {
            return Err(PotError::InvalidConfig("empty secret".into()));
        }
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Ok(Self {
            scheme: ShareScheme::new(context, threshold, secret),
            context: context.to_vec(),
            secret: Zeroizing::new(secret.to_vec()),
            poly_seed: Zeroizing::new(seed),
        })
    }

    pub fn backup(&self) -> DealerBackup {
        DealerBackup {
            context: self.context.clone(),
            threshold: self.scheme.threshold,
            secret: self.secret.to_vec(),
            poly_seed: *self.poly_seed,
        }
    }

    pub fn restore(backup: &DealerBackup) -> PotResult<Self> {
        check_params(MAX_SHARES, backup.threshold)?;
        Ok(Self {
            scheme: ShareScheme::new(&backup.context, backup.threshold, &backup.secret),
            context: backup.context.clone(),
            secret: Zeroizing::new(backup.secret.clone()),
            poly_seed: Zeroizing::new(backup.poly_seed),
        })
    }

    pub fn scheme(&self) -> &ShareScheme {
        &self.scheme
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    fn evaluations(&self) -> impl Iterator<Item = sharks::Share> {
        let mut rng = ChaCha20Rng::from_seed(*self.poly_seed);
        Sharks(self.scheme.threshold).dealer_rng(&self.secret, &mut rng)
    }

    /// Share at x = `index` (1..=255).
    pub fn share_at(&self, index: u8) -> PotResult<Share> {
        if index == 0 {
            return Err(PotError::InvalidConfig("share index starts at 1".into()));
        }
        let sh = self
            .evaluations()
            .nth(index as usize - 1)
            .ok_or_else(|| PotError::InvalidConfig("share index out of range".into()))?;
        Ok(Share::new(self.scheme.id, Vec::from(&sh)))
    }

    /// First `n` shares (x = 1..=n).
    pub fn deal(&self, n: usize) -> PotResult<Vec<Share>> {
        check_params(n, self.scheme.threshold)?;
        Ok(self
            .evaluations()
            .take(n)
            .map(|sh| Share::new(self.scheme.id, Vec::from(&sh)))
            .collect())
    }
}

/// Split `secret` into `n` shares with threshold `t`.
pub fn split(secret: &[u8], n: usize, t: u8) -> PotResult<(ShareScheme, Vec<Share>)> {
    check_params(n, t)?;
    let mut context = [0u8; 32];
    OsRng.fill_bytes(&mut context);
    let dealer = ShareDealer::new(&context, secret, t)?;
    let shares = dealer.deal(n)?;
    Ok((dealer.scheme, shares))
}

/// Reconstruct the secret from at least `t` distinct shares.
pub fn combine(shares: &[Share], t: u8) -> PotResult<Zeroizing<Vec<u8>>> {
    if t == 0 {
        return Err(PotError::InvalidConfig("threshold must be at least 1".into()));
    }
    let mut distinct: BTreeMap<u8, &Share> = BTreeMap::new();
    let mut scheme: Option<&Hash32> = None;
    for sh in shares {
        if !sh.check_integrity() {
            return Err(PotError::InvalidShare("integrity check failed"));
        }
        match scheme {
            None => scheme = Some(&sh.scheme_id),
            Some(id) if id != &sh.scheme_id => {
                return Err(PotError::InvalidShare("shares from different schemes"))
            }
            Some(_) => {}
        }
        if let Some(prev) = distinct.insert(sh.index, sh) {
            if prev.payload != sh.payload {
                return Err(PotError::InvalidShare("conflicting shares at one index"));
            }
        }
    }
    if distinct.len() < t as usize {
        return Err(PotError::InsufficientShares { have: distinct.len(), need: t as usize });
    }

    let len = distinct.values().next().map(|s| s.payload.len()).unwrap_or(0);
    let mut parsed = Vec::with_capacity(distinct.len());
    for sh in distinct.values() {
        if sh.payload.len() != len {
            return Err(PotError::InvalidShare("share length mismatch"));
        }
        let s = sharks::Share::try_from(sh.payload.as_slice())
            .map_err(|_| PotError::InvalidShare("unparseable share payload"))?;
        parsed.push(s);
    }

    let secret = Sharks(t)
        .recover(parsed.iter())
        .map_err(|_| PotError::InvalidShare("interpolation failed"))?;
    Ok(Zeroizing::new(secret))
}
