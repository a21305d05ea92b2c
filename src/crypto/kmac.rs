//! KMAC-style keyed derivations over SHAKE256.
//!
//! Every field absorbed into the sponge is length-prefixed, so (key, label,
//! data) triples can never be re-split into a colliding encoding. Used for
//! member secrets, blinding factors, nullifiers, share tags and seal keys.

use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

const KMAC_DOMAIN: &[u8] = b"POT-KMAC256.v1";

struct Sponge(Shake256);

impl Sponge {
    fn keyed(key: &[u8], label: &[u8]) -> Self {
        let mut s = Sponge(Shake256::default());
        s.0.update(KMAC_DOMAIN);
        s.field(key).field(label)
    }

    fn field(mut self, data: &[u8]) -> Self {
        self.0.update(&(data.len() as u64).to_le_bytes());
        self.0.update(data);
        self
    }

    fn squeeze<const N: usize>(self) -> [u8; N] {
        let mut out = [0u8; N];
        self.0.finalize_xof().read(&mut out);
        out
    }
}

/// 32-byte key bound to `label` and `salt`.
pub fn kmac256_derive_key(key_material: &[u8], label: &[u8], salt: &[u8]) -> [u8; 32] {
    Sponge::keyed(key_material, label).field(salt).squeeze()
}

/// 32-byte tag over `message`.
pub fn kmac256_tag(key: &[u8], label: &[u8], message: &[u8]) -> [u8; 32] {
    Sponge::keyed(key, label).field(message).squeeze()
}

/// 64 bytes, for wide reduction into a scalar.
pub fn kmac256_wide(key: &[u8], label: &[u8], data: &[u8]) -> [u8; 64] {
    Sponge::keyed(key, label).field(data).squeeze()
}

/// Unkeyed digest of a list of fields under `domain`.
pub fn kmac256_hash(domain: &[u8], inputs: &[&[u8]]) -> [u8; 32] {
    let mut combined = Vec::new();
    for input in inputs {
        combined.extend_from_slice(&(input.len() as u64).to_le_bytes());
        combined.extend_from_slice(input);
    }
    kmac256_tag(b"", domain, &combined)
}
