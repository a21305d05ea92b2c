#![forbid(unsafe_code)]

//! Core primitives (Hash32, identifiers, amounts, timestamp utilities)

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PotError;

pub type Hash32 = [u8; 32];

/// Amount in base units (fixed point, `decimals` fractional digits).
pub type Amount = u128;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Fast SHAKE256 hash
pub fn shake256_bytes(data: &[u8]) -> Hash32 {
    use tiny_keccak::{Hasher, Shake};
    let mut sh = Shake::v256();
    sh.update(data);
    let mut out = [0u8; 32];
    sh.finalize(&mut out);
    out
}

pub fn now_ts() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn day_of(ts: u64) -> u64 {
    ts / SECONDS_PER_DAY
}

/* ---------- identifiers ---------- */

/// Address-like pot identifier (20 bytes, rendered `0x…`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PotId(pub [u8; 20]);

impl PotId {
    /// Derive a pot id from the creation parameters and a random nonce.
    pub fn derive(owner: &MemberId, name: &str, created_at: u64, nonce: &[u8; 16]) -> Self {
        let mut buf = Vec::with_capacity(32 + name.len() + 8 + 16 + 16);
        buf.extend_from_slice(b"POT-ID.v1");
        buf.extend_from_slice(&owner.0);
        buf.extend_from_slice(&(name.len() as u64).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&created_at.to_le_bytes());
        buf.extend_from_slice(nonce);
        let h = shake256_bytes(&buf);
        let mut id = [0u8; 20];
        id.copy_from_slice(&h[12..]);
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for PotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PotId({self})")
    }
}

impl FromStr for PotId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 20];
        hex::decode_to_slice(raw, &mut out)?;
        Ok(Self(out))
    }
}

/// Member identity: the member's Ed25519 verifying key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub [u8; 32]);

impl MemberId {
    pub fn short(&self) -> String {
        let h = hex::encode(self.0);
        format!("{}…{}", &h[..6], &h[h.len() - 4..])
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId({})", self.short())
    }
}

impl FromStr for MemberId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

// Both ids serialize as hex strings so they can key JSON maps.
macro_rules! hex_serde {
    ($t:ty) => {
        impl Serialize for $t {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $t {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_serde!(PotId);
hex_serde!(MemberId);

/* ---------- fixed-point amounts ---------- */

/// Parse a decimal string ("1.5") into base units with exactly `decimals`
/// fractional digits. Extra precision is rejected, never rounded.
pub fn parse_amount(s: &str, decimals: u8) -> Result<Amount, PotError> {
    let s = s.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    let digits_ok = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty())
        || !digits_ok(int_part)
        || !digits_ok(frac_part)
        || frac_part.len() > decimals as usize
    {
        return Err(PotError::InvalidAmount);
    }
    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or(PotError::InvalidAmount)?;
    let int_val: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| PotError::InvalidAmount)?
    };
    let frac_val: u128 = if frac_part.is_empty() {
        0
    } else {
        let pad = decimals as u32 - frac_part.len() as u32;
        let raw: u128 = frac_part.parse().map_err(|_| PotError::InvalidAmount)?;
        raw * 10u128.pow(pad)
    };
    int_val
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or(PotError::InvalidAmount)
}

/// Render base units as a decimal string, trimming trailing zeros.
pub fn format_amount(amount: Amount, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u128.pow(decimals as u32);
    let int_part = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return int_part.to_string();
    }
    let frac_str = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", int_part, frac_str.trim_end_matches('0'))
}
