//! Engine configuration: amount precision, pot limits and boundary timeouts.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{PotError, PotResult};
use crate::shares::MAX_SHARES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fractional digits of the base-unit amount representation.
    pub decimals: u8,
    /// Upper bound on a pot's reveal threshold.
    pub max_threshold: u8,
    pub max_name_len: usize,
    pub max_nickname_len: usize,
    /// Budget for proof generation at the ledger boundary.
    pub proof_timeout_ms: u64,
    /// Compare-and-swap attempts before a transition gives up.
    pub max_cas_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decimals: 18,
            max_threshold: 100,
            max_name_len: 50,
            max_nickname_len: 32,
            proof_timeout_ms: 5_000,
            max_cas_retries: 16,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> PotResult<()> {
        if self.decimals > 30 {
            return Err(PotError::InvalidConfig("decimals must be <= 30".into()));
        }
        if self.max_threshold == 0 || self.max_threshold as usize > MAX_SHARES {
            return Err(PotError::InvalidConfig(format!(
                "max_threshold must be in 1..={MAX_SHARES}"
            )));
        }
        if self.max_name_len == 0 {
            return Err(PotError::InvalidConfig("max_name_len must be positive".into()));
        }
        if self.max_cas_retries == 0 {
            return Err(PotError::InvalidConfig("max_cas_retries must be positive".into()));
        }
        Ok(())
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_millis(self.proof_timeout_ms)
    }

    /// Load from a JSON file; missing keys take their defaults.
    pub fn load(p: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = p.as_ref();
        let buf = std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        let cfg: Self = serde_json::from_slice(&buf)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self, p: impl AsRef<Path>) -> anyhow::Result<()> {
        let buf = serde_json::to_vec_pretty(self)?;
        std::fs::write(p.as_ref(), buf)?;
        Ok(())
    }
}
