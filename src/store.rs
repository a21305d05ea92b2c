//! JSON persistence for the ledger and for owner-side dealer material.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::core::{now_ts, MemberId, PotId};
use crate::ledger::{PotLedger, VersionedPot};
use crate::shares::{DealerBackup, Share};

pub const STORE_FORMAT: u32 = 1;

#[derive(Serialize, Deserialize)]
struct LedgerImage {
    format: u32,
    saved_at: u64,
    pots: Vec<VersionedPot>,
}

/// Ledger snapshot file.
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(p: impl AsRef<Path>) -> Self {
        Self { path: p.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger; a missing file yields an empty one.
    pub fn open(&self, cfg: EngineConfig) -> Result<PotLedger> {
        if !self.path.exists() {
            return Ok(PotLedger::new(cfg)?);
        }
        let img: LedgerImage = read_json(&self.path)?;
        ensure!(img.format == STORE_FORMAT, "unsupported ledger format {}", img.format);
        Ok(PotLedger::restore(cfg, img.pots)?)
    }

    pub async fn save(&self, ledger: &PotLedger) -> Result<()> {
        let img = LedgerImage { format: STORE_FORMAT, saved_at: now_ts(), pots: ledger.export().await };
        write_json(&self.path, &img)
    }
}

/// What the owner keeps after creating a pot: the dealer and the initial
/// shares still to be handed out.
#[derive(Serialize, Deserialize)]
pub struct OwnerVault {
    pub pot: PotId,
    pub dealer: DealerBackup,
    pub shares: Vec<(MemberId, Share)>,
}

impl OwnerVault {
    pub fn open(p: impl AsRef<Path>) -> Result<Self> {
        read_json(p.as_ref())
    }

    pub fn save(&self, p: impl AsRef<Path>) -> Result<()> {
        write_json(p.as_ref(), self)
    }

    pub fn share_for(&self, member: &MemberId) -> Option<&Share> {
        self.shares.iter().find(|(m, _)| m == member).map(|(_, s)| s)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let buf = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&buf).with_context(|| format!("parse {}", path.display()))
}

/// Write via a temporary sibling and rename, so a crash never leaves a
/// truncated file behind.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let buf = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, buf).with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("rename to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemberWallet;
    use crate::ledger::{CreatePot, SignedTransition, TransitionRequest};
    use crate::pot::{DepositNote, PotParams, PrivacyMode, RevealDealer, NATIVE_TOKEN};

    #[tokio::test]
    async fn ledger_survives_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger.json"));
        let ledger = store.open(EngineConfig::default()).unwrap();
        assert!(ledger.pot_ids().await.is_empty());

        let owner = MemberWallet::generate();
        let params = PotParams {
            name: "Saved".into(),
            token: NATIVE_TOKEN.into(),
            privacy_mode: PrivacyMode::CommitProve,
            threshold: 1,
            members: vec![],
        };
        let created = ledger.create_pot(CreatePot::sign(&owner, params).unwrap()).await.unwrap();
        let id = created.id;
        let snap = ledger.snapshot(&id).await.unwrap();
        let (note, _) = DepositNote::prepare(9, &owner.member_secret(&id), snap.pot.reveal_pk()).unwrap();
        let tx = SignedTransition::sign(&owner, id, TransitionRequest::Deposit { note }).unwrap();
        ledger.apply(tx.clone()).await.unwrap();
        store.save(&ledger).await.unwrap();

        let reloaded = store.open(EngineConfig::default()).unwrap();
        let back = reloaded.snapshot(&id).await.unwrap();
        assert_eq!(back.version, 2);
        assert_eq!(back.pot.deposits().len(), 1);
        assert_eq!(reloaded.events(&id).await.unwrap(), ledger.events(&id).await.unwrap());
        // Replay protection is persisted too.
        assert!(reloaded.apply(tx).await.is_err());
    }

    #[tokio::test]
    async fn owner_vault_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = PotLedger::new(EngineConfig::default()).unwrap();
        let owner = MemberWallet::generate();
        let params = PotParams {
            name: "Vault".into(),
            token: NATIVE_TOKEN.into(),
            privacy_mode: PrivacyMode::CommitProve,
            threshold: 1,
            members: vec![],
        };
        let created = ledger.create_pot(CreatePot::sign(&owner, params).unwrap()).await.unwrap();
        let vault = OwnerVault {
            pot: created.id,
            dealer: created.dealer.backup(),
            shares: created.shares.clone(),
        };
        let path = dir.path().join("vault.json");
        vault.save(&path).unwrap();

        let back = OwnerVault::open(&path).unwrap();
        assert_eq!(back.share_for(&owner.id()), created.shares.first().map(|(_, s)| s));
        let dealer = RevealDealer::restore(back.pot, &back.dealer).unwrap();
        let pot = ledger.snapshot(&created.id).await.unwrap().pot;
        assert_eq!(dealer.next_share(&pot).unwrap(), created.dealer.next_share(&pot).unwrap());
    }

    #[test]
    fn unknown_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, br#"{ "format": 99, "saved_at": 0, "pots": [] }"#).unwrap();
        assert!(LedgerStore::new(&path).open(EngineConfig::default()).is_err());
    }
}
