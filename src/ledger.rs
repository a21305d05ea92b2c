//! In-process ledger for private pots
//!
//! Holds every pot behind a version counter. A transition is applied to a
//! clone of the current snapshot without holding any lock; the write lock is
//! only taken to compare versions and swap. On conflict the transition is
//! re-validated against the newer state, up to `max_cas_retries` times.
//!
//! Requests are Ed25519-signed by the caller and bound to the pot id. Each
//! accepted request's digest is remembered so a signed request cannot be
//! replayed.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::commitment::{Commitment, Opening};
use crate::config::EngineConfig;
use crate::core::{now_ts, Amount, Hash32, MemberId, PotId};
use crate::crypto::kmac::kmac256_hash;
use crate::error::{PotError, PotResult};
use crate::health::{assess, PotHealth};
use crate::identity::{verify_signature, MemberWallet};
use crate::pot::{
    DepositNote, Pot, PotEvent, PotParams, PotState, RevealDealer, TxContext,
};
use crate::proof::{self, Proof};
use crate::shares::Share;

const TX_DOMAIN: &str = "POT-TX.v1";
const CREATE_DOMAIN: &str = "POT-CREATE.v1";
const DIGEST_DOMAIN: &[u8] = b"POT-TX.digest";

/* ============================================================================
 * Requests
 * ========================================================================== */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionRequest {
    Join,
    Deposit { note: DepositNote },
    SubmitProof { proof: Proof, claimed_total: Amount, commitments: Vec<Commitment> },
    RequestReveal { share: Share },
    RevealTotal,
    SetNickname { nickname: Option<String> },
    IssueShare { member: MemberId, index: u8, digest: Hash32 },
}

impl TransitionRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            TransitionRequest::Join => "join",
            TransitionRequest::Deposit { .. } => "deposit",
            TransitionRequest::SubmitProof { .. } => "submit_proof",
            TransitionRequest::RequestReveal { .. } => "request_reveal",
            TransitionRequest::RevealTotal => "reveal_total",
            TransitionRequest::SetNickname { .. } => "set_nickname",
            TransitionRequest::IssueShare { .. } => "issue_share",
        }
    }
}

fn encode<T: Serialize>(value: &T) -> PotResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| PotError::InvalidConfig(format!("encode request: {e}")))
}

/// A request signed by its caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedTransition {
    pub pot: PotId,
    pub caller: MemberId,
    pub request: TransitionRequest,
    pub signature: Vec<u8>,
}

impl SignedTransition {
    pub fn signing_bytes(pot: &PotId, request: &TransitionRequest) -> PotResult<Vec<u8>> {
        encode(&(TX_DOMAIN, pot, request))
    }

    pub fn sign(wallet: &MemberWallet, pot: PotId, request: TransitionRequest) -> PotResult<Self> {
        let msg = Self::signing_bytes(&pot, &request)?;
        Ok(Self { pot, caller: wallet.id(), signature: wallet.sign(&msg), request })
    }

    pub fn verify(&self) -> bool {
        match Self::signing_bytes(&self.pot, &self.request) {
            Ok(msg) => verify_signature(&self.caller, &msg, &self.signature),
            Err(_) => false,
        }
    }

    /// Replay key; also the external reference recorded in the activity log.
    pub fn digest(&self) -> PotResult<Hash32> {
        let msg = Self::signing_bytes(&self.pot, &self.request)?;
        Ok(kmac256_hash(DIGEST_DOMAIN, &[&self.caller.0, &msg, &self.signature]))
    }
}

/// Signed pot creation request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatePot {
    pub owner: MemberId,
    pub params: PotParams,
    pub signature: Vec<u8>,
}

impl CreatePot {
    pub fn sign(wallet: &MemberWallet, params: PotParams) -> PotResult<Self> {
        let owner = wallet.id();
        let msg = encode(&(CREATE_DOMAIN, &owner, &params))?;
        Ok(Self { owner, signature: wallet.sign(&msg), params })
    }

    pub fn verify(&self) -> bool {
        match encode(&(CREATE_DOMAIN, &self.owner, &self.params)) {
            Ok(msg) => verify_signature(&self.owner, &msg, &self.signature),
            Err(_) => false,
        }
    }
}

/* ============================================================================
 * Results
 * ========================================================================== */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub pot: PotId,
    pub version: u64,
    pub state: PotState,
    pub events: Vec<PotEvent>,
    /// Set by `RevealTotal`.
    pub total: Option<Amount>,
}

/// Returned to the owner by `create_pot`. The dealer stays with the owner.
#[derive(Debug)]
pub struct CreatedPot {
    pub id: PotId,
    pub dealer: RevealDealer,
    pub shares: Vec<(MemberId, Share)>,
    pub events: Vec<PotEvent>,
}

/// Read model for the presentation layer.
#[derive(Clone, Debug, Serialize)]
pub struct PotSnapshot {
    pub version: u64,
    pub pot: Pot,
    pub health: PotHealth,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VersionedPot {
    pub version: u64,
    pub pot: Pot,
    events: Vec<PotEvent>,
    seen_requests: BTreeSet<Hash32>,
}

/* ============================================================================
 * Ledger
 * ========================================================================== */

pub struct PotLedger {
    cfg: EngineConfig,
    clock: fn() -> u64,
    pots: RwLock<HashMap<PotId, Arc<VersionedPot>>>,
}

impl PotLedger {
    pub fn new(cfg: EngineConfig) -> PotResult<Self> {
        Self::with_clock(cfg, now_ts)
    }

    pub fn with_clock(cfg: EngineConfig, clock: fn() -> u64) -> PotResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg, clock, pots: RwLock::new(HashMap::new()) })
    }

    /// Rebuild a ledger from previously exported pots.
    pub fn restore(cfg: EngineConfig, pots: Vec<VersionedPot>) -> PotResult<Self> {
        let ledger = Self::new(cfg)?;
        let map = pots.into_iter().map(|vp| (vp.pot.id, Arc::new(vp))).collect();
        Ok(Self { pots: RwLock::new(map), ..ledger })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub async fn create_pot(&self, req: CreatePot) -> PotResult<CreatedPot> {
        if !req.verify() {
            warn!("create_pot: bad signature from {}", req.owner.short());
            return Err(PotError::Unauthorized);
        }
        let ctx = TxContext::at((self.clock)());
        let genesis = Pot::create(&self.cfg, req.owner, req.params, &ctx)?;
        let id = genesis.pot.id;

        let entry = VersionedPot {
            version: 1,
            pot: genesis.pot,
            events: genesis.events.clone(),
            seen_requests: BTreeSet::new(),
        };
        {
            let mut pots = self.pots.write().await;
            if pots.contains_key(&id) {
                return Err(PotError::InvalidConfig(format!("pot {id} already exists")));
            }
            pots.insert(id, Arc::new(entry));
        }
        info!("pot {} created by {} ({} members)", id, req.owner.short(), genesis.shares.len());

        Ok(CreatedPot { id, dealer: genesis.dealer, shares: genesis.shares, events: genesis.events })
    }

    async fn current(&self, id: &PotId) -> PotResult<Arc<VersionedPot>> {
        self.pots.read().await.get(id).cloned().ok_or(PotError::UnknownPot)
    }

    /// Validate and apply one signed transition.
    pub async fn apply(&self, tx: SignedTransition) -> PotResult<TransitionOutcome> {
        if !tx.verify() {
            warn!("{}: bad signature from {} on pot {}", tx.request.kind(), tx.caller.short(), tx.pot);
            return Err(PotError::Unauthorized);
        }
        let digest = tx.digest()?;
        let ctx = TxContext { now: (self.clock)(), external_ref: Some(hex::encode(digest)) };

        for attempt in 0..self.cfg.max_cas_retries {
            let current = self.current(&tx.pot).await?;
            if current.seen_requests.contains(&digest) {
                return Err(PotError::DuplicateNullifier);
            }

            let mut next = (*current).clone();
            let (events, total) = match transition(&self.cfg, &mut next.pot, &tx, &ctx) {
                Ok(r) => r,
                Err(e) => {
                    debug!("{} on pot {} rejected: {}", tx.request.kind(), tx.pot, e);
                    return Err(e);
                }
            };
            next.version += 1;
            next.seen_requests.insert(digest);
            next.events.extend(events.iter().cloned());

            let mut pots = self.pots.write().await;
            match pots.get(&tx.pot) {
                Some(latest) if latest.version == current.version => {
                    let outcome = TransitionOutcome {
                        pot: tx.pot,
                        version: next.version,
                        state: next.pot.state(),
                        events,
                        total,
                    };
                    if current.pot.state() != outcome.state {
                        info!("pot {}: {} -> {}", tx.pot, current.pot.state(), outcome.state);
                    }
                    pots.insert(tx.pot, Arc::new(next));
                    info!(
                        "pot {} v{}: {} by {}",
                        tx.pot,
                        outcome.version,
                        tx.request.kind(),
                        tx.caller.short()
                    );
                    return Ok(outcome);
                }
                Some(_) => {
                    debug!("pot {}: version conflict (attempt {})", tx.pot, attempt + 1);
                }
                None => return Err(PotError::UnknownPot),
            }
        }

        warn!("pot {}: {} gave up after {} attempts", tx.pot, tx.request.kind(), self.cfg.max_cas_retries);
        Err(PotError::Contention)
    }

    pub async fn snapshot(&self, id: &PotId) -> PotResult<PotSnapshot> {
        let vp = self.current(id).await?;
        Ok(PotSnapshot {
            version: vp.version,
            health: assess(&vp.pot, (self.clock)()),
            pot: vp.pot.clone(),
        })
    }

    pub async fn events(&self, id: &PotId) -> PotResult<Vec<PotEvent>> {
        Ok(self.current(id).await?.events.clone())
    }

    pub async fn pot_ids(&self) -> Vec<PotId> {
        let mut ids: Vec<PotId> = self.pots.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Copy of every pot, for persistence.
    pub async fn export(&self) -> Vec<VersionedPot> {
        let pots = self.pots.read().await;
        let mut out: Vec<VersionedPot> = pots.values().map(|vp| (**vp).clone()).collect();
        out.sort_by_key(|vp| vp.pot.id);
        out
    }

    /// `proof::prove` on a blocking thread, bounded by `proof_timeout_ms`.
    pub async fn prove_bounded(&self, openings: Vec<Opening>, claimed_total: Amount) -> PotResult<Proof> {
        let task = tokio::task::spawn_blocking(move || proof::prove(&openings, claimed_total));
        match tokio::time::timeout(self.cfg.proof_timeout(), task).await {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => {
                warn!("prover task failed: {}", e);
                Err(PotError::MalformedProof("prover task failed"))
            }
            Err(_) => {
                warn!("proof generation exceeded {} ms", self.cfg.proof_timeout_ms);
                Err(PotError::Timeout)
            }
        }
    }

    /// `proof::verify` on a blocking thread, bounded by `proof_timeout_ms`.
    pub async fn verify_bounded(
        &self,
        proof: Proof,
        commitments: Vec<Commitment>,
        claimed_total: Amount,
    ) -> PotResult<bool> {
        let task = tokio::task::spawn_blocking(move || proof::verify(&proof, &commitments, claimed_total));
        match tokio::time::timeout(self.cfg.proof_timeout(), task).await {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => {
                warn!("verifier task failed: {}", e);
                Err(PotError::MalformedProof("verifier task failed"))
            }
            Err(_) => Err(PotError::Timeout),
        }
    }
}

fn transition(
    cfg: &EngineConfig,
    pot: &mut Pot,
    tx: &SignedTransition,
    ctx: &TxContext,
) -> PotResult<(Vec<PotEvent>, Option<Amount>)> {
    let caller = tx.caller;
    let events = match &tx.request {
        TransitionRequest::Join => pot.join(caller, ctx)?,
        TransitionRequest::Deposit { note } => pot.deposit(caller, note.clone(), ctx)?,
        TransitionRequest::SubmitProof { proof, claimed_total, commitments } => {
            pot.submit_proof(caller, proof.clone(), *claimed_total, commitments.clone(), ctx)?
        }
        TransitionRequest::RequestReveal { share } => pot.request_reveal(caller, share.clone(), ctx)?,
        TransitionRequest::RevealTotal => {
            let (out, events) = pot.reveal_total(caller, ctx)?;
            return Ok((events, Some(out.total)));
        }
        TransitionRequest::SetNickname { nickname } => {
            pot.set_nickname(caller, nickname.clone(), cfg.max_nickname_len)?;
            Vec::new()
        }
        TransitionRequest::IssueShare { member, index, digest } => {
            pot.issue_share(caller, *member, *index, *digest)?;
            Vec::new()
        }
    };
    Ok((events, None))
}
