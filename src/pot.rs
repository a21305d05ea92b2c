#![forbid(unsafe_code)]

//! Private savings pot: aggregate state and lifecycle
//!
//! Created → Open → ThresholdMet → Revealed
//!
//! Deposits never carry a cleartext amount. Each one holds a Pedersen
//! commitment, the member's nullifier and an opening sealed to the pot's
//! X25519 reveal key. The reveal private key is Shamir-shared among the
//! members; once T shares are collected the key is rebuilt, every sealed
//! opening is checked against its commitment and only the sum is published.
//!
//! Every transition validates first and mutates last: an `Err` leaves the
//! pot untouched.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::commitment::{commit, Commitment, MemberSecret, Nullifier, Opening};
use crate::config::EngineConfig;
use crate::core::{day_of, Amount, Hash32, MemberId, PotId};
use crate::error::{PotError, PotResult};
use crate::proof::{self, Proof};
use crate::seal::{seal_opening, unseal_opening, SealedOpening};
use crate::shares::{DealerBackup, Share, ShareDealer, ShareScheme, MAX_SHARES};

/// Token identifier of the chain's native asset.
pub const NATIVE_TOKEN: &str = "0x0000000000000000000000000000000000000000";

/// Largest amount a single deposit may hold. With at most 255 members the
/// revealed sum cannot overflow `Amount`.
pub const MAX_DEPOSIT: Amount = 1 << 96;

/* ============================================================================
 * Types
 * ========================================================================== */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PotState {
    Created,
    Open,
    ThresholdMet,
    Revealed,
}

impl PotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PotState::Created => "created",
            PotState::Open => "open",
            PotState::ThresholdMet => "threshold-met",
            PotState::Revealed => "revealed",
        }
    }
}

impl std::fmt::Display for PotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivacyMode {
    /// Pedersen commitments plus aggregate sum proofs.
    CommitProve,
}

impl PrivacyMode {
    pub fn code(self) -> u8 {
        match self {
            PrivacyMode::CommitProve => 1,
        }
    }

    pub fn from_code(code: u8) -> PotResult<Self> {
        match code {
            1 => Ok(PrivacyMode::CommitProve),
            other => Err(PotError::InvalidConfig(format!("unknown privacy mode {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub joined_at: u64,
    pub nickname: Option<String>,
    /// Consecutive active days.
    pub streak: u32,
    last_active_day: Option<u64>,
}

impl Member {
    fn new(id: MemberId, joined_at: u64) -> Self {
        Self { id, joined_at, nickname: None, streak: 0, last_active_day: None }
    }

    fn touch(&mut self, now: u64) {
        let today = day_of(now);
        self.streak = match self.last_active_day {
            Some(d) if d == today => self.streak.max(1),
            Some(d) if d + 1 == today => self.streak.saturating_add(1),
            _ => 1,
        };
        self.last_active_day = Some(today);
    }

    pub fn display_name(&self) -> String {
        self.nickname.clone().unwrap_or_else(|| self.id.short())
    }
}

/// What a member submits to deposit: the commitment, its nullifier and the
/// opening sealed to the pot's reveal key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositNote {
    pub commitment: Commitment,
    pub nullifier: Nullifier,
    pub sealed: SealedOpening,
}

impl DepositNote {
    /// Client side: commit to `amount` and seal the opening to `reveal_pk`.
    pub fn prepare(
        amount: Amount,
        secret: &MemberSecret,
        reveal_pk: &[u8; 32],
    ) -> PotResult<(Self, Opening)> {
        if amount > MAX_DEPOSIT {
            return Err(PotError::InvalidAmount);
        }
        let (commitment, nullifier) = commit(amount, secret)?;
        let opening = Opening::new(amount, secret);
        let sealed = seal_opening(&opening, &commitment, reveal_pk)?;
        Ok((Self { commitment, nullifier, sealed }, opening))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub member: MemberId,
    pub note: DepositNote,
    pub deposited_at: u64,
}

/// A verified aggregate proof. Only proofs that verify are stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub submitter: MemberId,
    pub claimed_total: Amount,
    pub proof: Proof,
    pub commitments: Vec<Commitment>,
    pub valid: bool,
    pub submitted_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedTotal {
    pub total: Amount,
    /// Deposits whose sealed opening matched its commitment.
    pub counted: usize,
    /// Members whose sealed opening did not open; excluded from `total`.
    pub unopened: Vec<MemberId>,
    /// Whether the stored proof covers exactly the counted deposits and
    /// claims the same total. `None` when no proof was submitted or it
    /// covers a different set.
    pub proof_agrees: Option<bool>,
    pub revealed_by: MemberId,
    pub revealed_at: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Joined,
    Committed,
    ProofSubmitted,
    RevealRequested,
    TotalRevealed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub member: MemberId,
    pub at: u64,
    pub external_ref: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotEvent {
    PotCreated { pot: PotId, owner: MemberId, threshold: u8 },
    MemberJoined { pot: PotId, member: MemberId },
    Committed { pot: PotId, member: MemberId, commitment: Commitment },
    ProofSubmitted { pot: PotId, member: MemberId, claimed_total: Amount },
    RevealRequested { pot: PotId, member: MemberId, collected: usize },
    TotalRevealed { pot: PotId, total: Amount },
}

/// Per-transition context supplied by the ledger.
#[derive(Clone, Debug, Default)]
pub struct TxContext {
    pub now: u64,
    /// Hex digest of the originating request, copied into the activity log.
    pub external_ref: Option<String>,
}

impl TxContext {
    pub fn at(now: u64) -> Self {
        Self { now, external_ref: None }
    }
}

/// Creation parameters; the owner is always a member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotParams {
    pub name: String,
    pub token: String,
    pub privacy_mode: PrivacyMode,
    pub threshold: u8,
    pub members: Vec<MemberId>,
}

/// Result of the reveal: the aggregate and the reconstructed reveal secret.
pub struct RevealOutcome {
    pub total: Amount,
    pub secret: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for RevealOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealOutcome").field("total", &self.total).finish_non_exhaustive()
    }
}

/* ============================================================================
 * Reveal dealer (held by the owner, off-ledger)
 * ========================================================================== */

/// Share dealer for one pot's reveal key.
pub struct RevealDealer {
    pot: PotId,
    dealer: ShareDealer,
}

impl RevealDealer {
    pub fn pot(&self) -> PotId {
        self.pot
    }

    pub fn scheme(&self) -> &ShareScheme {
        self.dealer.scheme()
    }

    /// Next share for `pot`, at the index the pot expects.
    pub fn next_share(&self, pot: &Pot) -> PotResult<Share> {
        if pot.id != self.pot || pot.scheme != *self.dealer.scheme() {
            return Err(PotError::InvalidShare("dealer belongs to another pot"));
        }
        let index = u8::try_from(pot.next_share_index)
            .map_err(|_| PotError::InvalidConfig("share indices exhausted".into()))?;
        self.dealer.share_at(index)
    }

    pub fn backup(&self) -> DealerBackup {
        self.dealer.backup()
    }

    pub fn restore(pot: PotId, backup: &DealerBackup) -> PotResult<Self> {
        if backup.context != pot.as_bytes() {
            return Err(PotError::InvalidConfig("dealer backup is for another pot".into()));
        }
        Ok(Self { pot, dealer: ShareDealer::restore(backup)? })
    }
}

impl std::fmt::Debug for RevealDealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealDealer").field("pot", &self.pot).finish_non_exhaustive()
    }
}

/// Everything produced by `Pot::create`.
#[derive(Debug)]
pub struct PotGenesis {
    pub pot: Pot,
    pub dealer: RevealDealer,
    /// One share per initial member, in member order.
    pub shares: Vec<(MemberId, Share)>,
    pub events: Vec<PotEvent>,
}

/* ============================================================================
 * Pot
 * ========================================================================== */

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pot {
    pub id: PotId,
    pub name: String,
    pub owner: MemberId,
    pub token: String,
    pub privacy_mode: PrivacyMode,
    pub threshold: u8,
    pub created_at: u64,
    state: PotState,
    members: Vec<Member>,
    deposits: Vec<Deposit>,
    nullifiers: BTreeSet<Nullifier>,
    issued_shares: BTreeMap<MemberId, Hash32>,
    next_share_index: u16,
    reveal_shares: BTreeMap<MemberId, Share>,
    scheme: ShareScheme,
    reveal_pk: [u8; 32],
    proof: Option<ProofRecord>,
    proofs_submitted: u32,
    revealed: Option<RevealedTotal>,
    activity: Vec<Activity>,
}

fn validate_params(cfg: &EngineConfig, owner: &MemberId, params: &PotParams) -> PotResult<Vec<MemberId>> {
    let name = params.name.trim();
    if name.is_empty() || name.chars().count() > cfg.max_name_len {
        return Err(PotError::InvalidConfig(format!(
            "pot name must be 1..={} characters",
            cfg.max_name_len
        )));
    }
    if params.token.trim().is_empty() {
        return Err(PotError::InvalidConfig("token identifier is empty".into()));
    }

    let mut members = vec![*owner];
    for m in &params.members {
        if m == owner {
            continue;
        }
        if members.contains(m) {
            return Err(PotError::AlreadyMember);
        }
        members.push(*m);
    }
    if members.len() > MAX_SHARES {
        return Err(PotError::InvalidConfig(format!("at most {MAX_SHARES} members")));
    }

    let t = params.threshold;
    if t == 0 || t > cfg.max_threshold || t as usize > members.len() {
        return Err(PotError::InvalidConfig(format!(
            "threshold must satisfy 1 <= T <= min({}, members={})",
            cfg.max_threshold,
            members.len()
        )));
    }
    Ok(members)
}

impl Pot {
    /// Create a pot, generate its reveal key and deal one share to every
    /// initial member. The pot is returned `Open`.
    pub fn create(
        cfg: &EngineConfig,
        owner: MemberId,
        params: PotParams,
        ctx: &TxContext,
    ) -> PotResult<PotGenesis> {
        let members = validate_params(cfg, &owner, &params)?;
        let name = params.name.trim().to_string();

        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);
        let id = PotId::derive(&owner, &name, ctx.now, &nonce);

        let reveal_sk = StaticSecret::random_from_rng(OsRng);
        let reveal_pk = PublicKey::from(&reveal_sk).to_bytes();
        let sk_bytes = Zeroizing::new(reveal_sk.to_bytes());
        let dealer = ShareDealer::new(id.as_bytes(), sk_bytes.as_ref(), params.threshold)?;
        let dealt = dealer.deal(members.len())?;

        let shares: Vec<(MemberId, Share)> = members.iter().copied().zip(dealt).collect();
        let issued_shares = shares.iter().map(|(m, s)| (*m, s.digest())).collect();

        let mut pot = Pot {
            id,
            name,
            owner,
            token: params.token.trim().to_string(),
            privacy_mode: params.privacy_mode,
            threshold: params.threshold,
            created_at: ctx.now,
            state: PotState::Created,
            members: members.iter().map(|m| Member::new(*m, ctx.now)).collect(),
            deposits: Vec::new(),
            nullifiers: BTreeSet::new(),
            issued_shares,
            next_share_index: members.len() as u16 + 1,
            reveal_shares: BTreeMap::new(),
            scheme: dealer.scheme().clone(),
            reveal_pk,
            proof: None,
            proofs_submitted: 0,
            revealed: None,
            activity: Vec::new(),
        };

        let mut events = vec![PotEvent::PotCreated { pot: id, owner, threshold: pot.threshold }];
        for m in &members {
            pot.log(ActivityKind::Joined, *m, ctx);
            events.push(PotEvent::MemberJoined { pot: id, member: *m });
        }
        pot.state = PotState::Open;

        Ok(PotGenesis { pot, dealer: RevealDealer { pot: id, dealer }, shares, events })
    }

    /* ---------- accessors ---------- */

    pub fn state(&self) -> PotState {
        self.state
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    pub fn is_member(&self, id: &MemberId) -> bool {
        self.member(id).is_some()
    }

    pub fn deposits(&self) -> &[Deposit] {
        &self.deposits
    }

    pub fn deposit_of(&self, id: &MemberId) -> Option<&Deposit> {
        self.deposits.iter().find(|d| &d.member == id)
    }

    /// Commitments on record, in deposit order.
    pub fn commitments(&self) -> Vec<Commitment> {
        self.deposits.iter().map(|d| d.note.commitment).collect()
    }

    pub fn has_nullifier(&self, n: &Nullifier) -> bool {
        self.nullifiers.contains(n)
    }

    pub fn reveal_pk(&self) -> &[u8; 32] {
        &self.reveal_pk
    }

    pub fn scheme(&self) -> &ShareScheme {
        &self.scheme
    }

    pub fn issued_share_digest(&self, id: &MemberId) -> Option<&Hash32> {
        self.issued_shares.get(id)
    }

    pub fn next_share_index(&self) -> u16 {
        self.next_share_index
    }

    pub fn collected_shares(&self) -> usize {
        self.reveal_shares.len()
    }

    pub fn has_requested_reveal(&self, id: &MemberId) -> bool {
        self.reveal_shares.contains_key(id)
    }

    pub fn proof(&self) -> Option<&ProofRecord> {
        self.proof.as_ref()
    }

    pub fn proofs_submitted(&self) -> u32 {
        self.proofs_submitted
    }

    pub fn revealed(&self) -> Option<&RevealedTotal> {
        self.revealed.as_ref()
    }

    pub fn activity(&self) -> &[Activity] {
        &self.activity
    }

    /* ---------- internal helpers ---------- */

    fn log(&mut self, kind: ActivityKind, member: MemberId, ctx: &TxContext) {
        self.activity.push(Activity {
            kind,
            member,
            at: ctx.now,
            external_ref: ctx.external_ref.clone(),
        });
    }

    fn member_mut(&mut self, id: &MemberId) -> PotResult<&mut Member> {
        self.members.iter_mut().find(|m| &m.id == id).ok_or(PotError::NotAMember)
    }

    fn require_member(&self, id: &MemberId) -> PotResult<()> {
        if self.is_member(id) {
            Ok(())
        } else {
            Err(PotError::NotAMember)
        }
    }

    fn require_open(&self) -> PotResult<()> {
        match self.state {
            PotState::Open => Ok(()),
            _ => Err(PotError::PotClosed),
        }
    }

    /* ---------- transitions ---------- */

    pub fn join(&mut self, member: MemberId, ctx: &TxContext) -> PotResult<Vec<PotEvent>> {
        self.require_open()?;
        if self.is_member(&member) {
            return Err(PotError::AlreadyMember);
        }
        if self.members.len() >= MAX_SHARES {
            return Err(PotError::InvalidConfig(format!("at most {MAX_SHARES} members")));
        }

        self.members.push(Member::new(member, ctx.now));
        self.log(ActivityKind::Joined, member, ctx);
        Ok(vec![PotEvent::MemberJoined { pot: self.id, member }])
    }

    pub fn deposit(
        &mut self,
        member: MemberId,
        note: DepositNote,
        ctx: &TxContext,
    ) -> PotResult<Vec<PotEvent>> {
        self.require_open()?;
        self.require_member(&member)?;
        if self.nullifiers.contains(&note.nullifier) || self.deposit_of(&member).is_some() {
            return Err(PotError::DuplicateNullifier);
        }
        // Commitment must be a valid group element to take part in sums.
        if note.commitment.decompress().is_none() {
            return Err(PotError::InvalidAmount);
        }

        let commitment = note.commitment;
        self.nullifiers.insert(note.nullifier);
        self.deposits.push(Deposit { member, note, deposited_at: ctx.now });
        self.member_mut(&member)?.touch(ctx.now);
        self.log(ActivityKind::Committed, member, ctx);
        Ok(vec![PotEvent::Committed { pot: self.id, member, commitment }])
    }

    /// Verify and store an aggregate proof over commitments on record.
    pub fn submit_proof(
        &mut self,
        member: MemberId,
        proof: Proof,
        claimed_total: Amount,
        commitments: Vec<Commitment>,
        ctx: &TxContext,
    ) -> PotResult<Vec<PotEvent>> {
        self.require_open()?;
        self.require_member(&member)?;
        if commitments.is_empty() {
            return Err(PotError::ProofMismatch);
        }
        let on_record: BTreeSet<[u8; 32]> = self.deposits.iter().map(|d| d.note.commitment.0).collect();
        let mut seen = BTreeSet::new();
        for c in &commitments {
            if !on_record.contains(&c.0) || !seen.insert(c.0) {
                return Err(PotError::ProofMismatch);
            }
        }
        if !proof::verify(&proof, &commitments, claimed_total)? {
            return Err(PotError::ProofMismatch);
        }

        self.proof = Some(ProofRecord {
            submitter: member,
            claimed_total,
            proof,
            commitments,
            valid: true,
            submitted_at: ctx.now,
        });
        self.proofs_submitted = self.proofs_submitted.saturating_add(1);
        self.member_mut(&member)?.touch(ctx.now);
        self.log(ActivityKind::ProofSubmitted, member, ctx);
        Ok(vec![PotEvent::ProofSubmitted { pot: self.id, member, claimed_total }])
    }

    /// Accept `member`'s reveal share. Moves `Open → ThresholdMet` once T
    /// shares are collected.
    pub fn request_reveal(
        &mut self,
        member: MemberId,
        share: Share,
        ctx: &TxContext,
    ) -> PotResult<Vec<PotEvent>> {
        if !matches!(self.state, PotState::Open | PotState::ThresholdMet) {
            return Err(PotError::PotClosed);
        }
        self.require_member(&member)?;
        if self.reveal_shares.contains_key(&member) {
            return Err(PotError::DuplicateNullifier);
        }
        let issued = self
            .issued_shares
            .get(&member)
            .ok_or(PotError::InvalidShare("no share issued to caller"))?;
        if share.scheme_id != self.scheme.id {
            return Err(PotError::InvalidShare("share belongs to another scheme"));
        }
        if !share.check_integrity() {
            return Err(PotError::InvalidShare("integrity tag mismatch"));
        }
        if &share.digest() != issued {
            return Err(PotError::InvalidShare("share was not issued to caller"));
        }

        self.reveal_shares.insert(member, share);
        self.member_mut(&member)?.touch(ctx.now);
        self.log(ActivityKind::RevealRequested, member, ctx);
        let collected = self.reveal_shares.len();
        if self.state == PotState::Open && collected >= self.threshold as usize {
            self.state = PotState::ThresholdMet;
        }
        Ok(vec![PotEvent::RevealRequested { pot: self.id, member, collected }])
    }

    /// Rebuild the reveal key, open every sealed deposit and publish the sum.
    pub fn reveal_total(
        &mut self,
        caller: MemberId,
        ctx: &TxContext,
    ) -> PotResult<(RevealOutcome, Vec<PotEvent>)> {
        match self.state {
            PotState::ThresholdMet => {}
            PotState::Open => {
                return Err(PotError::ThresholdNotMet {
                    collected: self.reveal_shares.len(),
                    threshold: usize::from(self.threshold),
                })
            }
            PotState::Created | PotState::Revealed => return Err(PotError::PotClosed),
        }
        self.require_member(&caller)?;

        let shares: Vec<Share> = self.reveal_shares.values().cloned().collect();
        let secret = self.scheme.reconstruct(&shares)?;
        let sk_bytes: Zeroizing<[u8; 32]> = Zeroizing::new(
            secret
                .as_slice()
                .try_into()
                .map_err(|_| PotError::InvalidShare("reconstructed key has wrong length"))?,
        );
        let reveal_sk = StaticSecret::from(*sk_bytes);
        if PublicKey::from(&reveal_sk).to_bytes() != self.reveal_pk {
            return Err(PotError::InvalidShare("reconstructed key does not match reveal key"));
        }

        let mut total: Amount = 0;
        let mut counted = Vec::new();
        let mut unopened = Vec::new();
        for d in &self.deposits {
            match unseal_opening(&d.note.sealed, &d.note.commitment, &reveal_sk) {
                Ok(opening) if opening.amount <= MAX_DEPOSIT && opening.opens(&d.note.commitment) => {
                    match total.checked_add(opening.amount) {
                        Some(sum) => {
                            total = sum;
                            counted.push(d.note.commitment.0);
                        }
                        None => unopened.push(d.member),
                    }
                }
                _ => unopened.push(d.member),
            }
        }

        let proof_agrees = self.proof.as_ref().and_then(|p| {
            let covered: BTreeSet<[u8; 32]> = p.commitments.iter().map(|c| c.0).collect();
            let opened: BTreeSet<[u8; 32]> = counted.iter().copied().collect();
            (covered == opened).then_some(p.claimed_total == total)
        });

        self.revealed = Some(RevealedTotal {
            total,
            counted: counted.len(),
            unopened,
            proof_agrees,
            revealed_by: caller,
            revealed_at: ctx.now,
        });
        self.state = PotState::Revealed;
        self.log(ActivityKind::TotalRevealed, caller, ctx);
        Ok((
            RevealOutcome { total, secret },
            vec![PotEvent::TotalRevealed { pot: self.id, total }],
        ))
    }

    /// Set or clear a member's nickname. Allowed in every state.
    pub fn set_nickname(
        &mut self,
        member: MemberId,
        nickname: Option<String>,
        max_len: usize,
    ) -> PotResult<()> {
        let nickname = nickname.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if let Some(n) = &nickname {
            if n.chars().count() > max_len {
                return Err(PotError::InvalidConfig(format!(
                    "nickname must be at most {max_len} characters"
                )));
            }
        }
        self.member_mut(&member)?.nickname = nickname;
        Ok(())
    }

    /// Register the digest of a share the owner dealt to `member` at the
    /// pot's next share index.
    pub fn issue_share(
        &mut self,
        caller: MemberId,
        member: MemberId,
        index: u8,
        digest: Hash32,
    ) -> PotResult<()> {
        if caller != self.owner {
            return Err(PotError::NotOwner);
        }
        self.require_open()?;
        self.require_member(&member)?;
        if self.issued_shares.contains_key(&member) {
            return Err(PotError::DuplicateNullifier);
        }
        if u16::from(index) != self.next_share_index {
            return Err(PotError::InvalidShare("unexpected share index"));
        }

        self.issued_shares.insert(member, digest);
        self.next_share_index += 1;
        Ok(())
    }

    /// Whole days since creation, counting the creation day.
    pub fn days_active(&self, now: u64) -> u64 {
        day_of(now).saturating_sub(day_of(self.created_at)) + 1
    }
}
