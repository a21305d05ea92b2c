//! Protocol-level tests for private pots
//!
//! 1. Sum proofs: completeness and exact-total soundness (property based)
//! 2. Threshold shares: any qualifying subset reconstructs, fewer fail
//! 3. Pot lifecycle through the signed ledger

use proptest::collection::vec;
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use privpot::{
    combine, prove, split, verify, Amount, CreatePot, DepositNote, EngineConfig, MemberSecret,
    MemberWallet, Opening, PotError, PotLedger, PotParams, PotState, PrivacyMode,
    SignedTransition, TransitionRequest, NATIVE_TOKEN,
};

fn openings(amounts: &[Amount], salt: u8) -> Vec<Opening> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let mut seed = [salt; 32];
            seed[0] = i as u8;
            Opening::new(*a, &MemberSecret::from_bytes(seed))
        })
        .collect()
}

/// (secret, n, t, subset size, shuffle seed)
fn sharing(qualifying: bool) -> impl Strategy<Value = (Vec<u8>, usize, u8, usize, u64)> {
    (1usize..=8).prop_flat_map(move |n| {
        (1u8..=n as u8).prop_flat_map(move |t| {
            let k = if qualifying { (t as usize)..(n + 1) } else { 0..(t as usize) };
            (vec(any::<u8>(), 1..48), Just(n), Just(t), k, any::<u64>())
        })
    })
}

/* ===== 1. SUM PROOFS ===== */

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_valid_total_verifies(amounts in vec(1u128..=1_000_000_000_000_000_000_000, 1..8), salt in any::<u8>()) {
        let ops = openings(&amounts, salt);
        let total: Amount = amounts.iter().sum();
        let proof = prove(&ops, total).expect("prove");
        let cs: Vec<_> = ops.iter().map(Opening::commitment).collect();
        prop_assert!(verify(&proof, &cs, total).expect("verify"));
    }

    #[test]
    fn prop_wrong_total_is_rejected(amounts in vec(1u128..=1_000_000, 1..8), delta in 1u128..1_000) {
        let ops = openings(&amounts, 7);
        let total: Amount = amounts.iter().sum();
        prop_assert_eq!(prove(&ops, total + delta).unwrap_err(), PotError::TotalMismatch);
        if total > delta {
            prop_assert_eq!(prove(&ops, total - delta).unwrap_err(), PotError::TotalMismatch);
        }
    }
}

/* ===== 2. THRESHOLD SHARES ===== */

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_qualifying_subsets_reconstruct((secret, n, t, k, seed) in sharing(true)) {
        let (_, mut shares) = split(&secret, n, t).expect("split");
        shares.shuffle(&mut ChaCha20Rng::seed_from_u64(seed));
        let got = combine(&shares[..k], t).expect("combine");
        prop_assert_eq!(got.as_slice(), secret.as_slice());
    }

    #[test]
    fn prop_small_subsets_are_insufficient((secret, n, t, k, seed) in sharing(false)) {
        let (_, mut shares) = split(&secret, n, t).expect("split");
        shares.shuffle(&mut ChaCha20Rng::seed_from_u64(seed));
        let err = combine(&shares[..k], t).unwrap_err();
        prop_assert_eq!(err, PotError::InsufficientShares { have: k, need: t as usize });
    }
}

#[test]
fn test_duplicate_shares_do_not_count_twice() {
    let (_, shares) = split(b"reveal", 5, 3).expect("split");
    let dup = vec![shares[0].clone(), shares[0].clone(), shares[1].clone()];
    assert_eq!(
        combine(&dup, 3).unwrap_err(),
        PotError::InsufficientShares { have: 2, need: 3 }
    );
}

/* ===== 3. POT LIFECYCLE ===== */

struct Round {
    ledger: PotLedger,
    wallets: Vec<MemberWallet>,
    created: privpot::CreatedPot,
}

async fn round(n: usize, threshold: u8) -> Round {
    let ledger = PotLedger::new(EngineConfig::default()).expect("ledger");
    let wallets: Vec<MemberWallet> = (0..n).map(|_| MemberWallet::generate()).collect();
    let params = PotParams {
        name: "Integration pot".into(),
        token: NATIVE_TOKEN.into(),
        privacy_mode: PrivacyMode::CommitProve,
        threshold,
        members: wallets[1..].iter().map(MemberWallet::id).collect(),
    };
    let created = ledger
        .create_pot(CreatePot::sign(&wallets[0], params).expect("sign"))
        .await
        .expect("create pot");
    Round { ledger, wallets, created }
}

impl Round {
    async fn send(&self, who: usize, req: TransitionRequest) -> Result<privpot::TransitionOutcome, PotError> {
        let tx = SignedTransition::sign(&self.wallets[who], self.created.id, req).expect("sign");
        self.ledger.apply(tx).await
    }

    async fn deposit(&self, who: usize, amount: Amount) -> Result<Opening, PotError> {
        let id = self.created.id;
        let pk = *self.ledger.snapshot(&id).await?.pot.reveal_pk();
        let (note, opening) = DepositNote::prepare(amount, &self.wallets[who].member_secret(&id), &pk)?;
        self.send(who, TransitionRequest::Deposit { note }).await?;
        Ok(opening)
    }

    fn share(&self, who: usize) -> privpot::Share {
        let id = self.wallets[who].id();
        self.created.shares.iter().find(|(m, _)| *m == id).expect("share dealt").1.clone()
    }
}

#[tokio::test]
async fn test_end_to_end_three_members() {
    let r = round(3, 2).await;

    let oa = r.deposit(0, 100).await.expect("A deposits");
    let ob = r.deposit(1, 150).await.expect("B deposits");

    let proof = prove(&[oa, ob], 250).expect("prove");
    let commitments = r.ledger.snapshot(&r.created.id).await.unwrap().pot.commitments();
    assert!(verify(&proof, &commitments, 250).unwrap());
    let req = TransitionRequest::SubmitProof { proof, claimed_total: 250, commitments };
    r.send(0, req).await.expect("submit proof");

    let out = r.send(0, TransitionRequest::RequestReveal { share: r.share(0) }).await.unwrap();
    assert_eq!(out.state, PotState::Open);
    let out = r.send(1, TransitionRequest::RequestReveal { share: r.share(1) }).await.unwrap();
    assert_eq!(out.state, PotState::ThresholdMet);

    let out = r.send(0, TransitionRequest::RevealTotal).await.expect("reveal");
    assert_eq!(out.total, Some(250));
    assert_eq!(out.state, PotState::Revealed);

    assert_eq!(r.deposit(2, 5).await.unwrap_err(), PotError::PotClosed);
}

#[tokio::test]
async fn test_three_of_five_threshold_timing() {
    let r = round(5, 3).await;
    for i in 0..5 {
        r.deposit(i, 10).await.unwrap();
    }

    for (i, expected) in [(4, PotState::Open), (2, PotState::Open), (0, PotState::ThresholdMet)] {
        let out = r.send(i, TransitionRequest::RequestReveal { share: r.share(i) }).await.unwrap();
        assert_eq!(out.state, expected);
    }
    // Further shares keep the pot in ThresholdMet until an explicit reveal.
    let out = r.send(1, TransitionRequest::RequestReveal { share: r.share(1) }).await.unwrap();
    assert_eq!(out.state, PotState::ThresholdMet);
    assert!(r.ledger.snapshot(&r.created.id).await.unwrap().pot.revealed().is_none());

    let out = r.send(3, TransitionRequest::RevealTotal).await.unwrap();
    assert_eq!(out.total, Some(50));
}

#[tokio::test]
async fn test_verification_has_no_side_effects() {
    let r = round(2, 2).await;
    let oa = r.deposit(0, 3).await.unwrap();
    let ob = r.deposit(1, 4).await.unwrap();
    let proof = r.ledger.prove_bounded(vec![oa, ob], 7).await.unwrap();
    let before = r.ledger.snapshot(&r.created.id).await.unwrap();
    let cs = before.pot.commitments();

    assert!(r.ledger.verify_bounded(proof.clone(), cs.clone(), 7).await.unwrap());
    assert!(r.ledger.verify_bounded(proof, cs, 7).await.unwrap());
    assert_eq!(r.ledger.snapshot(&r.created.id).await.unwrap().version, before.version);
}

#[tokio::test]
async fn test_rejections_leave_version_untouched() {
    let r = round(3, 2).await;
    r.deposit(0, 1).await.unwrap();
    let v = r.ledger.snapshot(&r.created.id).await.unwrap().version;

    assert_eq!(r.send(0, TransitionRequest::Join).await.unwrap_err(), PotError::AlreadyMember);
    assert_eq!(r.deposit(0, 2).await.unwrap_err(), PotError::DuplicateNullifier);
    assert!(matches!(
        r.send(1, TransitionRequest::RequestReveal { share: r.share(0) }).await,
        Err(PotError::InvalidShare(_))
    ));
    assert!(matches!(
        r.send(0, TransitionRequest::RevealTotal).await,
        Err(PotError::ThresholdNotMet { collected: 0, threshold: 2 })
    ));
    assert_eq!(r.ledger.snapshot(&r.created.id).await.unwrap().version, v);
}
