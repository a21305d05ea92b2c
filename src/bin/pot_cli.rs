//! PRIVPOT CLI - private savings pots on a local JSON ledger

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, ensure, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use privpot::core::{format_amount, parse_amount, MemberId, PotId};
use privpot::ledger::{CreatePot, PotLedger, SignedTransition, TransitionRequest};
use privpot::pot::{DepositNote, PotParams, PrivacyMode, RevealDealer, NATIVE_TOKEN};
use privpot::shares::Share;
use privpot::store::{read_json, write_json, LedgerStore, OwnerVault};
use privpot::{EngineConfig, MemberWallet, Opening};

#[derive(Parser, Debug)]
#[command(name = "pot_cli", version, author)]
#[command(about = "Private group savings pots: commit, prove, reveal")]
struct Cli {
    /// Ledger snapshot file
    #[arg(long, global = true, default_value = "./pot_ledger.json")]
    ledger: PathBuf,

    /// Engine config (JSON); defaults apply when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a new member wallet
    Keygen {
        #[arg(long)]
        out: PathBuf,
    },
    /// Create a pot; the owner's dealer material goes to --vault
    Create {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        threshold: u8,
        /// Member id (hex); repeat for each member
        #[arg(long = "member")]
        members: Vec<String>,
        #[arg(long, default_value = NATIVE_TOKEN)]
        token: String,
        #[arg(long)]
        vault: PathBuf,
    },
    Join {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        pot: String,
    },
    /// Commit a private deposit
    Deposit {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        pot: String,
        /// Decimal amount, e.g. 1.5
        #[arg(long)]
        amount: String,
    },
    /// Prove the total of the given members' deposits and submit it
    Prove {
        /// Submitting wallet
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        pot: String,
        /// wallet_path=amount; repeat for each covered deposit
        #[arg(long = "deposit")]
        deposits: Vec<String>,
    },
    /// Owner: issue a reveal share to a member who joined later
    IssueShare {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        vault: PathBuf,
        #[arg(long)]
        member: String,
    },
    /// Owner: write one member's share to a file
    ExportShare {
        #[arg(long)]
        vault: PathBuf,
        #[arg(long)]
        member: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Submit a reveal share
    Share {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        pot: String,
        #[arg(long)]
        share: PathBuf,
    },
    /// Reveal the total once the threshold is met
    Reveal {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        pot: String,
    },
    /// Set or clear a nickname
    Nickname {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        pot: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a pot snapshot with its health
    Show {
        #[arg(long)]
        pot: Option<String>,
    },
    /// Run a full three-member round in memory
    Demo,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load(p),
        None => Ok(EngineConfig::default()),
    }
}

fn pot_id(s: &str) -> Result<PotId> {
    s.parse::<PotId>().map_err(|e| anyhow!("invalid pot id {s}: {e}"))
}

fn member_id(s: &str) -> Result<MemberId> {
    s.parse::<MemberId>().map_err(|e| anyhow!("invalid member id {s}: {e}"))
}

async fn submit(ledger: &PotLedger, wallet: &MemberWallet, pot: PotId, req: TransitionRequest) -> Result<()> {
    let out = ledger.apply(SignedTransition::sign(wallet, pot, req)?).await?;
    println!("✅ pot {} v{} state={}", out.pot, out.version, out.state);
    for ev in &out.events {
        println!("   event: {}", serde_json::to_string(ev)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    let store = LedgerStore::new(&cli.ledger);

    match cli.cmd {
        Cmd::Keygen { out } => {
            let w = MemberWallet::generate();
            w.save(&out)?;
            println!("🔑 member id: {}", w.id());
            println!("📁 wallet: {}", out.display());
        }

        Cmd::Create { wallet, name, threshold, members, token, vault } => {
            let ledger = store.open(cfg)?;
            let owner = MemberWallet::open(&wallet)?;
            let members = members.iter().map(|m| member_id(m)).collect::<Result<Vec<_>>>()?;
            let params = PotParams { name, token, privacy_mode: PrivacyMode::CommitProve, threshold, members };
            let created = ledger.create_pot(CreatePot::sign(&owner, params)?).await?;

            OwnerVault { pot: created.id, dealer: created.dealer.backup(), shares: created.shares.clone() }
                .save(&vault)?;
            store.save(&ledger).await?;
            println!("🏦 pot created: {}", created.id);
            println!("   members: {}, threshold: {}", created.shares.len(), threshold);
            println!("   owner vault: {}", vault.display());
        }

        Cmd::Join { wallet, pot } => {
            let ledger = store.open(cfg)?;
            let w = MemberWallet::open(&wallet)?;
            submit(&ledger, &w, pot_id(&pot)?, TransitionRequest::Join).await?;
            store.save(&ledger).await?;
        }

        Cmd::Deposit { wallet, pot, amount } => {
            let ledger = store.open(cfg)?;
            let w = MemberWallet::open(&wallet)?;
            let id = pot_id(&pot)?;
            let amount = parse_amount(&amount, ledger.config().decimals)?;
            let snap = ledger.snapshot(&id).await?;
            let (note, _) = DepositNote::prepare(amount, &w.member_secret(&id), snap.pot.reveal_pk())?;
            println!("🔒 commitment: {}", hex::encode(note.commitment.as_bytes()));
            submit(&ledger, &w, id, TransitionRequest::Deposit { note }).await?;
            store.save(&ledger).await?;
        }

        Cmd::Prove { wallet, pot, deposits } => {
            ensure!(!deposits.is_empty(), "at least one --deposit wallet=amount is required");
            let ledger = store.open(cfg)?;
            let w = MemberWallet::open(&wallet)?;
            let id = pot_id(&pot)?;
            let decimals = ledger.config().decimals;

            let mut openings = Vec::with_capacity(deposits.len());
            for d in &deposits {
                let (path, amount) = d
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--deposit must be wallet_path=amount, got {d}"))?;
                let owner = MemberWallet::open(path)?;
                openings.push(Opening::new(parse_amount(amount, decimals)?, &owner.member_secret(&id)));
            }
            let commitments = openings.iter().map(Opening::commitment).collect::<Vec<_>>();
            let claimed_total = openings.iter().try_fold(0u128, |acc, o| acc.checked_add(o.amount))
                .ok_or_else(|| anyhow!("amount overflow"))?;
            let proof = ledger.prove_bounded(openings, claimed_total).await?;
            println!("🧾 proof: {} bytes, total {}", proof.as_bytes().len(), format_amount(claimed_total, decimals));
            let req = TransitionRequest::SubmitProof { proof, claimed_total, commitments };
            submit(&ledger, &w, id, req).await?;
            store.save(&ledger).await?;
        }

        Cmd::IssueShare { wallet, vault, member } => {
            let ledger = store.open(cfg)?;
            let owner = MemberWallet::open(&wallet)?;
            let mut v = OwnerVault::open(&vault)?;
            let member = member_id(&member)?;
            let dealer = RevealDealer::restore(v.pot, &v.dealer)?;
            let pot = ledger.snapshot(&v.pot).await?.pot;
            let share = dealer.next_share(&pot)?;

            let req = TransitionRequest::IssueShare { member, index: share.index, digest: share.digest() };
            submit(&ledger, &owner, v.pot, req).await?;
            v.shares.push((member, share));
            v.save(&vault)?;
            store.save(&ledger).await?;
        }

        Cmd::ExportShare { vault, member, out } => {
            let v = OwnerVault::open(&vault)?;
            let member = member_id(&member)?;
            let share = v.share_for(&member).ok_or_else(|| anyhow!("no share for {member}"))?;
            write_json(&out, share)?;
            println!("📤 share #{} for {} written to {}", share.index, member.short(), out.display());
        }

        Cmd::Share { wallet, pot, share } => {
            let ledger = store.open(cfg)?;
            let w = MemberWallet::open(&wallet)?;
            let share: Share = read_json(&share)?;
            submit(&ledger, &w, pot_id(&pot)?, TransitionRequest::RequestReveal { share }).await?;
            store.save(&ledger).await?;
        }

        Cmd::Reveal { wallet, pot } => {
            let ledger = store.open(cfg)?;
            let w = MemberWallet::open(&wallet)?;
            let id = pot_id(&pot)?;
            let out = ledger.apply(SignedTransition::sign(&w, id, TransitionRequest::RevealTotal)?).await?;
            store.save(&ledger).await?;
            let total = out.total.context("reveal produced no total")?;
            println!("🎉 total revealed: {}", format_amount(total, ledger.config().decimals));
            if let Some(r) = ledger.snapshot(&id).await?.pot.revealed() {
                if !r.unopened.is_empty() {
                    println!("⚠️  {} deposit(s) could not be opened and were excluded", r.unopened.len());
                }
                match r.proof_agrees {
                    Some(true) => println!("   submitted proof agrees"),
                    Some(false) => println!("⚠️  submitted proof claims a different total"),
                    None => println!("   no proof covers the revealed deposits"),
                }
            }
        }

        Cmd::Nickname { wallet, pot, name } => {
            let ledger = store.open(cfg)?;
            let w = MemberWallet::open(&wallet)?;
            submit(&ledger, &w, pot_id(&pot)?, TransitionRequest::SetNickname { nickname: name }).await?;
            store.save(&ledger).await?;
        }

        Cmd::Show { pot } => {
            let ledger = store.open(cfg)?;
            let ids = match pot {
                Some(p) => vec![pot_id(&p)?],
                None => ledger.pot_ids().await,
            };
            if ids.is_empty() {
                println!("no pots in {}", store.path().display());
            }
            for id in ids {
                let snap = ledger.snapshot(&id).await?;
                let p = &snap.pot;
                println!("🏦 {} \"{}\" [{}] v{}", p.id, p.name, p.state(), snap.version);
                println!("   owner: {}  threshold: {}/{}", p.owner.short(), p.threshold, p.members().len());
                println!("   deposits: {}  proofs: {}  shares: {}", p.deposits().len(), p.proofs_submitted(), p.collected_shares());
                println!("   health: {} ({}), cadence {}, {} day(s) active",
                    snap.health.score, snap.health.label, snap.health.cadence, snap.health.days_active);
                for m in p.members() {
                    println!("   - {} streak {}", m.display_name(), m.streak);
                }
                if let Some(r) = p.revealed() {
                    println!("   total: {}", format_amount(r.total, ledger.config().decimals));
                }
            }
        }

        Cmd::Demo => demo(cfg).await?,
    }

    Ok(())
}

async fn demo(cfg: EngineConfig) -> Result<()> {
    let ledger = PotLedger::new(cfg)?;
    let decimals = ledger.config().decimals;
    let (a, b, c) = (MemberWallet::generate(), MemberWallet::generate(), MemberWallet::generate());

    let params = PotParams {
        name: "Weekend trip".into(),
        token: NATIVE_TOKEN.into(),
        privacy_mode: PrivacyMode::CommitProve,
        threshold: 2,
        members: vec![b.id(), c.id()],
    };
    let created = ledger.create_pot(CreatePot::sign(&a, params)?).await?;
    let id = created.id;
    println!("🏦 pot {id}: members A, B, C, threshold 2");

    let reveal_pk = *ledger.snapshot(&id).await?.pot.reveal_pk();
    let mut openings = Vec::new();
    for (w, amt) in [(&a, "100"), (&b, "150")] {
        let amount = parse_amount(amt, decimals)?;
        let (note, opening) = DepositNote::prepare(amount, &w.member_secret(&id), &reveal_pk)?;
        submit(&ledger, w, id, TransitionRequest::Deposit { note }).await?;
        openings.push(opening);
    }

    let claimed_total = parse_amount("250", decimals)?;
    let commitments = ledger.snapshot(&id).await?.pot.commitments();
    let proof = ledger.prove_bounded(openings, claimed_total).await?;
    ensure!(ledger.verify_bounded(proof.clone(), commitments.clone(), claimed_total).await?, "proof did not verify");
    submit(&ledger, &a, id, TransitionRequest::SubmitProof { proof, claimed_total, commitments }).await?;

    for w in [&a, &b] {
        let share = created
            .shares
            .iter()
            .find(|(m, _)| *m == w.id())
            .map(|(_, s)| s.clone())
            .ok_or_else(|| anyhow!("missing share"))?;
        submit(&ledger, w, id, TransitionRequest::RequestReveal { share }).await?;
    }

    let out = ledger.apply(SignedTransition::sign(&c, id, TransitionRequest::RevealTotal)?).await?;
    let total = out.total.context("reveal produced no total")?;
    println!("🎉 revealed total: {}", format_amount(total, decimals));

    let (note, _) = DepositNote::prepare(parse_amount("5", decimals)?, &c.member_secret(&id), &reveal_pk)?;
    match ledger.apply(SignedTransition::sign(&c, id, TransitionRequest::Deposit { note })?).await {
        Err(e) => println!("🚫 late deposit rejected: {e}"),
        Ok(_) => bail!("deposit after reveal was accepted"),
    }

    let snap = ledger.snapshot(&id).await?;
    println!("📈 health {} ({})", snap.health.score, snap.health.label);
    Ok(())
}
