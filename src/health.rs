//! Pot health: a 0..=100 score from member activity, proof cadence and
//! participation streaks.
//!
//! score = 40·active/members + 30·min(1, proofs/days) + 30·min(1, avg_streak/7)

use serde::Serialize;

use crate::pot::Pot;

const STREAK_TARGET_DAYS: f64 = 7.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PotHealth {
    pub score: u8,
    pub label: &'static str,
    /// Members with a deposit on record.
    pub active_members: usize,
    pub member_count: usize,
    pub days_active: u64,
    pub proofs_submitted: u32,
    pub cadence: &'static str,
    pub avg_streak: f64,
}

pub fn label_for(score: u8) -> &'static str {
    match score {
        80..=u8::MAX => "Excellent",
        60..=79 => "Good",
        40..=59 => "Fair",
        _ => "Needs attention",
    }
}

fn cadence_for(proofs: u32, days: u64) -> &'static str {
    let proofs = proofs as u64;
    if proofs == 0 {
        "None"
    } else if proofs >= days {
        "Daily"
    } else if proofs * 7 >= days {
        "Weekly"
    } else {
        "Sporadic"
    }
}

/// Compute the health of `pot` as of `now`.
pub fn assess(pot: &Pot, now: u64) -> PotHealth {
    let member_count = pot.members().len();
    let active_members = pot.deposits().len();
    let days_active = pot.days_active(now);
    let proofs_submitted = pot.proofs_submitted();

    let participation = if member_count == 0 {
        0.0
    } else {
        active_members as f64 / member_count as f64
    };
    let cadence = (proofs_submitted as f64 / days_active.max(1) as f64).min(1.0);
    let avg_streak = if member_count == 0 {
        0.0
    } else {
        pot.members().iter().map(|m| m.streak as f64).sum::<f64>() / member_count as f64
    };
    let streak = (avg_streak / STREAK_TARGET_DAYS).min(1.0);

    let raw = 40.0 * participation + 30.0 * cadence + 30.0 * streak;
    let score = raw.round().clamp(0.0, 100.0) as u8;

    PotHealth {
        score,
        label: label_for(score),
        active_members,
        member_count,
        days_active,
        proofs_submitted,
        cadence: cadence_for(proofs_submitted, days_active),
        avg_streak,
    }
}
