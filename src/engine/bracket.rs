//! Bracket pairing, automated matches, and demotion.
//!
//! Each round participants are grouped by tier (in seating order) and
//! paired off two by two. An odd participant out sits the round out. The
//! loser of every match drops one tier; underdogs have nowhere lower to go.

use chrono::Utc;
use tracing::debug;

use super::scoring::ScoringRules;
use crate::strategy::{hand, DecisionPolicy};
use crate::types::{Bracket, Declaration, Hand, MatchRecord, MatchSide, Participant, ParticipantId};

/// Two participants drawn against each other this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub first: ParticipantId,
    pub second: ParticipantId,
    pub bracket: Bracket,
}

impl Pairing {
    pub fn involves(&self, id: ParticipantId) -> bool {
        self.first == id || self.second == id
    }

    /// The other side of the pairing. Only meaningful when `involves(id)`.
    pub fn opponent_of(&self, id: ParticipantId) -> ParticipantId {
        if self.first == id {
            self.second
        } else {
            self.first
        }
    }
}

/// A side's declaration and hand for one match.
#[derive(Debug, Clone, Copy)]
pub struct Play {
    pub declaration: Declaration,
    pub hand: Hand,
}

/// Pair every tier for the coming round, winners first.
pub fn pair_round(participants: &[Participant]) -> Vec<Pairing> {
    let mut pairings = Vec::new();
    for tier in Bracket::ALL {
        let seats: Vec<ParticipantId> = participants
            .iter()
            .filter(|p| p.bracket == tier)
            .map(|p| p.id)
            .collect();
        pairings.extend(seats.chunks_exact(2).map(|pair| Pairing {
            first: pair[0],
            second: pair[1],
            bracket: tier,
        }));
    }
    pairings
}

/// Score both sides of a decided match and demote the loser.
///
/// The hands must differ.
pub fn settle(
    participants: &mut [Participant],
    rules: &ScoringRules,
    pairing: &Pairing,
    first: Play,
    second: Play,
    round: u32,
) -> MatchRecord {
    let first_won = first.hand.beats(second.hand);
    let first_result = rules.resolve(&mut participants[pairing.first.0], first.declaration, first_won);
    let second_result = rules.resolve(&mut participants[pairing.second.0], second.declaration, !first_won);

    let (winner, loser) = if first_won {
        (pairing.first, pairing.second)
    } else {
        (pairing.second, pairing.first)
    };
    participants[loser.0].bracket = pairing.bracket.demoted();

    MatchRecord {
        round,
        bracket: pairing.bracket,
        sides: [
            MatchSide {
                id: pairing.first,
                declaration: first.declaration,
                hand: first.hand,
                result: first_result,
            },
            MatchSide {
                id: pairing.second,
                declaration: second.declaration,
                hand: second.hand,
                result: second_result,
            },
        ],
        winner,
        played_at: Utc::now(),
    }
}

/// Play a CPU-vs-CPU match start to finish.
pub fn play_automated(
    participants: &mut [Participant],
    policy: &mut dyn DecisionPolicy,
    rules: &ScoringRules,
    pairing: &Pairing,
    round: u32,
) -> MatchRecord {
    let a = &participants[pairing.first.0];
    let b = &participants[pairing.second.0];
    let first_declaration = policy.choose_declaration(a, b);
    let second_declaration = policy.choose_declaration(b, a);
    let (first_hand, second_hand) = hand::draw_decisive(policy, a, b);

    let record = settle(
        participants,
        rules,
        pairing,
        Play { declaration: first_declaration, hand: first_hand },
        Play { declaration: second_declaration, hand: second_hand },
        round,
    );
    debug!(%record, "Automated match settled");
    record
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
