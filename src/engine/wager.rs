//! Final wager: finalist selection, spectator betting, odds and payouts.
//!
//! Odds are pari-mutuel in spirit: a finalist backed by a small pool pays
//! out the ratio of the opposing pool to its own, never less than even
//! money. Odds are kept as an exact ratio so payouts floor correctly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::strategy::DecisionPolicy;
use crate::types::{FinalBet, Participant, ParticipantId, TourneyError};

// ---------------------------------------------------------------------------
// Finalists
// ---------------------------------------------------------------------------

/// The two sides of the final. May be the same participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finalists {
    /// Most ranking points; ties go to the earlier seat.
    pub point_winner: ParticipantId,
    /// First undefeated participant in seat order, or the point winner.
    pub all_winner: ParticipantId,
}

impl Finalists {
    /// `None` only for an empty field.
    pub fn select(participants: &[Participant]) -> Option<Self> {
        let mut leader: Option<&Participant> = None;
        for p in participants {
            let ahead = match leader {
                Some(best) => p.ranking_points() > best.ranking_points(),
                None => true,
            };
            if ahead {
                leader = Some(p);
            }
        }
        let point_winner = leader?.id;
        let all_winner = participants
            .iter()
            .find(|p| p.is_undefeated())
            .map(|p| p.id)
            .unwrap_or(point_winner);
        Some(Self { point_winner, all_winner })
    }

    /// One participant holds both titles; there is no wager.
    pub fn is_coronation(&self) -> bool {
        self.point_winner == self.all_winner
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.point_winner == id || self.all_winner == id
    }

    /// The finalist facing `id`.
    pub fn other(&self, id: ParticipantId) -> ParticipantId {
        if self.point_winner == id {
            self.all_winner
        } else {
            self.point_winner
        }
    }

    pub fn pair(&self) -> [ParticipantId; 2] {
        [self.point_winner, self.all_winner]
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// Net odds as `numerator / denominator`, never below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Odds {
    numerator: u64,
    denominator: u64,
}

impl Odds {
    pub const EVEN: Odds = Odds {
        numerator: 1,
        denominator: 1,
    };

    /// Odds for a side backed by `backing` against `opposing`. Even money
    /// whenever either pool is empty or the side is the favourite.
    pub fn from_pools(backing: u64, opposing: u64) -> Self {
        if backing == 0 || opposing == 0 || opposing <= backing {
            Self::EVEN
        } else {
            Self {
                numerator: opposing,
                denominator: backing,
            }
        }
    }

    pub fn value(&self) -> Decimal {
        Decimal::from(self.numerator) / Decimal::from(self.denominator)
    }

    /// `floor(stake * (1 + odds))`: the stake back plus winnings.
    pub fn payout(&self, stake: u64) -> u64 {
        let total = u128::from(stake) * (u128::from(self.numerator) + u128::from(self.denominator))
            / u128::from(self.denominator);
        u64::try_from(total).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.value())
    }
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

/// Stake pools for the two finalists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    finalists: Finalists,
    pools: [u64; 2],
}

impl Book {
    pub fn new(finalists: Finalists) -> Self {
        Self {
            finalists,
            pools: [0, 0],
        }
    }

    fn slot(&self, target: ParticipantId) -> Option<usize> {
        self.finalists.pair().iter().position(|f| *f == target)
    }

    /// Add a stake to a finalist's pool.
    pub fn place(&mut self, target: ParticipantId, amount: u64) -> Result<(), TourneyError> {
        let slot = self
            .slot(target)
            .ok_or_else(|| TourneyError::UnknownTarget(target.to_string()))?;
        self.pools[slot] += amount;
        Ok(())
    }

    /// Total staked on `id` (zero for non-finalists).
    pub fn pool(&self, id: ParticipantId) -> u64 {
        self.slot(id).map(|s| self.pools[s]).unwrap_or(0)
    }

    pub fn odds_for(&self, id: ParticipantId) -> Odds {
        let backing = self.pool(id);
        let opposing = self.pool(self.finalists.other(id));
        Odds::from_pools(backing, opposing)
    }

    /// Current odds for both finalists, point winner first.
    pub fn odds(&self) -> [(ParticipantId, Odds); 2] {
        self.finalists.pair().map(|id| (id, self.odds_for(id)))
    }

    pub fn finalists(&self) -> &Finalists {
        &self.finalists
    }
}

// ---------------------------------------------------------------------------
// Betting & settlement
// ---------------------------------------------------------------------------

/// Winnings credited to one bettor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub id: ParticipantId,
    pub stake: u64,
    pub reward: u64,
}

/// Double the sole champion's points (routed through [`Participant::credit`]).
/// Returns the bonus awarded.
pub fn crown(champion: &mut Participant) -> u64 {
    let bonus = champion.points;
    champion.credit(bonus);
    bonus
}

/// Every CPU spectator with points stakes a random amount on a random
/// finalist. Stakes leave the bettor's points immediately.
pub fn collect_spectator_bets(
    participants: &mut [Participant],
    book: &mut Book,
    policy: &mut dyn DecisionPolicy,
    max_stake: u64,
) {
    let finalists = *book.finalists();
    for spectator in participants.iter_mut() {
        if spectator.is_human || finalists.contains(spectator.id) || spectator.points == 0 {
            continue;
        }
        let cap = spectator.points.min(max_stake);
        if cap == 0 {
            continue;
        }
        let stake = policy.choose_stake(spectator, cap).min(cap - 1);
        let target = policy.choose_side(spectator, finalists.pair());
        if let Err(e) = book.place(target, stake) {
            warn!(spectator = %spectator.name, error = %e, "Spectator bet skipped");
            continue;
        }

        let stake = spectator.deduct_stake(stake);
        spectator.final_bet = Some(FinalBet { target, amount: stake });
        debug!(spectator = %spectator.name, %target, stake, "Spectator bet placed");
    }
}

/// Pay every bet on `winner` at the book's current odds.
pub fn settle_bets(participants: &mut [Participant], book: &Book, winner: ParticipantId) -> Vec<Payout> {
    let odds = book.odds_for(winner);
    participants
        .iter_mut()
        .filter_map(|p| {
            let bet = p.final_bet?;
            if bet.target != winner {
                return None;
            }
            let reward = odds.payout(bet.amount);
            p.credit(reward);
            debug!(bettor = %p.name, stake = bet.amount, reward, "Bet paid");
            Some(Payout {
                id: p.id,
                stake: bet.amount,
                reward,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
