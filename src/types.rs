//! Shared types for the tournament engine.
//!
//! These types form the data model used across all modules. The engine
//! owns the participants; presentation code only ever sees them through
//! shared references, ids, and the snapshot types at the bottom of this file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Declarations & hands
// ---------------------------------------------------------------------------

/// A participant's public prediction of their own match outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Declaration {
    Win,
    Lose,
}

impl Declaration {
    /// The opposite declaration.
    pub fn opposite(&self) -> Self {
        match self {
            Declaration::Win => Declaration::Lose,
            Declaration::Lose => Declaration::Win,
        }
    }

    /// Whether this declaration came true for the given match outcome.
    pub fn is_fulfilled_by(&self, won_match: bool) -> bool {
        matches!(
            (self, won_match),
            (Declaration::Win, true) | (Declaration::Lose, false)
        )
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Win => write!(f, "WIN"),
            Declaration::Lose => write!(f, "LOSE"),
        }
    }
}

impl std::str::FromStr for Declaration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "win" | "w" => Ok(Declaration::Win),
            "lose" | "l" | "loss" => Ok(Declaration::Lose),
            _ => Err(anyhow::anyhow!("Unknown declaration: {s}")),
        }
    }
}

/// A rock-paper-scissors hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    pub const ALL: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

    /// Rock beats scissors, scissors beats paper, paper beats rock.
    pub fn beats(&self, other: Hand) -> bool {
        matches!(
            (self, other),
            (Hand::Rock, Hand::Scissors) | (Hand::Scissors, Hand::Paper) | (Hand::Paper, Hand::Rock)
        )
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Rock => write!(f, "rock"),
            Hand::Paper => write!(f, "paper"),
            Hand::Scissors => write!(f, "scissors"),
        }
    }
}

impl std::str::FromStr for Hand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rock" | "r" => Ok(Hand::Rock),
            "paper" | "p" => Ok(Hand::Paper),
            "scissors" | "s" => Ok(Hand::Scissors),
            _ => Err(anyhow::anyhow!("Unknown hand: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Brackets
// ---------------------------------------------------------------------------

/// Tier a participant occupies. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bracket {
    Winner,
    Loser,
    Dropout,
    Underdog,
}

impl Bracket {
    /// All tiers in pairing order.
    pub const ALL: [Bracket; 4] = [
        Bracket::Winner,
        Bracket::Loser,
        Bracket::Dropout,
        Bracket::Underdog,
    ];

    /// Tier a loser of a match in this tier drops to. Underdog is the floor.
    pub fn demoted(&self) -> Self {
        match self {
            Bracket::Winner => Bracket::Loser,
            Bracket::Loser => Bracket::Dropout,
            Bracket::Dropout | Bracket::Underdog => Bracket::Underdog,
        }
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bracket::Winner => write!(f, "Winners"),
            Bracket::Loser => write!(f, "Losers"),
            Bracket::Dropout => write!(f, "Dropouts"),
            Bracket::Underdog => write!(f, "Underdogs"),
        }
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// Stable seat identifier, valid for the lifetime of one tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub usize);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stake placed during the final wager phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalBet {
    pub target: ParticipantId,
    pub amount: u64,
}

/// One entrant in the tournament.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub is_human: bool,
    /// Tournament-scoped score; the only value used for ranking.
    pub points: u64,
    /// Score brought in from a previous tournament. Never ranked.
    pub carry_over_points: u64,
    pub consecutive_win_declarations: u32,
    pub consecutive_lose_declarations: u32,
    pub declaration_history: Vec<Declaration>,
    pub win_history: Vec<bool>,
    pub total_wins: u32,
    pub losses: u32,
    pub bracket: Bracket,
    pub final_bet: Option<FinalBet>,
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} [{}] {}pt (W{}/L{})",
            self.name,
            if self.is_human { " (you)" } else { "" },
            self.bracket,
            self.points,
            self.total_wins,
            self.losses,
        )?;
        if self.carry_over_points > 0 {
            write!(f, " +{}pt carried", self.carry_over_points)?;
        }
        Ok(())
    }
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>, is_human: bool, points: u64) -> Self {
        Self {
            id,
            name: name.into(),
            is_human,
            points,
            carry_over_points: 0,
            consecutive_win_declarations: 0,
            consecutive_lose_declarations: 0,
            declaration_history: Vec::new(),
            win_history: Vec::new(),
            total_wins: 0,
            losses: 0,
            bracket: Bracket::Winner,
            final_bet: None,
        }
    }

    /// Points used for every ordering decision (carry-over excluded).
    pub fn ranking_points(&self) -> u64 {
        self.points
    }

    /// Points available for display and for staking.
    pub fn total_points(&self) -> u64 {
        self.points + self.carry_over_points
    }

    /// Never lost a match and still in the top tier.
    pub fn is_undefeated(&self) -> bool {
        self.losses == 0 && self.bracket == Bracket::Winner
    }

    /// The last `window` declarations, oldest first.
    pub fn recent_declarations(&self, window: usize) -> &[Declaration] {
        let start = self.declaration_history.len().saturating_sub(window);
        &self.declaration_history[start..]
    }

    /// Remove a stake, drawing on carry-over first and then on points.
    /// The amount is clamped to the total available; returns what was taken.
    pub fn deduct_stake(&mut self, amount: u64) -> u64 {
        let amount = amount.min(self.total_points());
        let from_carry = amount.min(self.carry_over_points);
        self.carry_over_points -= from_carry;
        self.points -= amount - from_carry;
        amount
    }

    /// Credit winnings or a bonus. A human who is still carrying points
    /// over from a previous tournament receives them into the carry-over
    /// pool; everybody else into tournament points.
    pub fn credit(&mut self, amount: u64) {
        if self.is_human && self.carry_over_points > 0 {
            self.carry_over_points += amount;
        } else {
            self.points += amount;
        }
    }
}

// ---------------------------------------------------------------------------
// Match results
// ---------------------------------------------------------------------------

/// Outcome of scoring one side of one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationResult {
    pub success: bool,
    pub reward: u64,
}

/// One side of a resolved match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSide {
    pub id: ParticipantId,
    pub declaration: Declaration,
    pub hand: Hand,
    pub result: DeclarationResult,
}

/// A resolved bracket match, kept in the tournament's match log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub round: u32,
    pub bracket: Bracket,
    pub sides: [MatchSide; 2],
    pub winner: ParticipantId,
    pub played_at: DateTime<Utc>,
}

impl MatchRecord {
    /// The side played by `id`, if they took part.
    pub fn side(&self, id: ParticipantId) -> Option<&MatchSide> {
        self.sides.iter().find(|s| s.id == id)
    }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = &self.sides;
        write!(
            f,
            "R{} {}: {} {}/{} (+{}) vs {} {}/{} (+{}) -> {} wins",
            self.round,
            self.bracket,
            a.id,
            a.declaration,
            a.hand,
            a.result.reward,
            b.id,
            b.declaration,
            b.hand,
            b.result.reward,
            self.winner,
        )
    }
}

// ---------------------------------------------------------------------------
// Standings & hand-off
// ---------------------------------------------------------------------------

/// Title awarded to the two finalists once the final phase begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Title {
    PointChampion,
    Undefeated,
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Title::PointChampion => write!(f, "Point Champion"),
            Title::Undefeated => write!(f, "Undefeated"),
        }
    }
}

/// One row of the standings table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standing {
    pub rank: usize,
    pub id: ParticipantId,
    pub name: String,
    pub is_human: bool,
    pub points: u64,
    pub carry_over_points: u64,
    pub total_points: u64,
    pub bracket: Bracket,
    pub wins: u32,
    pub losses: u32,
    pub title: Option<Title>,
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.title {
            Some(title) => title.to_string(),
            None => self.bracket.to_string(),
        };
        write!(
            f,
            "{:>2}. {:<12} {:>6}pt  W{}/L{}  {}",
            self.rank, self.name, self.points, self.wins, self.losses, label,
        )
    }
}

/// The human's score handed from a finished tournament to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryOver {
    pub name: String,
    pub points: u64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the tournament engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TourneyError {
    #[error("Bet must be at least 1 point")]
    BetTooSmall,

    #[error("Bet of {requested}pt exceeds available {available}pt")]
    BetExceedsBalance { requested: u64, available: u64 },

    #[error("Not a finalist: {0}")]
    UnknownTarget(String),

    #[error("A spectator bet must name a finalist to back")]
    MissingTarget,

    #[error("Cannot {action} while {phase}")]
    OutOfTurn {
        action: &'static str,
        phase: &'static str,
    },

    #[error("Duplicate participant name: {0}")]
    DuplicateName(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TourneyError {
    /// Whether the caller can fix this by supplying different input.
    /// Everything else is a misuse of the engine.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            TourneyError::BetTooSmall
                | TourneyError::BetExceedsBalance { .. }
                | TourneyError::UnknownTarget(_)
                | TourneyError::MissingTarget
                | TourneyError::DuplicateName(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
