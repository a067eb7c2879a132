//! CPU declaration strategies.
//!
//! Each call picks one of three strategies uniformly:
//! - **Random**: a fair coin.
//! - **Trend**: counter the opponent's recent declarations. Needs a full
//!   window of history; otherwise falls through to the points strategy.
//! - **Points**: when behind, lean towards LOSE (the larger base reward).

use rand::Rng;

use crate::config::PolicyConfig;
use crate::types::{Declaration, Participant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationStrategy {
    Random,
    Trend,
    Points,
}

impl DeclarationStrategy {
    pub const ALL: [DeclarationStrategy; 3] = [
        DeclarationStrategy::Random,
        DeclarationStrategy::Trend,
        DeclarationStrategy::Points,
    ];

    /// Pick a strategy uniformly at random.
    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn declare<R: Rng + ?Sized>(
        self,
        rng: &mut R,
        config: &PolicyConfig,
        me: &Participant,
        opponent: &Participant,
    ) -> Declaration {
        match self {
            DeclarationStrategy::Random => coin(rng),
            DeclarationStrategy::Trend => match opponent_leaning(opponent, config.trend_window) {
                Some(leaning) => lean(rng, leaning.opposite(), config.trend_bias),
                None => points_based(rng, config, me),
            },
            DeclarationStrategy::Points => points_based(rng, config, me),
        }
    }
}

/// The declaration the opponent has favoured over the trend window.
/// A tied window counts as leaning LOSE. `None` until the window is full.
pub fn opponent_leaning(opponent: &Participant, window: usize) -> Option<Declaration> {
    let recent = opponent.recent_declarations(window);
    if recent.len() < window {
        return None;
    }
    let wins = recent.iter().filter(|d| **d == Declaration::Win).count();
    if wins > recent.len() - wins {
        Some(Declaration::Win)
    } else {
        Some(Declaration::Lose)
    }
}

fn coin<R: Rng + ?Sized>(rng: &mut R) -> Declaration {
    lean(rng, Declaration::Win, 0.5)
}

/// `preferred` with probability `p`, otherwise its opposite.
fn lean<R: Rng + ?Sized>(rng: &mut R, preferred: Declaration, p: f64) -> Declaration {
    if rng.random_bool(p) {
        preferred
    } else {
        preferred.opposite()
    }
}

fn points_based<R: Rng + ?Sized>(rng: &mut R, config: &PolicyConfig, me: &Participant) -> Declaration {
    if me.points < config.points_threshold {
        lean(rng, Declaration::Lose, config.behind_lose_bias)
    } else {
        coin(rng)
    }
}
