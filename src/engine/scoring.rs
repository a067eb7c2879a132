//! Declaration scoring.
//!
//! Converts a (declaration, match outcome) pair into a reward and keeps the
//! streak counters. WIN rewards start low and grow with the streak; LOSE
//! rewards start high and decay towards a floor.

use tracing::debug;

use crate::config::ScoringConfig;
use crate::types::{Declaration, DeclarationResult, Participant};

pub struct ScoringRules {
    config: ScoringConfig,
}

impl ScoringRules {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Reward `participant` would earn if `declaration` succeeded now.
    pub fn reward_for(&self, participant: &Participant, declaration: Declaration) -> u64 {
        let c = &self.config;
        match declaration {
            Declaration::Win => {
                c.win_base + c.win_streak_bonus * u64::from(participant.consecutive_win_declarations)
            }
            Declaration::Lose => c
                .lose_base
                .saturating_sub(c.lose_streak_penalty * u64::from(participant.consecutive_lose_declarations))
                .max(c.lose_floor),
        }
    }

    /// Score one side of a finished match. Must be called exactly once per
    /// participant per match.
    pub fn resolve(
        &self,
        participant: &mut Participant,
        declaration: Declaration,
        won_match: bool,
    ) -> DeclarationResult {
        participant.declaration_history.push(declaration);
        participant.win_history.push(won_match);
        if won_match {
            participant.total_wins += 1;
        } else {
            participant.losses += 1;
        }

        let success = declaration.is_fulfilled_by(won_match);
        let reward = if success {
            let reward = self.reward_for(participant, declaration);
            participant.points += reward;
            match declaration {
                Declaration::Win => {
                    participant.consecutive_win_declarations += 1;
                    participant.consecutive_lose_declarations = 0;
                }
                Declaration::Lose => {
                    participant.consecutive_lose_declarations += 1;
                    participant.consecutive_win_declarations = 0;
                }
            }
            reward
        } else {
            participant.consecutive_win_declarations = 0;
            participant.consecutive_lose_declarations = 0;
            0
        };

        debug!(
            participant = %participant.name,
            %declaration,
            won_match,
            success,
            reward,
            points = participant.points,
            "Declaration scored"
        );

        DeclarationResult { success, reward }
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
