//! Decision policies for non-human participants.
//!
//! The engine never draws random numbers itself. Every CPU choice (a
//! declaration, a hand, a final-phase stake and side, the seating order)
//! goes through a [`DecisionPolicy`], so a seeded [`CpuPolicy`] replays a
//! tournament exactly and tests can substitute a scripted one.

pub mod declaration;
pub mod hand;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::PolicyConfig;
use crate::types::{Declaration, Hand, Participant, ParticipantId};
use declaration::DeclarationStrategy;

/// Abstraction over the source of CPU decisions.
#[cfg_attr(test, mockall::automock)]
pub trait DecisionPolicy {
    /// Declare WIN or LOSE for `me` facing `opponent`.
    fn choose_declaration(&mut self, me: &Participant, opponent: &Participant) -> Declaration;

    /// Throw a hand.
    fn choose_hand(&mut self, me: &Participant) -> Hand;

    /// Stake for a spectator, in `[0, cap)`. `cap` is already clamped to
    /// the spectator's points and is never zero.
    fn choose_stake(&mut self, me: &Participant, cap: u64) -> u64;

    /// Finalist a spectator backs.
    fn choose_side(&mut self, me: &Participant, finalists: [ParticipantId; 2]) -> ParticipantId;

    /// Seating order for `seats` entrants, as a permutation of `0..seats`.
    /// Only asked for when seat shuffling is enabled.
    fn seat_order(&mut self, seats: usize) -> Vec<usize>;
}

// ---------------------------------------------------------------------------
// CPU policy
// ---------------------------------------------------------------------------

/// Randomised CPU behaviour backed by a seedable `StdRng`.
pub struct CpuPolicy {
    rng: StdRng,
    config: PolicyConfig,
}

impl CpuPolicy {
    /// `Some(seed)` replays the same decisions every run; `None` uses OS entropy.
    pub fn new(config: PolicyConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self { rng, config }
    }
}

impl DecisionPolicy for CpuPolicy {
    fn choose_declaration(&mut self, me: &Participant, opponent: &Participant) -> Declaration {
        let strategy = DeclarationStrategy::pick(&mut self.rng);
        let declaration = strategy.declare(&mut self.rng, &self.config, me, opponent);
        debug!(
            participant = %me.name,
            opponent = %opponent.name,
            ?strategy,
            %declaration,
            "CPU declared"
        );
        declaration
    }

    fn choose_hand(&mut self, _me: &Participant) -> Hand {
        hand::draw(&mut self.rng)
    }

    fn choose_stake(&mut self, _me: &Participant, cap: u64) -> u64 {
        if cap == 0 {
            0
        } else {
            self.rng.random_range(0..cap)
        }
    }

    fn choose_side(&mut self, _me: &Participant, finalists: [ParticipantId; 2]) -> ParticipantId {
        finalists[self.rng.random_range(0..finalists.len())]
    }

    fn seat_order(&mut self, seats: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..seats).collect();
        order.shuffle(&mut self.rng);
        order
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
