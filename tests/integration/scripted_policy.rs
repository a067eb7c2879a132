//! Scripted decision policy for integration testing.
//!
//! Every CPU declares the same thing, and hands follow a fixed rhythm:
//! any non-hand decision resets the rhythm, then hands alternate rock,
//! scissors, rock, ... So in a CPU match the earlier seat always wins,
//! the human's bracket opponent always throws rock, and in a CPU-only
//! final the point winner always wins.

use std::sync::{Arc, Mutex};

use rps_tourney::strategy::DecisionPolicy;
use rps_tourney::types::{Declaration, Hand, Participant, ParticipantId};

/// One spectator bet as the policy chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeCall {
    pub bettor: ParticipantId,
    pub cap: u64,
    pub stake: u64,
}

pub struct ScriptedPolicy {
    declaration: Declaration,
    next_hand: usize,
    sides: usize,
    stakes: Arc<Mutex<Vec<StakeCall>>>,
}

impl ScriptedPolicy {
    const RHYTHM: [Hand; 2] = [Hand::Rock, Hand::Scissors];

    pub fn new(declaration: Declaration) -> Self {
        Self {
            declaration,
            next_hand: 0,
            sides: 0,
            stakes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of every stake chosen so far. Stays readable after the
    /// policy has been boxed into a tournament.
    pub fn stakes(&self) -> Arc<Mutex<Vec<StakeCall>>> {
        Arc::clone(&self.stakes)
    }
}

impl DecisionPolicy for ScriptedPolicy {
    fn choose_declaration(&mut self, _me: &Participant, _opponent: &Participant) -> Declaration {
        self.next_hand = 0;
        self.declaration
    }

    fn choose_hand(&mut self, _me: &Participant) -> Hand {
        let hand = Self::RHYTHM[self.next_hand % Self::RHYTHM.len()];
        self.next_hand += 1;
        hand
    }

    fn choose_stake(&mut self, me: &Participant, cap: u64) -> u64 {
        self.next_hand = 0;
        let stake = cap / 2;
        self.stakes.lock().unwrap().push(StakeCall {
            bettor: me.id,
            cap,
            stake,
        });
        stake
    }

    /// Alternates between the two finalists, point winner first.
    fn choose_side(&mut self, _me: &Participant, finalists: [ParticipantId; 2]) -> ParticipantId {
        self.next_hand = 0;
        let side = finalists[self.sides % 2];
        self.sides += 1;
        side
    }

    fn seat_order(&mut self, seats: usize) -> Vec<usize> {
        (0..seats).collect()
    }
}
