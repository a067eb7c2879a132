//! Hand drawing.

use rand::Rng;

use super::DecisionPolicy;
use crate::types::{Hand, Participant};

/// Uniform over the three hands.
pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Hand {
    Hand::ALL[rng.random_range(0..Hand::ALL.len())]
}

/// Ask the policy for both hands, redrawing both until they differ.
pub fn draw_decisive(
    policy: &mut dyn DecisionPolicy,
    first: &Participant,
    second: &Participant,
) -> (Hand, Hand) {
    loop {
        let a = policy.choose_hand(first);
        let b = policy.choose_hand(second);
        if a != b {
            return (a, b);
        }
    }
}
