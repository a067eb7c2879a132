//! Core engine: bracket rounds followed by the final wager.
//!
//! [`Tournament`] owns every participant and drives a small phase machine.
//! CPU-only matches are settled as soon as a round is paired; the human's
//! match (if any) suspends the round until a declaration and a hand arrive.
//! After the last round the final phase picks two finalists, takes bets,
//! and pays out. Presentation code calls the boundary methods with the
//! human's choices and reads state back through shared references.

pub mod bracket;
pub mod scoring;
pub mod standings;
pub mod wager;

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::strategy::{hand, DecisionPolicy};
use crate::types::{
    Bracket, CarryOver, Declaration, FinalBet, Hand, MatchRecord, Participant, ParticipantId,
    Standing, TourneyError,
};
use bracket::{Pairing, Play};
use scoring::ScoringRules;
use wager::{Book, Finalists, Odds, Payout};

// ---------------------------------------------------------------------------
// Results handed back to the caller
// ---------------------------------------------------------------------------

/// Whether the human plays in the final or watches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HumanRole {
    Finalist,
    Spectator,
}

/// The human's bracket match, seen from the human's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub round: u32,
    pub bracket: Bracket,
    pub opponent: ParticipantId,
    pub declaration: Declaration,
    pub hand: Hand,
    pub won: bool,
    pub success: bool,
    pub reward: u64,
    pub opponent_declaration: Declaration,
    pub opponent_hand: Hand,
}

/// What happened when the human threw a hand in a bracket match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandOutcome {
    /// Same hand as the opponent. Nothing is scored; throw again.
    Tie {
        opponent_hand: Hand,
        opponent_declaration: Declaration,
    },
    Decided(MatchResult),
}

/// Outcome of a contested final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalResult {
    pub winner: ParticipantId,
    pub winner_name: String,
    pub winning_hand: Hand,
    pub losing_hand: Hand,
    /// Present when the human threw in the final.
    pub human_hand: Option<Hand>,
    /// Odds the bets were settled at, point winner first.
    pub odds: [(ParticipantId, Odds); 2],
    /// The human's stake (zero if they did not bet).
    pub stake: u64,
    pub target: Option<ParticipantId>,
    pub bet_success: bool,
    pub bet_reward: u64,
    pub payouts: Vec<Payout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FinalOutcome {
    /// One participant was both point leader and undefeated.
    Coronation { champion: ParticipantId, bonus: u64 },
    Wager(FinalResult),
}

/// Acknowledgement of the human's final bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetConfirmation {
    pub stake: u64,
    pub target: ParticipantId,
    /// Set when the bet closed the final (the human was a spectator).
    pub result: Option<FinalResult>,
}

/// Reward the human would earn right now for a successful declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPreview {
    pub win: u64,
    pub lose: u64,
}

// ---------------------------------------------------------------------------
// Phase machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    AwaitingDeclaration {
        pairing: Pairing,
    },
    AwaitingHand {
        pairing: Pairing,
        declaration: Declaration,
        ties: u32,
    },
    MatchComplete {
        result: MatchResult,
    },
    FinalBetting {
        finalists: Finalists,
        role: HumanRole,
    },
    FinalHand {
        finalists: Finalists,
        stake: u64,
    },
    Complete {
        outcome: FinalOutcome,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::AwaitingDeclaration { .. } => "waiting for a declaration",
            Phase::AwaitingHand { .. } => "waiting for a hand",
            Phase::MatchComplete { .. } => "showing a match result",
            Phase::FinalBetting { .. } => "taking final bets",
            Phase::FinalHand { .. } => "waiting for the final hand",
            Phase::Complete { .. } => "finished",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Phase::Complete { .. })
    }
}

// ---------------------------------------------------------------------------
// Tournament
// ---------------------------------------------------------------------------

pub struct Tournament {
    table: Table,
    phase: Phase,
}

/// Everything a tournament owns apart from its phase.
struct Table {
    id: Uuid,
    config: AppConfig,
    rules: ScoringRules,
    policy: Box<dyn DecisionPolicy>,
    participants: Vec<Participant>,
    human: ParticipantId,
    round: u32,
    match_log: Vec<MatchRecord>,
    finalists: Option<Finalists>,
    book: Option<Book>,
}

impl Tournament {
    /// Seat one human and `cpu_count` CPUs and play until the human is
    /// first needed (or, if they never are, through to the final).
    ///
    /// A blank `human_name` falls back to the configured default.
    pub fn start(
        config: AppConfig,
        human_name: &str,
        carry_over: u64,
        mut policy: Box<dyn DecisionPolicy>,
    ) -> Result<Self, TourneyError> {
        config.validate()?;

        let name = match human_name.trim() {
            "" => config.tournament.human_name.trim().to_string(),
            given => given.to_string(),
        };
        let mut roster = vec![name];
        roster.extend((1..=config.tournament.cpu_count).map(|i| format!("CPU-{i}")));
        let mut seen = HashSet::new();
        if let Some(dup) = roster.iter().find(|n| n.is_empty() || !seen.insert(n.as_str())) {
            return Err(TourneyError::DuplicateName(dup.clone()));
        }

        let order = if config.tournament.shuffle_seats {
            policy.seat_order(roster.len())
        } else {
            (0..roster.len()).collect()
        };
        if !is_permutation(&order, roster.len()) {
            return Err(TourneyError::Config(format!(
                "seat order {order:?} is not a permutation of {} seats",
                roster.len()
            )));
        }

        let starting_points = config.tournament.starting_points;
        let mut participants: Vec<Participant> = order
            .iter()
            .enumerate()
            .map(|(seat, &entry)| {
                Participant::new(ParticipantId(seat), roster[entry].clone(), entry == 0, starting_points)
            })
            .collect();
        let human = ParticipantId(order.iter().position(|&entry| entry == 0).unwrap_or(0));
        participants[human.0].carry_over_points = carry_over;

        let mut table = Table {
            id: Uuid::new_v4(),
            rules: ScoringRules::new(config.scoring.clone()),
            config,
            policy,
            participants,
            human,
            round: 1,
            match_log: Vec::new(),
            finalists: None,
            book: None,
        };

        info!(
            tournament_id = %table.id,
            human = %table.human().name,
            seat = human.0,
            entrants = table.participants.len(),
            carry_over,
            "Tournament started"
        );

        let phase = table.play_rounds();
        Ok(Self { table, phase })
    }

    // -- Read access -------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.table.id
    }

    pub fn config(&self) -> &AppConfig {
        &self.table.config
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Current bracket round, never past the last configured round.
    pub fn current_round(&self) -> u32 {
        self.table.round.min(self.table.config.tournament.rounds)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.table.participants
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.table.participants.get(id.0)
    }

    pub fn human(&self) -> &Participant {
        self.table.human()
    }

    pub fn human_id(&self) -> ParticipantId {
        self.table.human
    }

    /// The human's bracket match while it awaits input.
    pub fn pending_match(&self) -> Option<&Pairing> {
        match &self.phase {
            Phase::AwaitingDeclaration { pairing } | Phase::AwaitingHand { pairing, .. } => Some(pairing),
            _ => None,
        }
    }

    pub fn match_log(&self) -> &[MatchRecord] {
        &self.table.match_log
    }

    pub fn finalists(&self) -> Option<&Finalists> {
        self.table.finalists.as_ref()
    }

    /// Odds on both finalists as they stand, point winner first.
    pub fn odds(&self) -> Option<[(ParticipantId, Odds); 2]> {
        self.table.book.as_ref().map(Book::odds)
    }

    /// Total staked on a finalist so far.
    pub fn pool(&self, id: ParticipantId) -> u64 {
        self.table.book.as_ref().map(|b| b.pool(id)).unwrap_or(0)
    }

    pub fn standings(&self) -> Vec<Standing> {
        standings::rank(&self.table.participants, self.table.finalists.as_ref())
    }

    pub fn reward_preview(&self) -> RewardPreview {
        let human = self.table.human();
        RewardPreview {
            win: self.table.rules.reward_for(human, Declaration::Win),
            lose: self.table.rules.reward_for(human, Declaration::Lose),
        }
    }

    /// The human's total points, once the tournament is over, for seeding
    /// the next tournament's carry-over.
    pub fn carry_over(&self) -> Option<CarryOver> {
        if !self.phase.is_complete() {
            return None;
        }
        let human = self.table.human();
        Some(CarryOver {
            name: human.name.clone(),
            points: human.total_points(),
        })
    }

    // -- Bracket boundary --------------------------------------------------

    pub fn submit_declaration(&mut self, declaration: Declaration) -> Result<&Phase, TourneyError> {
        let Phase::AwaitingDeclaration { pairing } = self.phase else {
            return Err(self.out_of_turn("declare"));
        };
        debug!(round = self.table.round, %declaration, "Human declared");
        self.phase = Phase::AwaitingHand {
            pairing,
            declaration,
            ties: 0,
        };
        Ok(&self.phase)
    }

    /// Throw a hand against the pending opponent. The opponent declares
    /// afresh for every throw.
    pub fn submit_hand(&mut self, hand: Hand) -> Result<HandOutcome, TourneyError> {
        let Phase::AwaitingHand {
            pairing,
            declaration,
            ties,
        } = self.phase
        else {
            return Err(self.out_of_turn("throw a hand"));
        };

        let opponent = pairing.opponent_of(self.table.human);
        let table = &mut self.table;
        let opponent_declaration = table
            .policy
            .choose_declaration(&table.participants[opponent.0], &table.participants[table.human.0]);
        let opponent_hand = table.policy.choose_hand(&table.participants[opponent.0]);

        if hand == opponent_hand {
            info!(round = self.table.round, %hand, ties = ties + 1, "Tied hand, throw again");
            self.phase = Phase::AwaitingHand {
                pairing,
                declaration,
                ties: ties + 1,
            };
            return Ok(HandOutcome::Tie {
                opponent_hand,
                opponent_declaration,
            });
        }

        let human_play = Play { declaration, hand };
        let opponent_play = Play {
            declaration: opponent_declaration,
            hand: opponent_hand,
        };
        let human_first = pairing.first == self.table.human;
        let (first, second) = if human_first {
            (human_play, opponent_play)
        } else {
            (opponent_play, human_play)
        };

        let table = &mut self.table;
        let record = bracket::settle(&mut table.participants, &table.rules, &pairing, first, second, table.round);
        let human_side = record.sides[if human_first { 0 } else { 1 }];
        let result = MatchResult {
            round: self.table.round,
            bracket: pairing.bracket,
            opponent,
            declaration,
            hand,
            won: record.winner == self.table.human,
            success: human_side.result.success,
            reward: human_side.result.reward,
            opponent_declaration,
            opponent_hand,
        };

        info!(
            round = result.round,
            bracket = %result.bracket,
            opponent = %self.table.participants[opponent.0].name,
            won = result.won,
            success = result.success,
            reward = result.reward,
            points = self.table.human().points,
            "Human match settled"
        );

        self.table.match_log.push(record);
        self.phase = Phase::MatchComplete {
            result: result.clone(),
        };
        Ok(HandOutcome::Decided(result))
    }

    /// Move on from a settled human match to the next round (or the final).
    pub fn advance(&mut self) -> Result<&Phase, TourneyError> {
        if !matches!(self.phase, Phase::MatchComplete { .. }) {
            return Err(self.out_of_turn("advance"));
        }
        self.table.round += 1;
        self.phase = self.table.play_rounds();
        Ok(&self.phase)
    }

    // -- Final boundary ----------------------------------------------------

    /// Stake `amount` of the human's total points. A finalist always backs
    /// themselves (`target` may be omitted); a spectator names a finalist,
    /// and the final is played out immediately.
    pub fn submit_final_bet(
        &mut self,
        amount: u64,
        target: Option<&str>,
    ) -> Result<BetConfirmation, TourneyError> {
        let Phase::FinalBetting { finalists, role } = self.phase else {
            return Err(self.out_of_turn("place a final bet"));
        };

        if amount == 0 {
            return Err(TourneyError::BetTooSmall);
        }
        let available = self.table.human().total_points();
        if amount > available {
            return Err(TourneyError::BetExceedsBalance {
                requested: amount,
                available,
            });
        }

        let target = match role {
            HumanRole::Finalist => match target {
                Some(name) if name != self.table.human().name => {
                    return Err(TourneyError::UnknownTarget(name.to_string()))
                }
                _ => self.table.human,
            },
            HumanRole::Spectator => {
                let name = target.ok_or(TourneyError::MissingTarget)?;
                self.table
                    .finalist_named(&finalists, name)
                    .ok_or_else(|| TourneyError::UnknownTarget(name.to_string()))?
            }
        };

        self.table
            .book
            .get_or_insert_with(|| Book::new(finalists))
            .place(target, amount)?;
        let human = &mut self.table.participants[self.table.human.0];
        let stake = human.deduct_stake(amount);
        human.final_bet = Some(FinalBet { target, amount: stake });

        info!(
            stake,
            target = %self.table.participants[target.0].name,
            pool = self.pool(target),
            "Human bet placed"
        );

        match role {
            HumanRole::Finalist => {
                self.phase = Phase::FinalHand { finalists, stake };
                Ok(BetConfirmation {
                    stake,
                    target,
                    result: None,
                })
            }
            HumanRole::Spectator => {
                let result = self.finish_final(finalists, None);
                Ok(BetConfirmation {
                    stake,
                    target,
                    result: Some(result),
                })
            }
        }
    }

    /// Skip betting. A spectator's final is played out immediately; a
    /// finalist still throws, with nothing staked.
    pub fn decline_final_bet(&mut self) -> Result<Option<FinalResult>, TourneyError> {
        let Phase::FinalBetting { finalists, role } = self.phase else {
            return Err(self.out_of_turn("decline the final bet"));
        };
        info!(?role, "Human declined to bet");
        match role {
            HumanRole::Finalist => {
                self.phase = Phase::FinalHand { finalists, stake: 0 };
                Ok(None)
            }
            HumanRole::Spectator => Ok(Some(self.finish_final(finalists, None))),
        }
    }

    /// The human finalist's throw. A tie goes to the opponent.
    pub fn submit_final_hand(&mut self, hand: Hand) -> Result<FinalResult, TourneyError> {
        let Phase::FinalHand { finalists, .. } = self.phase else {
            return Err(self.out_of_turn("throw the final hand"));
        };
        Ok(self.finish_final(finalists, Some(hand)))
    }

    // -- Internals ---------------------------------------------------------

    fn finish_final(&mut self, finalists: Finalists, human_hand: Option<Hand>) -> FinalResult {
        let result = self.table.resolve_final(finalists, human_hand);
        self.phase = Phase::Complete {
            outcome: FinalOutcome::Wager(result.clone()),
        };
        result
    }

    fn out_of_turn(&self, action: &'static str) -> TourneyError {
        TourneyError::OutOfTurn {
            action,
            phase: self.phase.name(),
        }
    }
}

impl Table {
    fn human(&self) -> &Participant {
        &self.participants[self.human.0]
    }

    /// Pair and play rounds from `self.round` on, stopping at the human's
    /// next match or entering the final once the rounds run out. A round
    /// with no matches at all still counts.
    fn play_rounds(&mut self) -> Phase {
        while self.round <= self.config.tournament.rounds {
            let pairings = bracket::pair_round(&self.participants);
            info!(
                tournament_id = %self.id,
                round = self.round,
                matches = pairings.len(),
                "Round started"
            );

            let mut human_match = None;
            for pairing in &pairings {
                if pairing.involves(self.human) {
                    human_match = Some(*pairing);
                    continue;
                }
                let record = bracket::play_automated(
                    &mut self.participants,
                    self.policy.as_mut(),
                    &self.rules,
                    pairing,
                    self.round,
                );
                self.match_log.push(record);
            }

            if let Some(pairing) = human_match {
                info!(
                    round = self.round,
                    bracket = %pairing.bracket,
                    opponent = %self.participants[pairing.opponent_of(self.human).0].name,
                    "Human match ready"
                );
                return Phase::AwaitingDeclaration { pairing };
            }
            self.round += 1;
        }
        self.begin_final()
    }

    fn begin_final(&mut self) -> Phase {
        let finalists = Finalists::select(&self.participants).unwrap_or(Finalists {
            point_winner: self.human,
            all_winner: self.human,
        });
        self.finalists = Some(finalists);

        info!(
            tournament_id = %self.id,
            point_winner = %self.participants[finalists.point_winner.0].name,
            all_winner = %self.participants[finalists.all_winner.0].name,
            "Final phase"
        );

        if finalists.is_coronation() {
            let champion = &mut self.participants[finalists.point_winner.0];
            let bonus = wager::crown(champion);
            info!(
                champion = %champion.name,
                bonus,
                points = champion.points,
                carry_over = champion.carry_over_points,
                "Sole champion, points doubled"
            );
            return Phase::Complete {
                outcome: FinalOutcome::Coronation {
                    champion: finalists.point_winner,
                    bonus,
                },
            };
        }

        let mut book = Book::new(finalists);
        wager::collect_spectator_bets(
            &mut self.participants,
            &mut book,
            self.policy.as_mut(),
            self.config.wager.max_cpu_stake,
        );
        let [(_, point_winner_odds), (_, all_winner_odds)] = book.odds();
        info!(
            pool_point_winner = book.pool(finalists.point_winner),
            pool_all_winner = book.pool(finalists.all_winner),
            odds_point_winner = %point_winner_odds,
            odds_all_winner = %all_winner_odds,
            "Spectator betting closed"
        );
        self.book = Some(book);

        let role = if finalists.contains(self.human) {
            HumanRole::Finalist
        } else {
            HumanRole::Spectator
        };
        Phase::FinalBetting { finalists, role }
    }

    /// Play the final and settle every bet at odds that include the
    /// human's stake.
    fn resolve_final(&mut self, finalists: Finalists, human_hand: Option<Hand>) -> FinalResult {
        let (winner, winning_hand, losing_hand) = match human_hand {
            Some(hand) => {
                let opponent = finalists.other(self.human);
                let opponent_hand = self.policy.choose_hand(&self.participants[opponent.0]);
                if hand.beats(opponent_hand) {
                    (self.human, hand, opponent_hand)
                } else {
                    (opponent, opponent_hand, hand)
                }
            }
            None => {
                let (pw, aw) = (finalists.point_winner, finalists.all_winner);
                let (pw_hand, aw_hand) = hand::draw_decisive(
                    self.policy.as_mut(),
                    &self.participants[pw.0],
                    &self.participants[aw.0],
                );
                if pw_hand.beats(aw_hand) {
                    (pw, pw_hand, aw_hand)
                } else {
                    (aw, aw_hand, pw_hand)
                }
            }
        };

        let book = self.book.get_or_insert_with(|| Book::new(finalists));
        let odds = book.odds();
        let payouts = wager::settle_bets(&mut self.participants, book, winner);

        let human_bet = self.participants[self.human.0].final_bet;
        let human_reward = payouts.iter().find(|p| p.id == self.human).map(|p| p.reward);
        let result = FinalResult {
            winner,
            winner_name: self.participants[winner.0].name.clone(),
            winning_hand,
            losing_hand,
            human_hand,
            odds,
            stake: human_bet.map(|b| b.amount).unwrap_or(0),
            target: human_bet.map(|b| b.target),
            bet_success: human_reward.is_some(),
            bet_reward: human_reward.unwrap_or(0),
            payouts,
        };

        info!(
            tournament_id = %self.id,
            winner = %result.winner_name,
            %winning_hand,
            %losing_hand,
            bet_success = result.bet_success,
            bet_reward = result.bet_reward,
            paid_bets = result.payouts.len(),
            "Final settled"
        );

        result
    }

    fn finalist_named(&self, finalists: &Finalists, name: &str) -> Option<ParticipantId> {
        finalists
            .pair()
            .into_iter()
            .find(|id| self.participants[id.0].name == name)
    }
}

fn is_permutation(order: &[usize], n: usize) -> bool {
    order.len() == n && order.iter().all(|&i| i < n) && order.iter().collect::<HashSet<_>>().len() == n
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
