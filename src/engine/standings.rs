//! Standings table.

use super::wager::Finalists;
use crate::types::{Participant, Standing, Title};

/// Participants by ranking points, highest first; equal points keep seat
/// order. Titles appear once finalists have been chosen.
pub fn rank(participants: &[Participant], finalists: Option<&Finalists>) -> Vec<Standing> {
    let mut order: Vec<&Participant> = participants.iter().collect();
    order.sort_by(|a, b| b.ranking_points().cmp(&a.ranking_points()));

    order
        .into_iter()
        .enumerate()
        .map(|(i, p)| Standing {
            rank: i + 1,
            id: p.id,
            name: p.name.clone(),
            is_human: p.is_human,
            points: p.points,
            carry_over_points: p.carry_over_points,
            total_points: p.total_points(),
            bracket: p.bracket,
            wins: p.total_wins,
            losses: p.losses,
            title: finalists.and_then(|f| title_of(f, p)),
        })
        .collect()
}

fn title_of(finalists: &Finalists, p: &Participant) -> Option<Title> {
    if finalists.point_winner == p.id {
        Some(Title::PointChampion)
    } else if finalists.all_winner == p.id {
        Some(Title::Undefeated)
    } else {
        None
    }
}
