//! End-of-round aggregation sourced from the session state.

use pounce_core::{credit_award, Outcome, RoundSummary, SavedSession, StatLine};

use crate::RosterEntry;

/// Builds the per-entity breakdown, skipping entities hidden from statistics.
pub(crate) fn breakdown(roster: &[RosterEntry]) -> Vec<StatLine> {
    roster
        .iter()
        .filter(|entry| !entry.exclude_from_stats)
        .map(|entry| StatLine {
            class_tag: entry.entity.class_tag().clone(),
            score: entry.tally,
        })
        .collect()
}

/// Combines the round results with the previously persisted player state.
pub(crate) fn settle(
    outcome: Outcome,
    player_name: &str,
    score: i64,
    remaining_secs: i64,
    breakdown: Vec<StatLine>,
    previous: &SavedSession,
) -> (RoundSummary, SavedSession) {
    let previous_best = previous.score.unwrap_or(0);
    let credits_awarded = credit_award(score);
    let credits_total = previous
        .credits
        .unwrap_or(0)
        .saturating_add(credits_awarded);

    let summary = RoundSummary {
        outcome,
        player_name: player_name.to_owned(),
        score,
        remaining_secs,
        breakdown,
        credits_awarded,
        credits_total,
        new_high_score: score > previous_best,
    };

    let saved = SavedSession {
        score: Some(previous_best.max(score)),
        name: Some(player_name.to_owned()),
        credits: Some(credits_total),
    };

    (summary, saved)
}
