// Snake-draft turn order.
//
// Odd rounds run in draft order, even rounds in reverse. Nothing here is
// stored: the team on the clock is derived from (round, pick) and the
// round-1 order alone.

use std::ops::RangeInclusive;

use crate::draft::model::PickCoord;
use crate::error::DraftError;

/// Overall pick numbers belonging to `round`. Saturates at `u32::MAX`
/// for rounds no real draft reaches.
pub fn pick_range(round: u32, num_teams: u32) -> RangeInclusive<u32> {
    let first = round
        .saturating_sub(1)
        .saturating_mul(num_teams)
        .saturating_add(1);
    first..=first.saturating_add(num_teams).saturating_sub(1)
}

/// `ceil(pick / num_teams)`.
pub fn round_from_pick(pick: u32, num_teams: u32) -> u32 {
    pick.div_ceil(num_teams)
}

/// The team drafting at `(round, pick)`.
///
/// Returns `PickOutOfRound` when `pick` does not belong to `round` (or the
/// order is empty) instead of indexing into the wrong slot.
pub fn team_for_pick(round: u32, pick: u32, draft_order: &[String]) -> Result<&str, DraftError> {
    let num_teams = draft_order.len() as u32;
    let range = pick_range(round, num_teams);
    if round == 0 || num_teams == 0 || !range.contains(&pick) {
        return Err(DraftError::PickOutOfRound {
            round,
            pick,
            first: *range.start(),
            last: *range.end(),
        });
    }

    let index_in_round = (pick - range.start()) as usize;
    let index = if round % 2 == 0 {
        draft_order.len() - 1 - index_in_round
    } else {
        index_in_round
    };
    Ok(draft_order[index].as_str())
}

/// Whether `team_name` is the team on the clock at `(round, pick)`.
///
/// An out-of-round coordinate never validates.
pub fn validate_team_for_pick(
    round: u32,
    pick: u32,
    team_name: &str,
    draft_order: &[String],
) -> bool {
    team_for_pick(round, pick, draft_order).is_ok_and(|expected| expected == team_name)
}

/// Check that `coord` names a real pick of a draft with this shape.
pub fn check_coordinate(coord: PickCoord, num_rounds: u32, num_teams: u32) -> Result<(), DraftError> {
    if coord.round == 0 || coord.round > num_rounds {
        return Err(DraftError::PickOutOfRound {
            round: coord.round,
            pick: coord.pick,
            first: 1,
            last: num_rounds.saturating_mul(num_teams),
        });
    }
    let range = pick_range(coord.round, num_teams);
    if !range.contains(&coord.pick) {
        return Err(DraftError::PickOutOfRound {
            round: coord.round,
            pick: coord.pick,
            first: *range.start(),
            last: *range.end(),
        });
    }
    Ok(())
}
