//! The final decision table.
//!
//! | unresolved conflict | Low     | Moderate | High   |
//! |---------------------|---------|----------|--------|
//! | no                  | clarify | answer   | answer |
//! | yes                 | clarify | clarify  | answer |
//!
//! A blocked safety check never reaches the table: the boundary's outcome is
//! the action.

use super::output::{RecommendedAction, ScoreBand};

/// Table lookup for a single band.
pub fn table_action(unresolved_conflict: bool, band: ScoreBand) -> RecommendedAction {
    match (unresolved_conflict, band) {
        (_, ScoreBand::Low) => RecommendedAction::Clarify,
        (false, ScoreBand::Moderate) => RecommendedAction::Answer,
        (true, ScoreBand::Moderate) => RecommendedAction::Clarify,
        (_, ScoreBand::High) => RecommendedAction::Answer,
    }
}

/// Pick the band and action for an aggregate that may sit on a floor.
///
/// `bands` is lowest first.  When the candidate bands disagree the more
/// conservative action wins; when they agree the lower band is reported.
pub fn resolve(bands: &[ScoreBand], unresolved_conflict: bool) -> (ScoreBand, RecommendedAction) {
    let mut iter = bands.iter().copied();
    let first = iter.next().unwrap_or(ScoreBand::Low);
    let mut chosen = (first, table_action(unresolved_conflict, first));
    for band in iter {
        let action = table_action(unresolved_conflict, band);
        if action.conservatism() > chosen.1.conservatism() {
            chosen = (band, action);
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_cells() {
        use RecommendedAction::*;
        use ScoreBand::*;
        assert_eq!(table_action(false, Low), Clarify);
        assert_eq!(table_action(false, Moderate), Answer);
        assert_eq!(table_action(false, High), Answer);
        assert_eq!(table_action(true, Low), Clarify);
        assert_eq!(table_action(true, Moderate), Clarify);
        assert_eq!(table_action(true, High), Answer);
    }

    #[test]
    fn test_tie_goes_to_conservative_action() {
        use ScoreBand::*;
        // On the moderate floor, Low says clarify and Moderate says answer.
        assert_eq!(resolve(&[Low, Moderate], false), (Low, RecommendedAction::Clarify));
        // On the high floor with a blend conflict, Moderate says clarify.
        assert_eq!(resolve(&[Moderate, High], true), (Moderate, RecommendedAction::Clarify));
        // Agreeing bands report the lower one.
        assert_eq!(resolve(&[Moderate, High], false), (Moderate, RecommendedAction::Answer));
        assert_eq!(resolve(&[High], true), (High, RecommendedAction::Answer));
    }
}
