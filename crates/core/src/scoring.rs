//! Score and resource formulas.
//!
//! Match score: 10 points for a 3-run plus 5 per extra cell.
//! Special activation: 10 points plus 2 per affected cell.
//! The score-boost upgrade multiplies either by 1.1, rounded half-up.

use crate::types::{ResourceKind, TileKind};

/// Points for a matched cluster of `matched` cells.
pub fn match_score(matched: u32, score_boost: bool) -> u32 {
    let base = 10 + matched.saturating_sub(3) * 5;
    apply_boost(base, score_boost)
}

/// Points for a special activation clearing `affected` cells.
pub fn activation_score(affected: u32, score_boost: bool) -> u32 {
    apply_boost(10 + affected * 2, score_boost)
}

/// Multiply by 1.1 with round-half-up, in integer arithmetic.
pub fn apply_boost(points: u32, score_boost: bool) -> u32 {
    if score_boost {
        (points * 11 + 5) / 10
    } else {
        points
    }
}

/// Resource payout for clearing one tile of `kind`.
pub fn yield_for(kind: TileKind, resource_yield: bool) -> (ResourceKind, u32) {
    let units = if resource_yield { 2 } else { 1 };
    (kind.resource(), units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_score_by_size() {
        assert_eq!(match_score(3, false), 10);
        assert_eq!(match_score(4, false), 15);
        assert_eq!(match_score(5, false), 20);
        assert_eq!(match_score(6, false), 25);
    }

    #[test]
    fn test_match_score_boosted() {
        // round(10 * 1.1) = 11, round(15 * 1.1) = 17 (16.5 rounds up)
        assert_eq!(match_score(3, true), 11);
        assert_eq!(match_score(4, true), 17);
        assert_eq!(match_score(5, true), 22);
    }

    #[test]
    fn test_activation_score() {
        assert_eq!(activation_score(8, false), 26);
        assert_eq!(activation_score(8, true), 29);
        assert_eq!(activation_score(0, false), 10);
    }

    #[test]
    fn test_yield_mapping() {
        assert_eq!(yield_for(TileKind::House, false), (ResourceKind::Lumber, 1));
        assert_eq!(yield_for(TileKind::Apartment, false), (ResourceKind::Steel, 1));
        assert_eq!(yield_for(TileKind::Condo, false), (ResourceKind::Cash, 1));
        assert_eq!(yield_for(TileKind::Townhouse, false), (ResourceKind::Brick, 1));
        assert_eq!(yield_for(TileKind::Villa, false), (ResourceKind::Glass, 1));
        assert_eq!(yield_for(TileKind::Commercial, false), (ResourceKind::Concrete, 1));
    }

    #[test]
    fn test_yield_upgrade_doubles_units() {
        assert_eq!(yield_for(TileKind::House, true), (ResourceKind::Lumber, 2));
    }
}
