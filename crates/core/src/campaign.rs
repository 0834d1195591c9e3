//! Campaign module - the static level table and level results
//!
//! Fifteen levels across five regions. Targets climb from 100 to 800 in
//! steps of 50; locked gate and foundation block counts ramp with level.
//! Locked cards are reserved for custom configs.

use crate::types::{EXTRA_MOVES_BONUS, MOVE_BONUS_SCORE};

/// The five campaign regions, in unlock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Suburban,
    Urban,
    Coastal,
    Mountain,
    Metro,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Suburban => "suburban",
            Region::Urban => "urban",
            Region::Coastal => "coastal",
            Region::Mountain => "mountain",
            Region::Metro => "metro",
        }
    }
}

/// Static configuration for one level attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    pub number: u32,
    pub name: &'static str,
    pub region: Region,
    pub target_score: u32,
    pub move_limit: u32,
    pub locked_gates: u8,
    pub foundation_blocks: u8,
    pub locked_cards: u8,
}

impl LevelConfig {
    /// Move budget for an attempt, including the extra-moves upgrade.
    pub fn move_budget(&self, extra_moves: bool) -> u32 {
        if extra_moves {
            self.move_limit + EXTRA_MOVES_BONUS
        } else {
            self.move_limit
        }
    }
}

macro_rules! level {
    ($n:expr, $name:expr, $region:ident, $target:expr, $moves:expr, $gates:expr, $blocks:expr) => {
        LevelConfig {
            number: $n,
            name: $name,
            region: Region::$region,
            target_score: $target,
            move_limit: $moves,
            locked_gates: $gates,
            foundation_blocks: $blocks,
            locked_cards: 0,
        }
    };
}

/// The full campaign table.
pub const CAMPAIGN: [LevelConfig; 15] = [
    level!(1, "Suburban Start", Suburban, 100, 20, 0, 0),
    level!(2, "Neighborhood Growth", Suburban, 150, 18, 1, 0),
    level!(3, "Community Hub", Suburban, 200, 16, 1, 1),
    level!(4, "City Entrance", Urban, 250, 20, 2, 1),
    level!(5, "Downtown Development", Urban, 300, 18, 2, 2),
    level!(6, "Business District", Urban, 350, 16, 3, 2),
    level!(7, "Beachfront Properties", Coastal, 400, 22, 3, 3),
    level!(8, "Marina Development", Coastal, 450, 20, 4, 3),
    level!(9, "Coastal Paradise", Coastal, 500, 18, 4, 4),
    level!(10, "Mountain Retreat", Mountain, 550, 24, 4, 4),
    level!(11, "Ski Resort", Mountain, 600, 22, 5, 4),
    level!(12, "Mountain Village", Mountain, 650, 20, 5, 5),
    level!(13, "Metro Center", Metro, 700, 26, 5, 5),
    level!(14, "Financial District", Metro, 750, 24, 6, 5),
    level!(15, "Metropolitan Empire", Metro, 800, 22, 6, 6),
];

/// Look up a campaign level by its 1-based number.
pub fn level(number: u32) -> Option<&'static LevelConfig> {
    if number == 0 {
        return None;
    }
    CAMPAIGN.get(number as usize - 1)
}

/// Outcome summary for a completed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelResult {
    /// 1 to 3 stars from the score/target ratio.
    pub stars: u8,
    /// Experience awarded: round(score * stars / 2).
    pub experience: u32,
    /// Bonus score for unspent moves.
    pub move_bonus: u32,
}

/// Grade a completed level.
pub fn level_result(score: u32, target_score: u32, moves_remaining: u32) -> LevelResult {
    let stars = stars_for(score, target_score);
    let experience = (score as u64 * stars as u64 + 1) / 2;
    LevelResult {
        stars,
        experience: experience as u32,
        move_bonus: moves_remaining * MOVE_BONUS_SCORE,
    }
}

fn stars_for(score: u32, target_score: u32) -> u8 {
    // Ratio thresholds without float drift: score >= 1.5x target etc.
    if score as u64 * 2 >= target_score as u64 * 3 {
        3
    } else if score as u64 * 4 >= target_score as u64 * 5 {
        2
    } else {
        1
    }
}
