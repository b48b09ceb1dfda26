//! Leveled island attributes and their cost curves.
//!
//! Every upgrade costs two currencies:
//! - units, paid from the player's wallet: `unit_cost(level)`, strictly
//!   increasing per attribute
//! - tokens, paid from the island balance: a stepped table for size, linear for
//!   the other counters, fixed for the one-shot weather unlock
//!
//! [`UpgradeKind::quote`] is the single source for both numbers, for charging
//! as well as for display.

use crate::island::{Island, IslandType};

/// Token cost of the next size level, indexed by the current size level.
/// Levels past the end of the table reuse the last step.
const SIZE_TOKEN_STEPS: [u64; 8] = [0, 5, 10, 10, 20, 20, 35, 50];

const WEATHER_UNIT_COST: u64 = 5_000;
const WEATHER_TOKEN_COST: u64 = 25;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UpgradeKind {
    Size,
    PlayerLimit,
    RedstoneLimit,
    CropGrowth,
    /// One-shot unlock.
    Weather,
}

/// `linear * (level + 1) + square * level²`, saturating.
fn curve(linear: u64, square: u64, level: u32) -> u64 {
    let level = u64::from(level);
    linear
        .saturating_mul(level + 1)
        .saturating_add(square.saturating_mul(level.saturating_mul(level)))
}

/// Price of moving one attribute from `from_level` to `to_level`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpgradeQuote {
    pub kind: UpgradeKind,
    pub from_level: u32,
    pub to_level: u32,
    pub units: u64,
    pub tokens: u64,
}

impl UpgradeKind {
    /// Highest level reachable for this attribute on an island type.
    pub fn max_level(self, island_type: IslandType) -> u32 {
        let profile = island_type.profile();
        match self {
            UpgradeKind::Size => profile.max_size_level,
            UpgradeKind::PlayerLimit => profile.max_player_limit_level,
            UpgradeKind::RedstoneLimit => profile.max_redstone_level,
            UpgradeKind::CropGrowth => profile.max_crop_growth_level,
            UpgradeKind::Weather => 1,
        }
    }

    /// Units charged to go from `level` to `level + 1`.
    pub fn unit_cost(self, level: u32) -> u64 {
        match self {
            UpgradeKind::Size => curve(0, 1_000, level.saturating_add(1)),
            UpgradeKind::PlayerLimit => curve(750, 250, level),
            UpgradeKind::RedstoneLimit => curve(600, 200, level),
            UpgradeKind::CropGrowth => curve(800, 400, level),
            UpgradeKind::Weather => WEATHER_UNIT_COST,
        }
    }

    /// Tokens charged to go from `level` to `level + 1`.
    pub fn token_cost(self, level: u32) -> u64 {
        let next = u64::from(level) + 1;
        match self {
            UpgradeKind::Size => {
                let index = (level as usize).min(SIZE_TOKEN_STEPS.len() - 1);
                SIZE_TOKEN_STEPS[index]
            }
            UpgradeKind::PlayerLimit => 3 * next,
            UpgradeKind::RedstoneLimit => 2 * next,
            UpgradeKind::CropGrowth => 4 * next,
            UpgradeKind::Weather => WEATHER_TOKEN_COST,
        }
    }

    /// Current level of this attribute on `island`.
    pub fn level(self, island: &Island) -> u32 {
        match self {
            UpgradeKind::Size => island.levels.size,
            UpgradeKind::PlayerLimit => island.levels.player_limit,
            UpgradeKind::RedstoneLimit => island.levels.redstone_limit,
            UpgradeKind::CropGrowth => island.levels.crop_growth,
            UpgradeKind::Weather => u32::from(island.levels.weather_unlocked),
        }
    }

    /// Prices the next level, or `None` once the attribute is capped.
    pub fn quote(self, island: &Island) -> Option<UpgradeQuote> {
        let from_level = self.level(island);
        if from_level >= self.max_level(island.kind) {
            return None;
        }

        Some(UpgradeQuote {
            kind: self,
            from_level,
            to_level: from_level + 1,
            units: self.unit_cost(from_level),
            tokens: self.token_cost(from_level),
        })
    }
}

impl Island {
    /// Charges the quote's tokens and raises exactly one level.
    ///
    /// Returns `false` without touching the island if the quote is stale
    /// (level moved since quoting) or the token balance is short. Units are
    /// settled by the caller against the wallet.
    pub fn apply_upgrade(&mut self, quote: &UpgradeQuote) -> bool {
        if quote.kind.level(self) != quote.from_level || self.tokens < quote.tokens {
            return false;
        }

        self.tokens -= quote.tokens;
        match quote.kind {
            UpgradeKind::Size => self.levels.size += 1,
            UpgradeKind::PlayerLimit => self.levels.player_limit += 1,
            UpgradeKind::RedstoneLimit => self.levels.redstone_limit += 1,
            UpgradeKind::CropGrowth => self.levels.crop_growth += 1,
            UpgradeKind::Weather => self.levels.weather_unlocked = true,
        }
        true
    }
}
