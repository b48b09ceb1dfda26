//! The island record and its per-type profiles.
//!
//! An [`Island`] is the durable description of a player's space. Level
//! attributes only ever grow (see [`crate::upgrade`]) and the token balance is
//! unsigned, so the "never negative" invariant is carried by the type.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ids::{IslandId, PlayerId};

/// Island archetype. Fixes the creation cost, the boundary geometry, and the
/// per-attribute level caps.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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
pub enum IslandType {
    #[default]
    Classic,
    Desert,
    Frozen,
    Mushroom,
}

/// Static numbers attached to an [`IslandType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IslandTypeProfile {
    /// Units charged when the island is created.
    pub cost: u64,
    /// Boundary edge length at size level 0.
    pub base_size: u32,
    /// Boundary growth per size level.
    pub size_step: u32,
    pub max_size_level: u32,
    /// Occupant limit at player-limit level 0.
    pub base_player_limit: u32,
    pub max_player_limit_level: u32,
    pub max_redstone_level: u32,
    pub max_crop_growth_level: u32,
}

impl IslandType {
    pub const fn profile(self) -> IslandTypeProfile {
        match self {
            IslandType::Classic => IslandTypeProfile {
                cost: 100,
                base_size: 50,
                size_step: 25,
                max_size_level: 8,
                base_player_limit: 4,
                max_player_limit_level: 6,
                max_redstone_level: 5,
                max_crop_growth_level: 5,
            },
            IslandType::Desert => IslandTypeProfile {
                cost: 250,
                base_size: 40,
                size_step: 30,
                max_size_level: 7,
                base_player_limit: 4,
                max_player_limit_level: 5,
                max_redstone_level: 5,
                max_crop_growth_level: 3,
            },
            IslandType::Frozen => IslandTypeProfile {
                cost: 250,
                base_size: 45,
                size_step: 25,
                max_size_level: 8,
                base_player_limit: 3,
                max_player_limit_level: 6,
                max_redstone_level: 4,
                max_crop_growth_level: 2,
            },
            IslandType::Mushroom => IslandTypeProfile {
                cost: 500,
                base_size: 60,
                size_step: 25,
                max_size_level: 10,
                base_player_limit: 5,
                max_player_limit_level: 8,
                max_redstone_level: 6,
                max_crop_growth_level: 6,
            },
        }
    }

    /// Units charged to create an island of this type.
    pub const fn cost(self) -> u64 {
        self.profile().cost
    }
}

/// A position plus facing inside a realm.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    #[must_use]
    pub const fn facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Column/cell coordinates the realm must have resolved before a player
    /// can be placed here.
    pub fn cell(&self) -> (i32, i32) {
        ((self.x.floor() as i32) >> 4, (self.z.floor() as i32) >> 4)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new(0.5, 100.0, 0.5)
    }
}

/// Leveled attributes. Each counter starts at 0 and is bounded by the
/// island type's cap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IslandLevels {
    pub size: u32,
    pub player_limit: u32,
    pub redstone_limit: u32,
    pub crop_growth: u32,
    pub weather_unlocked: bool,
}

/// Durable island record.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Island {
    pub id: IslandId,
    pub owner: PlayerId,
    pub name: String,
    pub kind: IslandType,
    pub realm_name: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub levels: IslandLevels,
    pub value: u64,
    /// Island-scoped currency earned through challenges.
    pub tokens: u64,
    pub pvp: bool,
    pub visitors_allowed: bool,
    pub spawn: Location,
}

impl Island {
    /// Builds a fresh level-0 island for `owner`.
    pub fn new(id: IslandId, owner: PlayerId, kind: IslandType, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            name: format!("{}'s island", owner.simple()),
            kind,
            realm_name: format!("island_{}", id.simple()),
            created_at: now,
            last_accessed: now,
            levels: IslandLevels::default(),
            value: 0,
            tokens: 0,
            pvp: false,
            visitors_allowed: true,
            spawn: Location::default(),
        }
    }

    pub fn profile(&self) -> IslandTypeProfile {
        self.kind.profile()
    }

    /// Current boundary edge length derived from the size level.
    pub fn border_size(&self) -> u32 {
        let profile = self.profile();
        profile.base_size + self.levels.size * profile.size_step
    }

    /// Maximum number of simultaneous occupants.
    pub fn player_limit(&self) -> usize {
        (self.profile().base_player_limit + self.levels.player_limit * 2) as usize
    }

    /// Maximum number of active redstone components.
    pub fn redstone_limit(&self) -> u32 {
        32 + self.levels.redstone_limit * 16
    }

    /// Crop growth bonus in percent.
    pub fn crop_growth_bonus(&self) -> u32 {
        self.levels.crop_growth * 10
    }

    /// Whether `location` lies inside the current boundary, which is centred
    /// on the realm origin.
    pub fn contains(&self, location: &Location) -> bool {
        let half = f64::from(self.border_size()) / 2.0;
        location.x.abs() <= half && location.z.abs() <= half
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_accessed {
            self.last_accessed = now;
        }
    }

    /// True when the island has not been accessed for longer than `threshold`.
    pub fn is_idle(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        let threshold = chrono::Duration::from_std(threshold).unwrap_or(chrono::TimeDelta::MAX);
        now.signed_duration_since(self.last_accessed) > threshold
    }

    pub fn add_tokens(&mut self, amount: u64) {
        self.tokens = self.tokens.saturating_add(amount);
    }

    /// Removes `amount` tokens if the balance covers it.
    pub fn spend_tokens(&mut self, amount: u64) -> bool {
        match self.tokens.checked_sub(amount) {
            Some(rest) => {
                self.tokens = rest;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn island() -> Island {
        Island::new(IslandId::random(), PlayerId::random(), IslandType::Classic, Utc::now())
    }

    #[test]
    fn test_new_island_is_level_zero() {
        let island = island();
        assert_eq!(island.levels, IslandLevels::default());
        assert_eq!(island.tokens, 0);
        assert_eq!(island.border_size(), 50);
        assert_eq!(island.player_limit(), 4);
        assert!(island.realm_name.starts_with("island_"));
    }

    #[test]
    fn test_spend_tokens_never_goes_negative() {
        let mut island = island();
        island.add_tokens(10);
        assert!(!island.spend_tokens(11));
        assert_eq!(island.tokens, 10);
        assert!(island.spend_tokens(10));
        assert_eq!(island.tokens, 0);
    }

    #[test]
    fn test_idle_detection() {
        let mut island = island();
        let start = island.last_accessed;
        assert!(!island.is_idle(start + chrono::Duration::seconds(5), Duration::from_secs(10)));
        assert!(island.is_idle(start + chrono::Duration::seconds(11), Duration::from_secs(10)));

        island.touch(start + chrono::Duration::seconds(11));
        assert!(!island.is_idle(start + chrono::Duration::seconds(12), Duration::from_secs(10)));
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut island = island();
        let start = island.last_accessed;
        island.touch(start - chrono::Duration::seconds(30));
        assert_eq!(island.last_accessed, start);
    }

    #[test]
    fn test_island_type_parsing() {
        assert_eq!(IslandType::from_str("mushroom").unwrap(), IslandType::Mushroom);
        assert_eq!(IslandType::from_str("DESERT").unwrap(), IslandType::Desert);
        assert_eq!(IslandType::Frozen.to_string(), "frozen");
    }

    #[test]
    fn test_boundary_contains() {
        let mut island = island();
        assert!(island.contains(&Location::new(25.0, 70.0, -25.0)));
        assert!(!island.contains(&Location::new(30.0, 70.0, 0.0)));

        island.levels.size = 1;
        assert!(island.contains(&Location::new(30.0, 70.0, 0.0)));
    }

    #[test]
    fn test_location_cell() {
        assert_eq!(Location::new(0.5, 64.0, 0.5).cell(), (0, 0));
        assert_eq!(Location::new(17.0, 64.0, -1.0).cell(), (1, -1));
    }
}
