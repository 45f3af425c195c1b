//! Room configuration.

use std::time::Duration;

use bullpen_tick::CountdownConfig;
use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Largest table the card catalog supports: 10 hands plus 4 seeds is 104
/// cards.
pub const MAX_TABLE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// ExpiryPolicy
// ---------------------------------------------------------------------------

/// What the room does when the countdown reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Push `Countdown { remaining: 0 }` and nothing else.
    #[default]
    Advisory,
    /// Play the lowest card for everyone still owing one; during a slot
    /// choice, take the cheapest slot for the chooser.
    AutoPlay,
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings for one room. The manager holds a default copy and every
/// room gets its own clone at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Seated players required before the host may start.
    pub min_players: usize,

    /// Seats available. Rejoins of known players are accepted even when full.
    pub max_players: usize,

    /// Pause between two resolved plays.
    pub play_delay: Duration,

    /// Value the per-round countdown restarts from. 0 disables it.
    pub countdown_secs: u32,

    /// Real time per countdown decrement.
    pub countdown_period: Duration,

    pub expiry: ExpiryPolicy,

    /// How long a room may sit with no connected member before the reaper
    /// closes it.
    pub empty_room_grace: Duration,

    /// Command channel capacity of the room actor.
    pub channel_size: usize,

    /// Fixed RNG seed for deals. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: MAX_TABLE_SIZE,
            play_delay: Duration::from_secs(1),
            countdown_secs: 30,
            countdown_period: Duration::from_secs(1),
            expiry: ExpiryPolicy::Advisory,
            empty_room_grace: Duration::from_secs(60),
            channel_size: 64,
            seed: None,
        }
    }
}

impl RoomConfig {
    /// Checks that the values describe a playable room.
    ///
    /// # Errors
    /// [`RoomError::InvalidConfiguration`] when player limits fall outside
    /// `2..=10`, `min_players > max_players`, or the channel has no capacity.
    pub fn validated(self) -> Result<Self, RoomError> {
        if self.min_players < 2 {
            return Err(RoomError::InvalidConfiguration(format!(
                "min_players must be at least 2, got {}",
                self.min_players
            )));
        }
        if self.max_players > MAX_TABLE_SIZE {
            return Err(RoomError::InvalidConfiguration(format!(
                "max_players must be at most {MAX_TABLE_SIZE}, got {}",
                self.max_players
            )));
        }
        if self.min_players > self.max_players {
            return Err(RoomError::InvalidConfiguration(format!(
                "min_players ({}) exceeds max_players ({})",
                self.min_players, self.max_players
            )));
        }
        if self.channel_size == 0 {
            return Err(RoomError::InvalidConfiguration(
                "channel_size must be non-zero".into(),
            ));
        }
        Ok(self)
    }

    pub(crate) fn countdown(&self) -> CountdownConfig {
        CountdownConfig {
            seconds: self.countdown_secs,
            period: self.countdown_period,
            ..Default::default()
        }
    }
}
