//! Card catalog: deck generation, penalty values, shuffling.

use bullpen_protocol::{Card, SLOT_COUNT};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::GameError;

/// Cards dealt to each player at the start of a game.
pub const HAND_SIZE: usize = 10;

/// Rounds in a game. One card leaves every hand per round.
pub const ROUNDS: u32 = HAND_SIZE as u32;

/// Number of cards in a deck for `player_count` players: a hand each plus
/// one seed card per slot.
pub fn deck_size(player_count: usize) -> usize {
    player_count * HAND_SIZE + SLOT_COUNT
}

/// Bull points carried by a card of the given rank.
///
/// Checked in this order, first match wins:
/// `55 → 7`, `% 10 == 0 → 3`, `% 10 == 5 → 2`, `% 11 == 0 → 5`, else `1`.
pub fn penalty_for(rank: u32) -> u32 {
    if rank == 55 {
        7
    } else if rank % 10 == 0 {
        3
    } else if rank % 10 == 5 {
        2
    } else if rank % 11 == 0 {
        5
    } else {
        1
    }
}

/// Generates the ordered deck for `player_count` players.
///
/// Ranks run `1..=deck_size(player_count)` and double as card ids.
///
/// # Errors
/// [`GameError::InvalidConfiguration`] when `player_count < 2`.
pub fn generate_deck(player_count: usize) -> Result<Vec<Card>, GameError> {
    if player_count < 2 {
        return Err(GameError::InvalidConfiguration(format!(
            "a deck needs at least 2 players, got {player_count}"
        )));
    }
    let size = deck_size(player_count) as u32;
    Ok((1..=size)
        .map(|rank| Card {
            id: rank,
            rank,
            penalty: penalty_for(rank),
            image: format!("/images/cards/{rank}.png"),
        })
        .collect())
}

/// Uniformly permutes `deck` in place.
///
/// Production passes a thread RNG; tests pass a seeded `StdRng`.
pub fn shuffle<R: Rng + ?Sized>(deck: &mut [Card], rng: &mut R) {
    deck.shuffle(rng);
}
