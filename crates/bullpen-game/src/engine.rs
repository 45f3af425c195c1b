//! The game state machine: dealing, move submission, ordered resolution,
//! penalties, and the final ranking.
//!
//! ```text
//! Unstarted ──start──→ ChooseCard ──(card below every top)──→ ChooseSlot
//!                        │    ↑                                   │
//!                        │    └──────────choose_slot──────────────┘
//!                        └──(round 10 resolved, hands empty)──→ Ended
//! ```
//!
//! A round has two halves. During submission every player holds
//! `must_move` and [`Game::play`] clears it. Once nobody owes a card,
//! [`Game::resolve_next`] takes the plays one at a time, lowest rank first.
//! The caller paces those calls; the engine never sleeps.

use bullpen_protocol::{Card, GameStatus, MemberView, PlayerId, SLOT_COUNT, Standing};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cards::{HAND_SIZE, ROUNDS, generate_deck, shuffle};
use crate::{Board, GameError};

// ---------------------------------------------------------------------------
// Player and Play
// ---------------------------------------------------------------------------

/// A seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    hand: Vec<Card>,
    /// Cards this player was charged for, in the order they were taken.
    taken: Vec<Card>,
    must_move: bool,
}

impl Player {
    fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            hand: Vec::new(),
            taken: Vec::new(),
            must_move: false,
        }
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn taken(&self) -> &[Card] {
        &self.taken
    }

    /// Accumulated bull points.
    pub fn penalty(&self) -> u32 {
        self.taken.iter().map(|c| c.penalty).sum()
    }

    pub fn must_move(&self) -> bool {
        self.must_move
    }

    /// Public view of the seat, without the hand.
    pub fn view(&self, is_host: bool, connected: bool) -> MemberView {
        MemberView {
            player_id: self.id,
            name: self.name.clone(),
            is_host,
            must_move: self.must_move,
            penalty: self.penalty(),
            connected,
        }
    }
}

/// A card submitted this round, bound to the player who submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    pub player: PlayerId,
    pub card: Card,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Whether [`Game::seat`] added someone or recognised a returning player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seating {
    New,
    Returning,
}

/// One play resolved into a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub player: PlayerId,
    pub card: Card,
    pub slot: usize,
    /// Cards removed from the slot and charged to `player`.
    pub taken: Vec<Card>,
}

impl Placement {
    /// Bull points charged for this placement.
    pub fn penalty(&self) -> u32 {
        self.taken.iter().map(|c| c.penalty).sum()
    }
}

/// What happened once a round ran out of plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEnd {
    /// A fresh round opened; everyone owes a card again.
    Next { round: u32 },
    /// Round 10 is done and every hand is empty.
    GameOver { standings: Vec<Standing> },
}

/// Result of resolving a single play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The play landed. `round_end` is set when it was the last of the round.
    Placed {
        placement: Placement,
        round_end: Option<RoundEnd>,
    },
    /// The card is lower than every top card; `player` must pick a slot
    /// before anything else resolves.
    AwaitingSlot { player: PlayerId, card: Card },
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// One table's complete rules state.
///
/// Invariant: every card of the dealt deck is in exactly one place — a
/// hand, a pending play, a slot, or a player's taken pile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    status: GameStatus,
    round: u32,
    board: Board,
    /// Seats in join order.
    players: Vec<Player>,
    /// The current round's submitted, unresolved plays.
    plays: Vec<Play>,
    /// Set only in `ChooseSlot`.
    chooser: Option<PlayerId>,
    /// Plays resolved so far in the current round.
    resolved: usize,
    min_players: usize,
    standings: Vec<Standing>,
}

impl Game {
    /// An empty, unstarted table.
    ///
    /// # Errors
    /// [`GameError::InvalidConfiguration`] when `min_players < 2`.
    pub fn new(min_players: usize) -> Result<Self, GameError> {
        if min_players < 2 {
            return Err(GameError::InvalidConfiguration(format!(
                "min_players must be at least 2, got {min_players}"
            )));
        }
        Ok(Self {
            status: GameStatus::Unstarted,
            round: 0,
            board: Board::default(),
            players: Vec::new(),
            plays: Vec::new(),
            chooser: None,
            resolved: 0,
            min_players,
            standings: Vec::new(),
        })
    }

    // -- Accessors ---------------------------------------------------------

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn plays(&self) -> &[Play] {
        &self.plays
    }

    /// The player who must pick a slot, while in `ChooseSlot`.
    pub fn chooser(&self) -> Option<PlayerId> {
        self.chooser
    }

    /// Final ranking; empty until the game has ended.
    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    /// Players who still owe something: the chooser during the slot pause,
    /// otherwise everyone holding `must_move`.
    pub fn waiting_on(&self) -> Vec<PlayerId> {
        match (self.status, self.chooser) {
            (GameStatus::ChooseSlot, Some(chooser)) => vec![chooser],
            _ => self
                .players
                .iter()
                .filter(|p| p.must_move)
                .map(|p| p.id)
                .collect(),
        }
    }

    /// `true` once every seat has submitted a card this round.
    pub fn everyone_played(&self) -> bool {
        self.status == GameStatus::ChooseCard
            && !self.players.is_empty()
            && self.players.iter().all(|p| !p.must_move)
    }

    // -- Membership --------------------------------------------------------

    /// Adds a seat, or recognises a returning player.
    ///
    /// # Errors
    /// [`GameError::AlreadyStarted`] for a new player after `start`.
    pub fn seat(&mut self, id: PlayerId, name: &str) -> Result<Seating, GameError> {
        if self.player(id).is_some() {
            return Ok(Seating::Returning);
        }
        if self.status != GameStatus::Unstarted {
            return Err(GameError::AlreadyStarted);
        }
        self.players.push(Player::new(id, name.to_string()));
        Ok(Seating::New)
    }

    /// Removes a seat. Only possible while no game is running.
    pub fn unseat(&mut self, id: PlayerId) -> Result<Player, GameError> {
        if self.status.is_running() {
            return Err(GameError::GameInProgress);
        }
        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(GameError::NotSeated(id))?;
        Ok(self.players.remove(index))
    }

    // -- Start -------------------------------------------------------------

    /// Deals a fresh deck and opens round 1.
    ///
    /// Each seat gets ten cards in join order; the four cards after the
    /// hands seed the slots. Legal from `Unstarted` and, for a rematch,
    /// from `Ended`.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        if self.status.is_running() {
            return Err(GameError::WrongPhase(self.status));
        }
        let have = self.players.len();
        if have < self.min_players {
            return Err(GameError::NotEnoughPlayers {
                have,
                need: self.min_players,
            });
        }

        let mut deck = generate_deck(have)?;
        shuffle(&mut deck, rng);

        let mut cards = deck.into_iter();
        for player in &mut self.players {
            player.hand = cards.by_ref().take(HAND_SIZE).collect();
            player.taken.clear();
            player.must_move = true;
        }
        let seeds: Vec<Card> = cards.collect();
        let seeds: [Card; SLOT_COUNT] = seeds.try_into().map_err(|rest: Vec<Card>| {
            GameError::Corrupted(format!("expected {SLOT_COUNT} seed cards, got {}", rest.len()))
        })?;

        self.board = Board::seeded(seeds);
        self.plays.clear();
        self.chooser = None;
        self.resolved = 0;
        self.standings.clear();
        self.round = 1;
        self.status = GameStatus::ChooseCard;

        tracing::info!(players = have, "cards dealt, round 1 open");
        Ok(())
    }

    // -- Submission --------------------------------------------------------

    /// Records `player`'s card for this round.
    ///
    /// # Errors
    /// - [`GameError::NotStarted`] / [`GameError::WrongPhase`] outside `ChooseCard`
    /// - [`GameError::NotSeated`] for an unknown player
    /// - [`GameError::AlreadyMoved`] when `must_move` is already clear
    /// - [`GameError::CardNotOwned`] when the card isn't in the hand
    pub fn play(&mut self, player: PlayerId, card_id: u32) -> Result<(), GameError> {
        match self.status {
            GameStatus::ChooseCard => {}
            GameStatus::Unstarted => return Err(GameError::NotStarted),
            other => return Err(GameError::WrongPhase(other)),
        }
        let seat = self
            .players
            .iter_mut()
            .find(|p| p.id == player)
            .ok_or(GameError::NotSeated(player))?;
        if !seat.must_move {
            return Err(GameError::AlreadyMoved(player));
        }
        let index = seat
            .hand
            .iter()
            .position(|c| c.id == card_id)
            .ok_or(GameError::CardNotOwned {
                player,
                card: card_id,
            })?;

        let card = seat.hand.remove(index);
        seat.must_move = false;
        tracing::debug!(%player, card = card.rank, round = self.round, "card submitted");
        self.plays.push(Play { player, card });
        Ok(())
    }

    /// Plays the lowest card of every player who still owes one.
    pub fn auto_play(&mut self) -> Vec<Play> {
        if self.status != GameStatus::ChooseCard {
            return Vec::new();
        }
        let owing: Vec<(PlayerId, u32)> = self
            .players
            .iter()
            .filter(|p| p.must_move)
            .filter_map(|p| p.hand.iter().min_by_key(|c| c.rank).map(|c| (p.id, c.id)))
            .collect();

        let mut played = Vec::with_capacity(owing.len());
        for (player, card_id) in owing {
            if self.play(player, card_id).is_ok() {
                if let Some(play) = self.plays.last() {
                    played.push(play.clone());
                }
            }
        }
        played
    }

    // -- Resolution --------------------------------------------------------

    /// Resolves the lowest-ranked pending play.
    ///
    /// # Errors
    /// - [`GameError::WrongPhase`] outside `ChooseCard`
    /// - [`GameError::PlaysOutstanding`] while someone still owes a card
    /// - [`GameError::Corrupted`] if the pending plays don't add up
    pub fn resolve_next(&mut self) -> Result<Step, GameError> {
        if self.status != GameStatus::ChooseCard {
            return Err(GameError::WrongPhase(self.status));
        }
        if !self.everyone_played() {
            return Err(GameError::PlaysOutstanding(self.waiting_on().len()));
        }
        let index = self.lowest_play()?;
        let play = &self.plays[index];
        if self.player(play.player).is_none() {
            return Err(GameError::Corrupted(format!(
                "play of card {} belongs to unseated player {}",
                play.card.id, play.player
            )));
        }

        let Some(slot) = self.board.target_for(play.card.rank) else {
            let (player, card) = (play.player, play.card.clone());
            self.chooser = Some(player);
            self.status = GameStatus::ChooseSlot;
            tracing::debug!(%player, card = card.rank, "card below every slot, waiting for a choice");
            return Ok(Step::AwaitingSlot { player, card });
        };

        let play = self.plays.remove(index);
        let taken = self.board.place(slot, play.card.clone());
        let placement = self.commit(play, slot, taken)?;
        let round_end = self.close_round_if_done();
        Ok(Step::Placed {
            placement,
            round_end,
        })
    }

    /// The designated player takes the slot at `index` for their pending
    /// card, whatever its size.
    ///
    /// # Errors
    /// - [`GameError::WrongPhase`] outside `ChooseSlot`
    /// - [`GameError::NotYourChoice`] for anyone but the chooser
    /// - [`GameError::SlotOutOfRange`] for `index >= 4`
    pub fn choose_slot(
        &mut self,
        player: PlayerId,
        index: usize,
    ) -> Result<(Placement, Option<RoundEnd>), GameError> {
        if self.status != GameStatus::ChooseSlot {
            return Err(GameError::WrongPhase(self.status));
        }
        if self.chooser != Some(player) {
            return Err(GameError::NotYourChoice(player));
        }
        if index >= SLOT_COUNT {
            return Err(GameError::SlotOutOfRange(index));
        }
        let pending = self.lowest_play()?;
        if self.plays[pending].player != player {
            return Err(GameError::Corrupted(format!(
                "pending play belongs to {}, chooser is {player}",
                self.plays[pending].player
            )));
        }

        let play = self.plays.remove(pending);
        let taken = self.board.take(index, play.card.clone());
        let placement = self.commit(play, index, taken)?;
        self.chooser = None;
        self.status = GameStatus::ChooseCard;
        let round_end = self.close_round_if_done();
        Ok((placement, round_end))
    }

    /// Resolves plays until the round ends or a slot choice is needed.
    pub fn resolve_round(&mut self) -> Result<Vec<Step>, GameError> {
        let mut steps = Vec::new();
        loop {
            let step = self.resolve_next()?;
            let stop = match &step {
                Step::AwaitingSlot { .. } => true,
                Step::Placed { round_end, .. } => round_end.is_some(),
            };
            steps.push(step);
            if stop {
                return Ok(steps);
            }
        }
    }

    /// Puts the current round back to submission: unresolved plays return
    /// to their owners' hands and those owners owe a card again.
    ///
    /// Penalties already charged stay charged.
    pub fn rewind_round(&mut self) -> Result<Vec<PlayerId>, GameError> {
        if !self.status.is_running() {
            return Err(GameError::WrongPhase(self.status));
        }
        let mut returned = Vec::with_capacity(self.plays.len());
        for play in std::mem::take(&mut self.plays) {
            match self.players.iter_mut().find(|p| p.id == play.player) {
                Some(seat) => {
                    seat.hand.push(play.card);
                    seat.must_move = true;
                    returned.push(seat.id);
                }
                None => {
                    tracing::warn!(player = %play.player, card = play.card.rank, "dropping play of unseated player");
                }
            }
        }
        self.chooser = None;
        self.status = GameStatus::ChooseCard;
        tracing::info!(round = self.round, returned = returned.len(), "round rewound");
        Ok(returned)
    }

    // -- Internals ---------------------------------------------------------

    fn lowest_play(&self) -> Result<usize, GameError> {
        self.plays
            .iter()
            .enumerate()
            .min_by_key(|(_, play)| play.card.rank)
            .map(|(index, _)| index)
            .ok_or_else(|| GameError::Corrupted("no pending plays to resolve".into()))
    }

    fn commit(&mut self, play: Play, slot: usize, taken: Vec<Card>) -> Result<Placement, GameError> {
        let seat = self
            .players
            .iter_mut()
            .find(|p| p.id == play.player)
            .ok_or_else(|| GameError::Corrupted(format!("{} vanished mid-resolution", play.player)))?;
        seat.taken.extend(taken.iter().cloned());
        self.resolved += 1;

        let placement = Placement {
            player: play.player,
            card: play.card,
            slot,
            taken,
        };
        tracing::debug!(
            player = %placement.player,
            card = placement.card.rank,
            slot,
            penalty = placement.penalty(),
            "play resolved"
        );
        Ok(placement)
    }

    fn close_round_if_done(&mut self) -> Option<RoundEnd> {
        if !self.plays.is_empty() {
            return None;
        }
        let hands_empty = self.players.iter().all(|p| p.hand.is_empty());
        if self.round >= ROUNDS && self.resolved == self.players.len() && hands_empty {
            self.status = GameStatus::Ended;
            self.standings = self.rank();
            tracing::info!(round = self.round, "game over");
            return Some(RoundEnd::GameOver {
                standings: self.standings.clone(),
            });
        }

        self.round += 1;
        self.resolved = 0;
        for player in &mut self.players {
            player.must_move = true;
        }
        tracing::debug!(round = self.round, "round open");
        Some(RoundEnd::Next { round: self.round })
    }

    /// Ascending by penalty; equal totals keep join order (stable sort).
    fn rank(&self) -> Vec<Standing> {
        let mut order: Vec<&Player> = self.players.iter().collect();
        order.sort_by_key(|p| p.penalty());
        order
            .into_iter()
            .enumerate()
            .map(|(i, p)| Standing {
                position: i + 1,
                player_id: p.id,
                name: p.name.clone(),
                penalty: p.penalty(),
            })
            .collect()
    }
}
