//! The shared board: four slots and the placement rule.

use bullpen_protocol::{Card, SLOT_COUNT};
use serde::{Deserialize, Serialize};

/// A slot holding this many cards is full; the next card placed on it
/// takes the row.
pub const SLOT_CAPACITY: usize = 5;

/// One ordered stack of cards, bottom first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot {
    cards: Vec<Card>,
}

impl Slot {
    /// The card on top, i.e. the one placements compare against.
    pub fn top(&self) -> Option<&Card> {
        self.cards.last()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.cards.len() >= SLOT_CAPACITY
    }

    /// Sum of the penalties of every card in the slot.
    pub fn penalty(&self) -> u32 {
        self.cards.iter().map(|c| c.penalty).sum()
    }

    /// Empties the slot, leaves only `card` in it, and returns what was
    /// removed.
    fn reset_with(&mut self, card: Card) -> Vec<Card> {
        std::mem::replace(&mut self.cards, vec![card])
    }
}

/// Four slots addressed by index `0..4`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    slots: [Slot; SLOT_COUNT],
}

impl Board {
    /// A board whose slots each start with one of `seeds`.
    pub fn seeded(seeds: [Card; SLOT_COUNT]) -> Self {
        Self {
            slots: seeds.map(|card| Slot { cards: vec![card] }),
        }
    }

    pub fn slots(&self) -> &[Slot; SLOT_COUNT] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Index of the slot a card of `rank` belongs on: the one whose top
    /// card has the largest rank still strictly below `rank`.
    ///
    /// Slots are scanned from 0 and only a strictly better match replaces
    /// the current one, so the lowest index wins a tie. `None` means the
    /// card is lower than every top card and the player must choose.
    pub fn target_for(&self, rank: u32) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(top) = slot.top() else { continue };
            if top.rank >= rank {
                continue;
            }
            match best {
                Some((_, best_rank)) if best_rank >= top.rank => {}
                _ => best = Some((index, top.rank)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Places `card` on the slot at `index` by the ordinary rule.
    ///
    /// Appends when there is room; when the slot is already full, the slot
    /// is cleared and restarted with `card`. Returns the cleared cards,
    /// empty if the card was simply appended.
    pub(crate) fn place(&mut self, index: usize, card: Card) -> Vec<Card> {
        let slot = &mut self.slots[index];
        if slot.is_full() {
            slot.reset_with(card)
        } else {
            slot.cards.push(card);
            Vec::new()
        }
    }

    /// Takes the whole slot at `index` regardless of its size and
    /// restarts it with `card`. Used when a player picks a slot.
    pub(crate) fn take(&mut self, index: usize, card: Card) -> Vec<Card> {
        self.slots[index].reset_with(card)
    }

    /// Index of the slot with the smallest penalty sum, lowest index on
    /// ties.
    pub fn cheapest_slot(&self) -> usize {
        let mut best = 0;
        for (index, slot) in self.slots.iter().enumerate().skip(1) {
            if slot.penalty() < self.slots[best].penalty() {
                best = index;
            }
        }
        best
    }

    /// Owned copy of every slot's cards, for pushing to observers.
    pub fn view(&self) -> [Vec<Card>; SLOT_COUNT] {
        self.slots.clone().map(|slot| slot.cards)
    }

    /// Every card on the board, slot by slot.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.slots.iter().flat_map(|slot| slot.cards.iter())
    }
}
