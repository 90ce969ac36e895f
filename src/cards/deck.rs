use super::card::{all_cards, Card};
use crate::HandNo;
use base64ct::{Base64, Encoding};
use rand::prelude::*;
use rand_chacha::ChaChaRng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DECK_LEN: usize = 52;
const SEED_LEN: usize = 32;
const ENCODED_SEED_LEN: usize = 4 * ((SEED_LEN + 3 - 1) / 3); // 4 * ceil(SEED_LEN / 3)

#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum DeckError {
    InsufficientCards,
    SeedDecodeError,
}

impl std::error::Error for DeckError {}

/// An ordered source of cards for one hand.
///
/// Either shuffled from a [`DeckSeed`] (production) or built from a
/// caller-supplied sequence (deterministic tests). Cards come off the deck in
/// a fixed, observable order; the hand controller is the only consumer.
#[derive(Debug, PartialEq, Clone)]
pub struct Deck {
    // stored reversed so draw() can pop from the back
    cards: Vec<Card>,
}

impl Deck {
    /// A full 52-card deck shuffled by the given seed. The same seed always
    /// yields the same order.
    pub fn shuffled(seed: &DeckSeed) -> Self {
        let mut rng = ChaChaRng::from_seed(seed.0);
        let mut cards = all_cards();
        cards.shuffle(&mut rng);
        Deck { cards }
    }

    /// A deck that deals exactly the given cards, first card first. Used by
    /// the table's deck-injection test hook; the sequence may be shorter than
    /// 52 cards, in which case exhausting it cancels the hand.
    pub fn from_ordered(mut cards: Vec<Card>) -> Self {
        cards.reverse();
        Deck { cards }
    }

    /// Consume and return the next card.
    pub fn draw(&mut self) -> Result<Card, DeckError> {
        self.cards.pop().ok_or(DeckError::InsufficientCards)
    }

    /// Discard the next card face down.
    pub fn burn(&mut self) -> Result<(), DeckError> {
        self.draw().map(|_| ())
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

/// Seed for the deck shuffler. One table-level seed is configured; per-hand
/// seeds are derived from it so every hand of a table replays exactly from
/// the table seed alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSeed([u8; SEED_LEN]);

impl DeckSeed {
    pub const fn new(b: [u8; SEED_LEN]) -> Self {
        Self(b)
    }

    /// Fresh seed from the thread RNG.
    pub fn random() -> Self {
        let mut b = [0u8; SEED_LEN];
        thread_rng().fill_bytes(&mut b);
        Self(b)
    }

    /// Derive the seed for a specific hand number.
    pub fn for_hand(&self, hand_no: HandNo) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.0);
        hasher.update(&hand_no.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

impl std::fmt::Display for DeckSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut b = [0u8; ENCODED_SEED_LEN];
        let s = Base64::encode(&self.0, &mut b).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", s)
    }
}

impl FromStr for DeckSeed {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; SEED_LEN];
        Base64::decode(s, &mut b).map_err(|_| DeckError::SeedDecodeError)?;
        Ok(DeckSeed(b))
    }
}
