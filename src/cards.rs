pub mod card;
pub mod deck;
pub mod ranking;

pub use card::{cards_from_str, Card, Rank, Suit};
pub use deck::{Deck, DeckError, DeckSeed};
pub use ranking::{rank_hand, RankCategory, Ranking};
