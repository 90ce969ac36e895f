use enum_map::Enum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const SPADE: char = 's';
pub const HEART: char = 'h';
pub const DIAMOND: char = 'd';
pub const CLUB: char = 'c';

pub const ALL_SUITS: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];
pub const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

#[derive(
    Hash, Enum, Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Serialize, Deserialize,
)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub fn value(&self) -> u8 {
        use Rank::*;
        match *self {
            Two => 2,
            Three => 3,
            Four => 4,
            Five => 5,
            Six => 6,
            Seven => 7,
            Eight => 8,
            Nine => 9,
            Ten => 10,
            Jack => 11,
            Queen => 12,
            King => 13,
            Ace => 14,
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Two => write!(f, "2"),
            Self::Three => write!(f, "3"),
            Self::Four => write!(f, "4"),
            Self::Five => write!(f, "5"),
            Self::Six => write!(f, "6"),
            Self::Seven => write!(f, "7"),
            Self::Eight => write!(f, "8"),
            Self::Nine => write!(f, "9"),
            Self::Ten => write!(f, "T"),
            Self::Jack => write!(f, "J"),
            Self::Queen => write!(f, "Q"),
            Self::King => write!(f, "K"),
            Self::Ace => write!(f, "A"),
        }
    }
}

impl TryFrom<char> for Rank {
    type Error = CardParseError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Ok(match c.to_ascii_uppercase() {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            _ => return Err(CardParseError::BadRank(c)),
        })
    }
}

#[derive(Hash, Enum, Clone, Copy, Debug, PartialEq, Eq, Ord, Serialize, Deserialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl std::fmt::Display for Suit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Club => write!(f, "{}", CLUB),
            Self::Diamond => write!(f, "{}", DIAMOND),
            Self::Heart => write!(f, "{}", HEART),
            Self::Spade => write!(f, "{}", SPADE),
        }
    }
}

impl TryFrom<char> for Suit {
    type Error = CardParseError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Ok(match c.to_ascii_lowercase() {
            CLUB => Self::Club,
            DIAMOND => Self::Diamond,
            HEART => Self::Heart,
            SPADE => Self::Spade,
            _ => return Err(CardParseError::BadSuit(c)),
        })
    }
}

/// All suits are equal; only rank participates in ordering.
impl PartialOrd for Suit {
    fn partial_cmp(&self, _: &Self) -> Option<std::cmp::Ordering> {
        Some(std::cmp::Ordering::Equal)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum CardParseError {
    BadRank(char),
    BadSuit(char),
    BadLength(usize),
}

impl std::error::Error for CardParseError {}

/// A playing card. Equality considers rank and suit; ordering considers rank
/// only, which is what hand evaluation wants.
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Card { rank, suit }
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(u), None) => Ok(Card::new(r.try_into()?, u.try_into()?)),
            _ => Err(CardParseError::BadLength(s.chars().count())),
        }
    }
}

impl std::cmp::PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank.cmp(&other.rank)
    }
}

/// Parse a run of two-character cards, e.g. `"AsKh7c"`.
pub fn cards_from_str(s: &str) -> Result<Vec<Card>, CardParseError> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() % 2 != 0 {
        return Err(CardParseError::BadLength(chars.len()));
    }
    chars
        .chunks(2)
        .map(|pair| Ok(Card::new(pair[0].try_into()?, pair[1].try_into()?)))
        .collect()
}

/// Every card of a single deck, unshuffled.
pub fn all_cards() -> Vec<Card> {
    use itertools::Itertools;
    ALL_RANKS
        .iter()
        .cartesian_product(ALL_SUITS.iter())
        .map(|(r, s)| Card::new(*r, *s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn rank_values_ascend() {
        for (i, r) in ALL_RANKS.into_iter().sorted_unstable().enumerate() {
            assert_eq!(r.value(), 2 + i as u8);
        }
    }

    #[test]
    fn parse_single() {
        let c: Card = "Ah".parse().unwrap();
        assert_eq!(c.rank, Rank::Ace);
        assert_eq!(c.suit, Suit::Heart);
        assert_eq!(c.to_string(), "Ah");
    }

    #[test]
    fn parse_failures() {
        assert!("A".parse::<Card>().is_err());
        assert!("Axh".parse::<Card>().is_err());
        assert!("1h".parse::<Card>().is_err());
        assert!("Az".parse::<Card>().is_err());
        assert!(cards_from_str("AhK").is_err());
    }

    #[test]
    fn parse_many() {
        let v = cards_from_str("Ah2c6h").unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v[2], Card::new(Rank::Six, Suit::Heart));
        assert!(cards_from_str("").unwrap().is_empty());
    }

    #[test]
    fn order_ignores_suit() {
        let c1 = Card::new(Rank::Jack, Suit::Club);
        let c2 = Card::new(Rank::Queen, Suit::Diamond);
        let c3 = Card::new(Rank::Jack, Suit::Heart);
        assert!(c1 < c2);
        assert_eq!(c1.cmp(&c3), std::cmp::Ordering::Equal);
        assert_ne!(c1, c3);
    }

    #[test]
    fn fifty_two_distinct() {
        let all = all_cards();
        assert_eq!(all.len(), 52);
        assert_eq!(all.iter().unique().count(), 52);
    }
}
