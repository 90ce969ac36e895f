use super::card::{Card, Rank};
use enum_map::EnumMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Hand categories, weakest first. The discriminant order is the ranking
/// order, so the derived `Ord` is the poker order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum RankingError {
    BadCommunity(usize),
}

impl std::error::Error for RankingError {}

/// A ranked five-card hand: a category plus the ordered tie-break ranks for
/// that category. Comparison is lexicographic on (category, kickers); the
/// concrete cards are carried only for display and showdown payloads and do
/// not participate in comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    category: RankCategory,
    kickers: Vec<Rank>,
    cards: [Card; 5],
}

impl PartialEq for Ranking {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.kickers == other.kickers
    }
}

impl Eq for Ranking {}

impl Ord for Ranking {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then_with(|| self.kickers.cmp(&other.kickers))
    }
}

impl PartialOrd for Ranking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Ranking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.describe(), self.cards.iter().join(""))
    }
}

impl Ranking {
    /// Rank exactly five cards.
    pub fn of_five(cards: [Card; 5]) -> Self {
        let (category, kickers) = classify(&cards);
        Self {
            category,
            kickers,
            cards,
        }
    }

    pub fn category(&self) -> RankCategory {
        self.category
    }

    pub fn kickers(&self) -> &[Rank] {
        &self.kickers
    }

    pub fn cards(&self) -> &[Card; 5] {
        &self.cards
    }

    /// Deterministic human-readable description, e.g. `"Boat As full of Ks"`.
    pub fn describe(&self) -> String {
        let k = &self.kickers;
        match self.category {
            RankCategory::HighCard => format!("{} high", k[0]),
            RankCategory::OnePair => format!("Pair of {}s", k[0]),
            RankCategory::TwoPair => format!("Two pair {}s and {}s", k[0], k[1]),
            RankCategory::ThreeOfAKind => format!("Set of {}s", k[0]),
            RankCategory::Straight => format!("{} high straight", k[0]),
            RankCategory::Flush => format!("{} high flush", k[0]),
            RankCategory::FullHouse => format!("Boat {}s full of {}s", k[0], k[1]),
            RankCategory::FourOfAKind => format!("Quad {}s", k[0]),
            RankCategory::StraightFlush => format!("{} high straight flush", k[0]),
            RankCategory::RoyalFlush => "Royal flush".to_string(),
        }
    }
}

/// Best five-card ranking from two hole cards plus at least three community
/// cards, checked over every five-card combination.
pub fn rank_hand(hole: [Card; 2], community: &[Card]) -> Result<Ranking, RankingError> {
    if !(3..=5).contains(&community.len()) {
        return Err(RankingError::BadCommunity(community.len()));
    }
    let mut pool = Vec::with_capacity(2 + community.len());
    pool.extend_from_slice(&hole);
    pool.extend_from_slice(community);
    let best = pool
        .iter()
        .copied()
        .combinations(5)
        .map(|combo| Ranking::of_five([combo[0], combo[1], combo[2], combo[3], combo[4]]))
        .max()
        .expect("at least one 5-card combination");
    Ok(best)
}

fn classify(cards: &[Card; 5]) -> (RankCategory, Vec<Rank>) {
    let mut counts: EnumMap<Rank, u8> = EnumMap::default();
    for c in cards {
        counts[c.rank] += 1;
    }
    // groups of (multiplicity, rank), biggest group first, then highest rank
    let mut groups: Vec<(u8, Rank)> = counts
        .iter()
        .filter(|(_, &n)| n > 0)
        .map(|(r, &n)| (n, r))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let flush = cards.iter().map(|c| c.suit).all_equal();
    let straight_high = straight_high(&groups);

    match (straight_high, flush) {
        (Some(Rank::Ace), true) => return (RankCategory::RoyalFlush, vec![]),
        (Some(high), true) => return (RankCategory::StraightFlush, vec![high]),
        _ => {}
    }
    match groups.as_slice() {
        [(4, quad), (1, kick)] => (RankCategory::FourOfAKind, vec![*quad, *kick]),
        [(3, trip), (2, pair)] => (RankCategory::FullHouse, vec![*trip, *pair]),
        _ if flush => (RankCategory::Flush, ranks_desc(cards)),
        _ if straight_high.is_some() => {
            (RankCategory::Straight, vec![straight_high.unwrap()])
        }
        [(3, trip), (1, k1), (1, k2)] => (RankCategory::ThreeOfAKind, vec![*trip, *k1, *k2]),
        [(2, hi), (2, lo), (1, kick)] => (RankCategory::TwoPair, vec![*hi, *lo, *kick]),
        [(2, pair), (1, k1), (1, k2), (1, k3)] => {
            (RankCategory::OnePair, vec![*pair, *k1, *k2, *k3])
        }
        _ => (RankCategory::HighCard, ranks_desc(cards)),
    }
}

fn ranks_desc(cards: &[Card; 5]) -> Vec<Rank> {
    let mut ranks: Vec<Rank> = cards.iter().map(|c| c.rank).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));
    ranks
}

/// High card of the straight formed by the given rank groups, if any. The
/// wheel (A-5) counts as a straight with high card 5.
fn straight_high(groups: &[(u8, Rank)]) -> Option<Rank> {
    if groups.len() != 5 {
        return None;
    }
    // groups are sorted by (count, rank) descending; with five singletons
    // that is simply ranks descending
    let ranks: Vec<Rank> = groups.iter().map(|(_, r)| *r).collect();
    if ranks[0] == Rank::Ace && ranks[1] == Rank::Five && ranks[4] == Rank::Two {
        let wheel = ranks[1].value() - ranks[4].value() == 3;
        return wheel.then_some(Rank::Five);
    }
    let run = ranks.windows(2).all(|w| w[0].value() == w[1].value() + 1);
    run.then_some(ranks[0])
}
