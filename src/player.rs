use crate::bet::LastAction;
use crate::cards::Card;
use crate::{Chips, PlayerId, SeatIdx, MAX_SEATS};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A seat's place in the current hand and at the table.
///
/// `Waiting` and `Active` seats are dealt in; `SittingOut` and `Eliminated`
/// seats are skipped by rotation but keep their index so positional
/// designations (dead button) can rest on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatStatus {
    Waiting,
    Active,
    Folded,
    AllIn,
    SittingOut,
    Eliminated,
}

bitflags! {
    /// Conceptual ways to filter seats when iterating.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SeatFilter: u8 {
        /// Every occupied seat.
        const ALL = 0b1;
        /// Seats that will be dealt the next hand: not sitting out, not
        /// eliminated, and holding chips.
        const ELIGIBLE = 0b10;
        /// Seats contesting the current pot: active or all-in.
        const IN_HAND = 0b100;
        /// Seats that can still take betting actions.
        const MAY_ACT = 0b1000;
    }
}

#[derive(Debug, Clone)]
pub struct Seat {
    pub id: PlayerId,
    pub chips: Chips,
    /// Chips committed to the current street; reset when the street ends.
    pub bet: Chips,
    /// Chips committed over the whole hand; the pot manager's input.
    pub total_committed: Chips,
    pub hole: Option<[Card; 2]>,
    pub status: SeatStatus,
    pub last_action: LastAction,
    /// Stack snapshot at hand start, for elimination ordering.
    pub starting_stack: Chips,
}

impl Seat {
    pub(crate) fn new(id: PlayerId, chips: Chips) -> Self {
        Self {
            id,
            chips,
            bet: 0,
            total_committed: 0,
            hole: None,
            status: SeatStatus::Waiting,
            last_action: LastAction::None,
            starting_stack: chips,
        }
    }

    pub const fn is_eligible(&self) -> bool {
        matches!(self.status, SeatStatus::Waiting | SeatStatus::Active) && self.chips > 0
    }

    pub const fn in_hand(&self) -> bool {
        matches!(self.status, SeatStatus::Active | SeatStatus::AllIn)
    }

    pub const fn may_act(&self) -> bool {
        matches!(self.status, SeatStatus::Active)
    }

    fn passes(&self, filter: SeatFilter) -> bool {
        filter.contains(SeatFilter::ALL)
            || filter.contains(SeatFilter::ELIGIBLE) && self.is_eligible()
            || filter.contains(SeatFilter::IN_HAND) && self.in_hand()
            || filter.contains(SeatFilter::MAY_ACT) && self.may_act()
    }

    /// Move up to `amount` chips from the stack into the current street's
    /// bet. Chips leave the stack and land in `bet`/`total_committed` in one
    /// step; a drained stack flips the seat all-in. Returns what was actually
    /// committed.
    pub(crate) fn commit(&mut self, amount: Chips) -> Chips {
        debug_assert!(amount >= 0);
        let paid = amount.min(self.chips);
        self.chips -= paid;
        self.bet += paid;
        self.total_committed += paid;
        if self.chips == 0 {
            self.status = SeatStatus::AllIn;
        }
        paid
    }
}

/// The fixed ring of seats. Indexing is stable for the lifetime of the
/// table; rotation and dealing both walk it clockwise.
#[derive(Debug, Default)]
pub struct Seats {
    seats: [Option<Seat>; MAX_SEATS],
}

impl Seats {
    pub fn get(&self, idx: SeatIdx) -> Option<&Seat> {
        self.seats.get(idx).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, idx: SeatIdx) -> Option<&mut Seat> {
        self.seats.get_mut(idx).and_then(|s| s.as_mut())
    }

    pub(crate) fn occupy(&mut self, idx: SeatIdx, seat: Seat) {
        debug_assert!(self.seats[idx].is_none());
        self.seats[idx] = Some(seat);
    }

    pub(crate) fn vacate(&mut self, idx: SeatIdx) -> Option<Seat> {
        self.seats[idx].take()
    }

    pub fn first_empty(&self) -> Option<SeatIdx> {
        self.seats.iter().position(|s| s.is_none())
    }

    pub fn by_player(&self, id: PlayerId) -> Option<(SeatIdx, &Seat)> {
        self.iter(SeatFilter::ALL).find(|(_, s)| s.id == id)
    }

    pub fn iter(&self, filter: SeatFilter) -> impl Iterator<Item = (SeatIdx, &Seat)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
            .filter(move |(_, s)| s.passes(filter))
    }

    pub fn iter_mut(&mut self, filter: SeatFilter) -> impl Iterator<Item = (SeatIdx, &mut Seat)> {
        self.seats
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|s| (i, s)))
            .filter(move |(_, s)| s.passes(filter))
    }

    /// Matching seats strictly after `idx`, wrapping around the table once.
    /// The starting seat itself comes last.
    pub fn iter_after(&self, idx: SeatIdx, filter: SeatFilter) -> Vec<SeatIdx> {
        let mut out: Vec<SeatIdx> = self
            .iter(filter)
            .map(|(i, _)| i)
            .filter(|&i| i > idx)
            .collect();
        out.extend(self.iter(filter).map(|(i, _)| i).filter(|&i| i <= idx));
        out
    }

    /// First matching seat strictly after `idx`, wrapping.
    pub fn next_after(&self, idx: SeatIdx, filter: SeatFilter) -> Option<SeatIdx> {
        self.iter_after(idx, filter).first().copied()
    }

    pub fn count(&self, filter: SeatFilter) -> usize {
        self.iter(filter).count()
    }

    /// Stack plus committed chips across every occupied seat. The
    /// conservation checks compare this across quiescent points.
    pub fn total_chips(&self) -> Chips {
        self.iter(SeatFilter::ALL)
            .map(|(_, s)| s.chips + s.total_committed)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats_with(stacks: &[(SeatIdx, Chips)]) -> Seats {
        let mut seats = Seats::default();
        for (n, (idx, chips)) in stacks.iter().enumerate() {
            seats.occupy(*idx, Seat::new(n as PlayerId, *chips));
        }
        seats
    }

    #[test]
    fn filters() {
        let mut seats = seats_with(&[(0, 100), (3, 0), (7, 50)]);
        seats.get_mut(7).unwrap().status = SeatStatus::SittingOut;
        assert_eq!(seats.count(SeatFilter::ALL), 3);
        // broke seat and sitting-out seat are not dealt in
        assert_eq!(seats.count(SeatFilter::ELIGIBLE), 1);
        assert_eq!(seats.count(SeatFilter::MAY_ACT), 0);
        seats.get_mut(0).unwrap().status = SeatStatus::Active;
        assert_eq!(seats.count(SeatFilter::MAY_ACT), 1);
        assert_eq!(seats.count(SeatFilter::IN_HAND), 1);
    }

    #[test]
    fn wrap_around_order() {
        let seats = seats_with(&[(0, 10), (3, 10), (5, 10), (9, 10)]);
        assert_eq!(seats.iter_after(3, SeatFilter::ALL), vec![5, 9, 0, 3]);
        assert_eq!(seats.iter_after(9, SeatFilter::ALL), vec![0, 3, 5, 9]);
        assert_eq!(seats.next_after(5, SeatFilter::ALL), Some(9));
        assert_eq!(seats.next_after(9, SeatFilter::ALL), Some(0));
    }

    #[test]
    fn commit_clamps_and_flips_allin() {
        let mut seat = Seat::new(1, 30);
        seat.status = SeatStatus::Active;
        assert_eq!(seat.commit(10), 10);
        assert_eq!(seat.chips, 20);
        assert_eq!(seat.bet, 10);
        assert_eq!(seat.total_committed, 10);
        assert_eq!(seat.status, SeatStatus::Active);
        // over-commit takes only what is there and goes all-in
        assert_eq!(seat.commit(50), 20);
        assert_eq!(seat.chips, 0);
        assert_eq!(seat.total_committed, 30);
        assert_eq!(seat.status, SeatStatus::AllIn);
    }

    #[test]
    fn conservation_baseline() {
        let mut seats = seats_with(&[(0, 100), (1, 200)]);
        let before = seats.total_chips();
        seats.get_mut(0).unwrap().status = SeatStatus::Active;
        seats.get_mut(0).unwrap().commit(60);
        assert_eq!(seats.total_chips(), before);
    }
}
