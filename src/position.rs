use crate::player::{SeatFilter, Seats};
use crate::{GameError, SeatIdx};
use serde::{Deserialize, Serialize};

/// Positional designations for one hand.
///
/// `button` and `big_blind` always name a seat; the button's seat may be
/// empty or eliminated (a dead button), in which case no player sits "on"
/// it and first-postflop-action simply starts at the next live seat.
/// `small_blind` is the seat actually posting; `None` means a dead small
/// blind and no chips are posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPositions {
    pub button: SeatIdx,
    pub small_blind: Option<SeatIdx>,
    pub big_blind: SeatIdx,
    pub dead_button: bool,
    pub dead_small_blind: bool,
    /// The seat the small-blind designation rests on, posted or not. Drives
    /// the next hand's button.
    pub(crate) sb_designation: SeatIdx,
}

impl HandPositions {
    /// First seat to act preflop: left of the big blind. Evaluated after
    /// blinds post so seats shoved all-in by their blind are skipped.
    pub fn first_to_act_preflop(&self, seats: &Seats) -> Option<SeatIdx> {
        seats.next_after(self.big_blind, SeatFilter::MAY_ACT)
    }

    /// First seat to act on every later street: left of the button. A dead
    /// button works unchanged, the scan just starts from the empty seat.
    pub fn first_to_act_postflop(&self, seats: &Seats) -> Option<SeatIdx> {
        seats.next_after(self.button, SeatFilter::MAY_ACT)
    }
}

/// Where the blinds were last hand. The table keeps one of these across
/// hands; it is the whole input the dead-button rule needs.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RotationMemory {
    last: Option<PrevHand>,
}

#[derive(Debug, Clone, Copy)]
struct PrevHand {
    sb_designation: SeatIdx,
    bb_seat: SeatIdx,
}

impl RotationMemory {
    /// Commit a completed hand's positions. Cancelled hands are not
    /// recorded, so their positions repeat.
    pub(crate) fn record(&mut self, positions: &HandPositions) {
        self.last = Some(PrevHand {
            sb_designation: positions.sb_designation,
            bb_seat: positions.big_blind,
        });
    }

    /// Compute positions for the coming hand. `button_hint` (the configured
    /// start seat or the test hook) forces fresh placement; otherwise the
    /// previous hand rotates forward.
    ///
    /// Rotation is anchored on the big blind: it advances exactly one
    /// eligible seat per hand, never skipping an eligible seat and never
    /// landing on the same player twice in a row. The button designation
    /// moves onto the seat that held the small blind; if that seat can no
    /// longer play, the button is dead there for this one hand and the
    /// small blind is dead with it. A small blind is also dead when the
    /// seat due to post it (last hand's big blind) was eliminated.
    pub(crate) fn resolve(
        &self,
        seats: &Seats,
        button_hint: Option<SeatIdx>,
    ) -> Result<HandPositions, GameError> {
        let n = seats.count(SeatFilter::ELIGIBLE);
        if n < 2 {
            return Err(GameError::NotEnoughPlayers);
        }
        match (button_hint, self.last) {
            (None, Some(prev)) => Self::advance(seats, prev, n),
            (hint, _) => Self::fresh(seats, hint.unwrap_or(0), n),
        }
    }

    fn fresh(seats: &Seats, hint: SeatIdx, n: usize) -> Result<HandPositions, GameError> {
        let button = if seats.get(hint).is_some_and(|s| s.is_eligible()) {
            hint
        } else {
            seats
                .next_after(hint, SeatFilter::ELIGIBLE)
                .ok_or(GameError::NotEnoughPlayers)?
        };
        let (sb, bb) = if n == 2 {
            let other = seats
                .next_after(button, SeatFilter::ELIGIBLE)
                .ok_or(GameError::NotEnoughPlayers)?;
            (button, other)
        } else {
            let sb = seats
                .next_after(button, SeatFilter::ELIGIBLE)
                .ok_or(GameError::NotEnoughPlayers)?;
            let bb = seats
                .next_after(sb, SeatFilter::ELIGIBLE)
                .ok_or(GameError::NotEnoughPlayers)?;
            (sb, bb)
        };
        Ok(HandPositions {
            button,
            small_blind: Some(sb),
            big_blind: bb,
            dead_button: false,
            dead_small_blind: false,
            sb_designation: sb,
        })
    }

    fn advance(seats: &Seats, prev: PrevHand, n: usize) -> Result<HandPositions, GameError> {
        let bb = seats
            .next_after(prev.bb_seat, SeatFilter::ELIGIBLE)
            .ok_or(GameError::NotEnoughPlayers)?;
        if n == 2 {
            // heads-up: button and small blind collapse onto the non-bb seat
            let other = seats
                .next_after(bb, SeatFilter::ELIGIBLE)
                .ok_or(GameError::NotEnoughPlayers)?;
            return Ok(HandPositions {
                button: other,
                small_blind: Some(other),
                big_blind: bb,
                dead_button: false,
                dead_small_blind: false,
                sb_designation: other,
            });
        }
        let sb_seat = prev.bb_seat;
        let mut button = prev.sb_designation;
        if button == bb {
            // the table grew back from heads-up and the old button/sb seat
            // is due the big blind; the button belongs to the seat sitting
            // between the new big blind and the small-blind designation
            button = seats
                .iter_after(bb, SeatFilter::ELIGIBLE)
                .into_iter()
                .find(|&i| i != sb_seat && i != bb)
                .unwrap_or(prev.sb_designation);
        }
        let dead_button = !seats.get(button).is_some_and(|s| s.is_eligible());
        let sb_live = !dead_button
            && sb_seat != bb
            && seats.get(sb_seat).is_some_and(|s| s.is_eligible());
        Ok(HandPositions {
            button,
            small_blind: sb_live.then_some(sb_seat),
            big_blind: bb,
            dead_button,
            dead_small_blind: !sb_live,
            sb_designation: sb_seat,
        })
    }
}
