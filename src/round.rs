use crate::agent::Decision;
use crate::bet::{ActionKind, BetAction, LastAction};
use crate::player::{SeatFilter, SeatStatus, Seats};
use crate::{Chips, SeatIdx};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, derive_more::Display, Serialize, Deserialize,
)]
pub enum Street {
    PreFlop,
    Flop,
    Turn,
    River,
}

/// Why an agent's decision was discarded and a default substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
pub enum RejectReason {
    IllegalAction,
    BadAmount,
    BelowMinimum,
    AboveMaximum,
    Timeout,
    AgentFailure,
}

/// What the acting seat may do right now, with exact amounts. Computed
/// before every prompt and handed to the agent so it cannot guess wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConstraints {
    pub seat: SeatIdx,
    pub current_bet: Chips,
    /// Additional chips needed to call, already clamped to the stack.
    pub to_call: Chips,
    /// Smallest legal total to open or raise to (ignoring all-in shoves).
    pub min_raise_to: Chips,
    /// The seat's all-in total: street bet plus remaining stack.
    pub max_raise_to: Chips,
    pub valid: Vec<ActionKind>,
}

impl ActionConstraints {
    /// Turn an agent's decision into a concrete action, or say why not.
    /// Amounts are normalized here; results carry street totals.
    pub fn admit(&self, decision: &Decision) -> Result<BetAction, RejectReason> {
        match decision {
            Decision::Check => self
                .allows(ActionKind::Check)
                .then_some(BetAction::Check)
                .ok_or(RejectReason::IllegalAction),
            Decision::Fold => self
                .allows(ActionKind::Fold)
                .then_some(BetAction::Fold)
                .ok_or(RejectReason::IllegalAction),
            Decision::Call => {
                if !self.allows(ActionKind::Call) {
                    return Err(RejectReason::IllegalAction);
                }
                let total = self.current_bet.min(self.max_raise_to);
                Ok(if total == self.max_raise_to {
                    BetAction::AllIn(total)
                } else {
                    BetAction::Call(total)
                })
            }
            Decision::AllIn => {
                if !self.allows(ActionKind::AllIn) {
                    return Err(RejectReason::IllegalAction);
                }
                Ok(BetAction::AllIn(self.max_raise_to))
            }
            Decision::Bet(amount) => {
                if !self.allows(ActionKind::Bet) {
                    return Err(RejectReason::IllegalAction);
                }
                let x = amount.normalize().map_err(|_| RejectReason::BadAmount)?;
                if x > self.max_raise_to {
                    Err(RejectReason::AboveMaximum)
                } else if x == self.max_raise_to {
                    Ok(BetAction::AllIn(x))
                } else if x < self.min_raise_to {
                    Err(RejectReason::BelowMinimum)
                } else {
                    Ok(BetAction::Bet(x))
                }
            }
            Decision::Raise(amount) => {
                if !self.allows(ActionKind::Raise) {
                    return Err(RejectReason::IllegalAction);
                }
                let x = amount.normalize().map_err(|_| RejectReason::BadAmount)?;
                if x > self.max_raise_to {
                    Err(RejectReason::AboveMaximum)
                } else if x == self.max_raise_to {
                    // an all-in raise may fall short of the increment
                    Ok(BetAction::AllIn(x))
                } else if x < self.min_raise_to {
                    Err(RejectReason::BelowMinimum)
                } else {
                    Ok(BetAction::Raise(x))
                }
            }
        }
    }

    /// The action substituted for rejected, late, or failing agents:
    /// check when possible, fold otherwise.
    pub fn default_action(&self) -> BetAction {
        if self.allows(ActionKind::Check) {
            BetAction::Check
        } else {
            BetAction::Fold
        }
    }

    fn allows(&self, kind: ActionKind) -> bool {
        self.valid.contains(&kind)
    }
}

/// Per-street betting state machine.
///
/// Tracks the amount to match, the raise increment, and which seats have
/// acted since the last full raise. The big-blind "option" falls out of the
/// bookkeeping: preflop starts with an empty acted set, so when the action
/// limps around, the big blind's `bet == current_bet` but it has no acted
/// entry and is prompted exactly once.
#[derive(Debug)]
pub struct BettingRound {
    street: Street,
    big_blind: Chips,
    current_bet: Chips,
    min_raise_increment: Chips,
    last_aggressor: Option<SeatIdx>,
    /// Seats that have acted since the last full raise.
    acted: Vec<SeatIdx>,
    /// The street's opener, as resolved by the position logic. Consumed by
    /// the first action; after that the clockwise scan takes over.
    first: Option<SeatIdx>,
    /// Most recent actor; next-to-act scans clockwise from here.
    cursor: SeatIdx,
}

impl BettingRound {
    /// Preflop: blinds already posted, the big blind is the stake to match.
    /// `first_to_act` comes from [`HandPositions::first_to_act_preflop`].
    ///
    /// [`HandPositions::first_to_act_preflop`]:
    /// crate::position::HandPositions::first_to_act_preflop
    pub fn preflop(big_blind: Chips, first_to_act: SeatIdx) -> Self {
        Self {
            street: Street::PreFlop,
            big_blind,
            current_bet: big_blind,
            min_raise_increment: big_blind,
            last_aggressor: None,
            acted: Vec::new(),
            first: Some(first_to_act),
            cursor: first_to_act,
        }
    }

    /// Any later street: no stake yet. `first_to_act` comes from
    /// [`HandPositions::first_to_act_postflop`].
    ///
    /// [`HandPositions::first_to_act_postflop`]:
    /// crate::position::HandPositions::first_to_act_postflop
    pub fn postflop(street: Street, big_blind: Chips, first_to_act: SeatIdx) -> Self {
        Self {
            street,
            big_blind,
            current_bet: 0,
            min_raise_increment: big_blind,
            last_aggressor: None,
            acted: Vec::new(),
            first: Some(first_to_act),
            cursor: first_to_act,
        }
    }

    pub fn street(&self) -> Street {
        self.street
    }

    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }

    pub fn last_aggressor(&self) -> Option<SeatIdx> {
        self.last_aggressor
    }

    /// The next seat owing a decision, or `None` when the round is settled.
    /// The street's opener goes first; after that the scan runs clockwise
    /// from the previous actor. Must be re-asked after every action, folds
    /// included.
    pub fn next_to_act(&self, seats: &Seats) -> Option<SeatIdx> {
        if let Some(first) = self.first {
            if seats.get(first).is_some_and(|s| s.may_act()) {
                return Some(first);
            }
        }
        for idx in seats.iter_after(self.cursor, SeatFilter::MAY_ACT) {
            let seat = seats.get(idx).expect("seat from filter");
            if seat.bet < self.current_bet || !self.acted.contains(&idx) {
                return Some(idx);
            }
        }
        None
    }

    pub fn constraints(&self, seats: &Seats, idx: SeatIdx) -> ActionConstraints {
        let seat = seats.get(idx).expect("acting seat exists");
        let max_raise_to = seat.bet + seat.chips;
        let to_call = (self.current_bet - seat.bet).min(seat.chips).max(0);
        let min_raise_to = if self.current_bet == 0 {
            self.big_blind
        } else {
            self.current_bet + self.min_raise_increment
        };
        let mut valid = Vec::with_capacity(4);
        if self.current_bet == seat.bet {
            valid.push(ActionKind::Check);
        } else {
            valid.push(ActionKind::Call);
            valid.push(ActionKind::Fold);
        }
        if self.current_bet == 0 {
            valid.push(ActionKind::Bet);
        } else if !self.acted.contains(&idx) && max_raise_to > self.current_bet {
            valid.push(ActionKind::Raise);
        }
        if seat.chips > 0 {
            valid.push(ActionKind::AllIn);
        }
        ActionConstraints {
            seat: idx,
            current_bet: self.current_bet,
            to_call,
            min_raise_to: min_raise_to.min(max_raise_to),
            max_raise_to,
            valid,
        }
    }

    /// Commit an admitted action. Chips move, the seat's status and last
    /// action update, and aggression bookkeeping runs. Returns the action as
    /// applied, which differs from the input when a call or raise turns out
    /// to consume the whole stack.
    pub fn apply(&mut self, seats: &mut Seats, idx: SeatIdx, action: BetAction) -> BetAction {
        self.first = None;
        self.cursor = idx;
        let seat = seats.get_mut(idx).expect("acting seat exists");
        let applied = match action {
            BetAction::Check => {
                self.mark_acted(idx);
                BetAction::Check
            }
            BetAction::Fold => {
                seat.status = SeatStatus::Folded;
                BetAction::Fold
            }
            BetAction::Call(total)
            | BetAction::Bet(total)
            | BetAction::Raise(total)
            | BetAction::AllIn(total) => {
                seat.commit(total - seat.bet);
                let total = seat.bet;
                let shoved = seat.status == SeatStatus::AllIn;
                if total > self.current_bet {
                    let step = total - self.current_bet;
                    self.current_bet = total;
                    if step >= self.min_raise_increment {
                        // a full bet or raise reopens the action
                        self.min_raise_increment = step;
                        self.acted.clear();
                        self.last_aggressor = Some(idx);
                    }
                    self.mark_acted(idx);
                    match (shoved, action) {
                        (true, _) => BetAction::AllIn(total),
                        (false, BetAction::Bet(_)) => BetAction::Bet(total),
                        (false, _) => BetAction::Raise(total),
                    }
                } else {
                    self.mark_acted(idx);
                    if shoved {
                        BetAction::AllIn(total)
                    } else {
                        BetAction::Call(total)
                    }
                }
            }
        };
        let seat = seats.get_mut(idx).expect("acting seat exists");
        seat.last_action = LastAction::from(&applied);
        applied
    }

    fn mark_acted(&mut self, idx: SeatIdx) {
        if !self.acted.contains(&idx) {
            self.acted.push(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Seat;
    use crate::PlayerId;

    fn active_seats(stacks: &[Chips]) -> Seats {
        let mut seats = Seats::default();
        for (i, &chips) in stacks.iter().enumerate() {
            let mut s = Seat::new(i as PlayerId, chips);
            s.status = SeatStatus::Active;
            seats.occupy(i, s);
        }
        seats
    }

    fn post(seats: &mut Seats, idx: SeatIdx, amount: Chips) {
        seats.get_mut(idx).unwrap().commit(amount);
    }

    #[test]
    fn bb_gets_exactly_one_option_prompt() {
        // 0 = button, 1 = sb, 2 = bb
        let mut seats = active_seats(&[100, 100, 100]);
        post(&mut seats, 1, 5);
        post(&mut seats, 2, 10);
        let mut round = BettingRound::preflop(10, 0);

        // utg is the button in 3-handed play
        assert_eq!(round.next_to_act(&seats), Some(0));
        let a = round.apply(&mut seats, 0, BetAction::Call(10));
        assert_eq!(a, BetAction::Call(10));
        assert_eq!(round.next_to_act(&seats), Some(1));
        round.apply(&mut seats, 1, BetAction::Call(10));
        // bb has matched the bet but still owns the option
        assert_eq!(round.next_to_act(&seats), Some(2));
        let c = round.constraints(&seats, 2);
        assert!(c.valid.contains(&ActionKind::Check));
        assert!(c.valid.contains(&ActionKind::Raise));
        assert_eq!(c.to_call, 0);
        round.apply(&mut seats, 2, BetAction::Check);
        // and only once
        assert_eq!(round.next_to_act(&seats), None);
    }

    #[test]
    fn raise_reopens_action() {
        let mut seats = active_seats(&[100, 100, 100]);
        post(&mut seats, 1, 5);
        post(&mut seats, 2, 10);
        let mut round = BettingRound::preflop(10, 0);
        round.apply(&mut seats, 0, BetAction::Call(10));
        round.apply(&mut seats, 1, BetAction::Raise(30));
        assert_eq!(round.last_aggressor(), Some(1));
        // bb and the limper both owe action again
        assert_eq!(round.next_to_act(&seats), Some(2));
        round.apply(&mut seats, 2, BetAction::Call(30));
        assert_eq!(round.next_to_act(&seats), Some(0));
        round.apply(&mut seats, 0, BetAction::Call(30));
        assert_eq!(round.next_to_act(&seats), None);
    }

    #[test]
    fn min_raise_increment_tracks_last_raise() {
        let mut seats = active_seats(&[500, 500]);
        let mut round = BettingRound::postflop(Street::Flop, 10, 0);
        let c = round.constraints(&seats, 0);
        assert_eq!(c.min_raise_to, 10); // opening bet floor is the bb
        round.apply(&mut seats, 0, BetAction::Bet(60));
        let c = round.constraints(&seats, 1);
        assert_eq!(c.current_bet, 60);
        assert_eq!(c.to_call, 60);
        assert_eq!(c.min_raise_to, 120);
        round.apply(&mut seats, 1, BetAction::Raise(200));
        let c = round.constraints(&seats, 0);
        assert_eq!(c.min_raise_to, 340); // 200 + (200 - 60)
    }

    #[test]
    fn short_all_in_does_not_reopen_for_prior_actors() {
        let mut seats = active_seats(&[300, 45, 300]);
        let mut round = BettingRound::postflop(Street::Flop, 10, 0);
        round.apply(&mut seats, 0, BetAction::Bet(30));
        // seat 1 shoves 45 total: a raise but below the 30 increment
        let applied = round.apply(&mut seats, 1, BetAction::AllIn(45));
        assert_eq!(applied, BetAction::AllIn(45));
        assert_eq!(round.current_bet(), 45);
        // the original bettor still owes the difference...
        assert_eq!(round.next_to_act(&seats), Some(2));
        round.apply(&mut seats, 2, BetAction::Call(45));
        assert_eq!(round.next_to_act(&seats), Some(0));
        // ...but may not raise again
        let c = round.constraints(&seats, 0);
        assert!(!c.valid.contains(&ActionKind::Raise));
        assert!(c.valid.contains(&ActionKind::Call));
        round.apply(&mut seats, 0, BetAction::Call(45));
        assert_eq!(round.next_to_act(&seats), None);
        // aggressor never changed to the short shover
        assert_eq!(round.last_aggressor(), Some(0));
    }

    #[test]
    fn fresh_seat_may_still_raise_over_short_all_in() {
        let mut seats = active_seats(&[300, 45, 300]);
        let mut round = BettingRound::postflop(Street::Flop, 10, 0);
        round.apply(&mut seats, 0, BetAction::Bet(30));
        round.apply(&mut seats, 1, BetAction::AllIn(45));
        // seat 2 has not acted since the last full raise, so it may raise
        let c = round.constraints(&seats, 2);
        assert!(c.valid.contains(&ActionKind::Raise));
        assert_eq!(c.min_raise_to, 75); // 45 + 30, the last full increment
    }

    #[test]
    fn admit_coerces_and_rejects() {
        let mut seats = active_seats(&[100, 100]);
        let mut round = BettingRound::postflop(Street::Flop, 10, 0);
        let c = round.constraints(&seats, 0);
        // fractional amounts are rounded half to even
        assert_eq!(
            c.admit(&Decision::Bet(75.5.into())),
            Ok(BetAction::Bet(76))
        );
        assert_eq!(
            c.admit(&Decision::Bet(75.4.into())),
            Ok(BetAction::Bet(75))
        );
        // negative and oversize amounts are rejected
        assert_eq!(
            c.admit(&Decision::Bet((-1i64).into())),
            Err(RejectReason::BadAmount)
        );
        assert_eq!(
            c.admit(&Decision::Bet(101i64.into())),
            Err(RejectReason::AboveMaximum)
        );
        // betting the whole stack is an all-in
        assert_eq!(
            c.admit(&Decision::Bet(100i64.into())),
            Ok(BetAction::AllIn(100))
        );
        // there is nothing to call or raise over
        assert_eq!(c.admit(&Decision::Call), Err(RejectReason::IllegalAction));
        assert_eq!(c.default_action(), BetAction::Check);

        round.apply(&mut seats, 0, BetAction::Bet(40));
        let c = round.constraints(&seats, 1);
        assert_eq!(c.admit(&Decision::Check), Err(RejectReason::IllegalAction));
        assert_eq!(
            c.admit(&Decision::Raise(50i64.into())),
            Err(RejectReason::BelowMinimum)
        );
        assert_eq!(
            c.admit(&Decision::Raise(80i64.into())),
            Ok(BetAction::Raise(80))
        );
        // an all-in "raise" below the increment is admitted as a shove
        assert_eq!(
            c.admit(&Decision::Raise(100i64.into())),
            Ok(BetAction::AllIn(100))
        );
        assert_eq!(c.default_action(), BetAction::Fold);
    }

    #[test]
    fn call_clamped_to_stack_is_all_in() {
        let mut seats = active_seats(&[100, 30]);
        let mut round = BettingRound::postflop(Street::Flop, 10, 0);
        round.apply(&mut seats, 0, BetAction::Bet(80));
        let c = round.constraints(&seats, 1);
        assert_eq!(c.to_call, 30);
        let applied = c.admit(&Decision::Call).unwrap();
        assert_eq!(applied, BetAction::AllIn(30));
        let applied = round.apply(&mut seats, 1, applied);
        assert_eq!(applied, BetAction::AllIn(30));
        assert_eq!(seats.get(1).unwrap().status, SeatStatus::AllIn);
        // round is over: nobody with chips owes action
        assert_eq!(round.next_to_act(&seats), None);
    }

    #[test]
    fn fold_ends_heads_up_round_immediately() {
        let mut seats = active_seats(&[100, 100]);
        post(&mut seats, 0, 5);
        post(&mut seats, 1, 10);
        let mut round = BettingRound::preflop(10, 0);
        assert_eq!(round.next_to_act(&seats), Some(0));
        round.apply(&mut seats, 0, BetAction::Fold);
        assert_eq!(seats.get(0).unwrap().status, SeatStatus::Folded);
        // the caller is responsible for noticing only one seat remains; the
        // scan itself must not resurrect the folded seat
        assert_eq!(round.next_to_act(&seats), Some(1));
        assert_eq!(seats.count(SeatFilter::IN_HAND), 1);
    }
}
