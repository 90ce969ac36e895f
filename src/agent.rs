use crate::amount::Amount;
use crate::bet::{ActionKind, BetAction, LastAction};
use crate::cards::Card;
use crate::player::SeatStatus;
use crate::round::Street;
use crate::{Chips, HandNo, PlayerId, SeatIdx};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Everything a seat is allowed to know when asked for a decision. Built
/// fresh for every prompt; agents receive it by value semantics and hold no
/// references into the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPrompt {
    pub hand_no: HandNo,
    pub street: Street,
    pub seat: SeatIdx,
    pub player: PlayerId,
    pub hole_cards: [Card; 2],
    pub community: Vec<Card>,
    pub pot: Chips,
    pub current_bet: Chips,
    pub to_call: Chips,
    pub min_raise: Chips,
    pub max_raise: Chips,
    pub valid_actions: Vec<ActionKind>,
    pub seats: Vec<PublicSeat>,
    pub betting_history: Vec<HistoryEntry>,
    pub timeout_ms: u64,
}

/// A seat as visible to every player: no hole cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSeat {
    pub seat: SeatIdx,
    pub player: PlayerId,
    pub chips: Chips,
    pub bet: Chips,
    pub total_committed: Chips,
    pub status: SeatStatus,
    pub last_action: LastAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub street: Street,
    pub seat: SeatIdx,
    pub player: PlayerId,
    pub action: BetAction,
}

/// What an agent wants to do. Bet and raise amounts are *totals to reach*
/// and pass through [`Amount`] normalization, so agents may hand back
/// integers, floats, or numeric strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Check,
    Call,
    Fold,
    AllIn,
    Bet(Amount),
    Raise(Amount),
}

/// A decision source for one seat.
///
/// Implementations are opaque to the engine and own whatever strategy state
/// they like. `decide` is the engine's only suspension point: it is invoked
/// between state transitions, never concurrently for one table, and the
/// engine treats a panic or an over-deadline response as a defaulted
/// decision rather than an error.
pub trait PlayerAgent: Send {
    fn decide(&mut self, prompt: &ActionPrompt) -> Decision;
}

/// Folds to any bet, checks when checking is free.
#[derive(Debug, Default, Clone, Copy)]
pub struct FoldingAgent;

impl PlayerAgent for FoldingAgent {
    fn decide(&mut self, prompt: &ActionPrompt) -> Decision {
        if prompt.to_call == 0 {
            Decision::Check
        } else {
            Decision::Fold
        }
    }
}

/// Checks when possible, calls anything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallingAgent;

impl PlayerAgent for CallingAgent {
    fn decide(&mut self, prompt: &ActionPrompt) -> Decision {
        if prompt.to_call == 0 {
            Decision::Check
        } else {
            Decision::Call
        }
    }
}

/// Replays a fixed list of decisions, then check-folds. The workhorse of
/// deterministic hand tests.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    script: VecDeque<Decision>,
}

impl ScriptedAgent {
    pub fn new<I: IntoIterator<Item = Decision>>(script: I) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl PlayerAgent for ScriptedAgent {
    fn decide(&mut self, prompt: &ActionPrompt) -> Decision {
        match self.script.pop_front() {
            Some(d) => d,
            None if prompt.to_call == 0 => Decision::Check,
            None => Decision::Fold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(to_call: Chips) -> ActionPrompt {
        ActionPrompt {
            hand_no: 1,
            street: Street::PreFlop,
            seat: 0,
            player: 1,
            hole_cards: ["As".parse().unwrap(), "Kd".parse().unwrap()],
            community: vec![],
            pot: 15,
            current_bet: 10,
            to_call,
            min_raise: 20,
            max_raise: 100,
            valid_actions: vec![ActionKind::Call, ActionKind::Fold, ActionKind::Raise],
            seats: vec![],
            betting_history: vec![],
            timeout_ms: 1000,
        }
    }

    #[test]
    fn folding_agent() {
        let mut a = FoldingAgent;
        assert_eq!(a.decide(&prompt(10)), Decision::Fold);
        assert_eq!(a.decide(&prompt(0)), Decision::Check);
    }

    #[test]
    fn calling_agent() {
        let mut a = CallingAgent;
        assert_eq!(a.decide(&prompt(10)), Decision::Call);
        assert_eq!(a.decide(&prompt(0)), Decision::Check);
    }

    #[test]
    fn scripted_agent_replays_then_checkfolds() {
        let mut a = ScriptedAgent::new([Decision::Raise(Amount::from(40i64)), Decision::Call]);
        assert_eq!(a.decide(&prompt(10)), Decision::Raise(Amount::from(40i64)));
        assert_eq!(a.decide(&prompt(10)), Decision::Call);
        assert_eq!(a.decide(&prompt(10)), Decision::Fold);
        assert_eq!(a.decide(&prompt(0)), Decision::Check);
    }
}
