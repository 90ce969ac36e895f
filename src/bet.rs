use crate::Chips;
use serde::{Deserialize, Serialize};

/// A resolved betting action. Chip amounts are the player's *total* street
/// commitment after the action, not the increment. A player who bets 10 and
/// later calls a raise to 30 produces `Bet(10)` then `Call(30)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetAction {
    Check,
    Fold,
    Call(Chips),
    Bet(Chips),
    Raise(Chips),
    AllIn(Chips),
}

impl BetAction {
    pub const fn is_allin(&self) -> bool {
        matches!(self, &BetAction::AllIn(_))
    }

    /// The street total this action leaves the seat at.
    pub const fn total(&self) -> Chips {
        match self {
            BetAction::Check | BetAction::Fold => 0,
            BetAction::Call(v) | BetAction::Bet(v) | BetAction::Raise(v) | BetAction::AllIn(v) => {
                *v
            }
        }
    }
}

impl std::fmt::Display for BetAction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BetAction::Check => write!(f, "Check"),
            BetAction::Fold => write!(f, "Fold"),
            BetAction::Call(v) => write!(f, "Call({})", v),
            BetAction::Bet(v) => write!(f, "Bet({})", v),
            BetAction::Raise(v) => write!(f, "Raise({})", v),
            BetAction::AllIn(v) => write!(f, "AllIn({})", v),
        }
    }
}

/// The kinds of action a seat may take, divorced from amounts. Used in
/// prompts ("these are your options") and in legality checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Check,
    Call,
    Bet,
    Raise,
    Fold,
    AllIn,
}

/// The last voluntary action a seat took this hand, for public display.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LastAction {
    #[default]
    None,
    Check,
    Call,
    Bet,
    Raise,
    Fold,
    AllIn,
}

impl From<&BetAction> for LastAction {
    fn from(ba: &BetAction) -> Self {
        match ba {
            BetAction::Check => LastAction::Check,
            BetAction::Fold => LastAction::Fold,
            BetAction::Call(_) => LastAction::Call,
            BetAction::Bet(_) => LastAction::Bet,
            BetAction::Raise(_) => LastAction::Raise,
            BetAction::AllIn(_) => LastAction::AllIn,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, derive_more::Display)]
pub enum BetError {
    BetTooLow,
    BetTooHigh,
    NotLegalNow,
    OutOfTurn,
    NoBetExpected,
}

impl std::error::Error for BetError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals() {
        assert_eq!(BetAction::Check.total(), 0);
        assert_eq!(BetAction::Fold.total(), 0);
        assert_eq!(BetAction::Call(30).total(), 30);
        assert_eq!(BetAction::Raise(90).total(), 90);
        assert!(BetAction::AllIn(5).is_allin());
        assert!(!BetAction::Call(5).is_allin());
    }

    #[test]
    fn last_action_tracks_kind() {
        assert_eq!(LastAction::from(&BetAction::Bet(10)), LastAction::Bet);
        assert_eq!(LastAction::from(&BetAction::AllIn(10)), LastAction::AllIn);
        assert_eq!(LastAction::default(), LastAction::None);
    }
}
