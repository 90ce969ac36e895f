use crate::Chips;
use serde::{Deserialize, Serialize};

/// A chip amount as supplied by a player agent, before validation.
///
/// Agents are untrusted: they may hand back negative numbers, fractional
/// bets, or stringly-typed numerics. Everything is funneled through
/// [`Amount::normalize`] before the engine looks at it, so the betting logic
/// only ever sees non-negative integer chips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Amount {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for Amount {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Amount {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Amount {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Amount {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum AmountError {
    Negative,
    NotFinite,
    Unparseable,
    TooLarge,
}

impl std::error::Error for AmountError {}

impl Amount {
    /// Reduce to integer chips. Fractional amounts round half-to-even.
    pub fn normalize(&self) -> Result<Chips, AmountError> {
        match self {
            Amount::Int(v) => Self::from_int(*v),
            Amount::Float(v) => Self::from_float(*v),
            Amount::Text(s) => {
                let s = s.trim();
                if let Ok(v) = s.parse::<i64>() {
                    Self::from_int(v)
                } else if let Ok(v) = s.parse::<f64>() {
                    Self::from_float(v)
                } else {
                    Err(AmountError::Unparseable)
                }
            }
        }
    }

    fn from_int(v: i64) -> Result<Chips, AmountError> {
        if v < 0 {
            Err(AmountError::Negative)
        } else if v > Chips::MAX as i64 {
            Err(AmountError::TooLarge)
        } else {
            Ok(v as Chips)
        }
    }

    fn from_float(v: f64) -> Result<Chips, AmountError> {
        if !v.is_finite() {
            Err(AmountError::NotFinite)
        } else if v < 0.0 {
            Err(AmountError::Negative)
        } else {
            let rounded = v.round_ties_even();
            if rounded > Chips::MAX as f64 {
                Err(AmountError::TooLarge)
            } else {
                Ok(rounded as Chips)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_pass_through() {
        assert_eq!(Amount::from(0i64).normalize(), Ok(0));
        assert_eq!(Amount::from(75i64).normalize(), Ok(75));
        assert_eq!(Amount::from(-1i64).normalize(), Err(AmountError::Negative));
    }

    #[test]
    fn floats_round_half_to_even() {
        assert_eq!(Amount::from(75.5).normalize(), Ok(76));
        assert_eq!(Amount::from(75.4).normalize(), Ok(75));
        assert_eq!(Amount::from(76.5).normalize(), Ok(76));
        assert_eq!(Amount::from(74.5).normalize(), Ok(74));
    }

    #[test]
    fn bad_floats_rejected() {
        assert_eq!(Amount::from(-0.5).normalize(), Err(AmountError::Negative));
        assert_eq!(
            Amount::from(f64::NAN).normalize(),
            Err(AmountError::NotFinite)
        );
        assert_eq!(
            Amount::from(f64::INFINITY).normalize(),
            Err(AmountError::NotFinite)
        );
        assert_eq!(
            Amount::from(1e12).normalize(),
            Err(AmountError::TooLarge)
        );
    }

    #[test]
    fn strings_parse_as_integers() {
        assert_eq!(Amount::from("120").normalize(), Ok(120));
        assert_eq!(Amount::from(" 42 ").normalize(), Ok(42));
        assert_eq!(Amount::from("75.5").normalize(), Ok(76));
        assert_eq!(Amount::from("-3").normalize(), Err(AmountError::Negative));
        assert_eq!(
            Amount::from("all of it").normalize(),
            Err(AmountError::Unparseable)
        );
    }
}
