use std::fmt;

use rust_decimal::prelude::*;

/// Rounds half away from zero to whole sen.
pub fn to_sen(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Displays an amount as ringgit, rounded half away from zero to sen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rm(pub Decimal);

impl fmt::Display for Rm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RM {:.2}", to_sen(self.0))
    }
}
