use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::prelude::*;
use tracing::{debug, warn};

use crate::menu::Menu;
use crate::money::{to_sen, Rm};
use crate::tally::Tally;

pub const BANNER: &str = "= * === * === * === * === * === * ==";
pub const TITLE: &str = "H & S Restaurant Meal Billing System";
pub const FAREWELL: &str = "Thank you and have a nice day ahead!";
pub const RULE_WIDTH: usize = 36;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Writes the subtotal, SST and grand total lines of a tally.
pub fn write_totals(f: &mut impl fmt::Write, tally: &Tally) -> fmt::Result {
    writeln!(f, " Subtotal: {}", Rm(tally.subtotal()))?;
    writeln!(f, " SST charge 10%: {}", Rm(tally.tax()))?;
    writeln!(f, " Grand total: {}", Rm(tally.total()))
}

/// A paid order, rendered the same way on screen and on file. The caller has
/// already checked that `amount_paid` covers the total.
pub struct Receipt<'a> {
    tally: &'a Tally,
    menu: &'a Menu,
    amount_paid: Decimal,
    order_number: u32,
}

impl<'a> Receipt<'a> {
    pub fn new(tally: &'a Tally, menu: &'a Menu, amount_paid: Decimal, order_number: u32) -> Self {
        Receipt {
            tally,
            menu,
            amount_paid,
            order_number,
        }
    }

    pub fn change(&self) -> Decimal {
        self.amount_paid - self.tally.total()
    }

    pub fn file_name(order_number: u32) -> String {
        format!("ReceiptNo{}.txt", order_number)
    }

    /// Writes the receipt into `dir`, replacing any earlier file for the same
    /// order number. Failures are logged and otherwise ignored.
    pub fn save(&self, dir: &Path) -> Option<PathBuf> {
        let path = dir.join(Receipt::file_name(self.order_number));
        match fs::write(&path, self.to_string()) {
            Ok(()) => {
                debug!(order = self.order_number, path = %path.display(), "Saved receipt");
                Some(path)
            }
            Err(e) => {
                warn!(
                    error = e.to_string(),
                    order = self.order_number,
                    path = %path.display(),
                    "Unable to save receipt"
                );
                None
            }
        }
    }
}

impl fmt::Display for Receipt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n{}\n{}\n", BANNER, TITLE, BANNER)?;
        writeln!(f, "Order: #{}\n", self.order_number)?;
        writeln!(f, "Items in bill:")?;
        self.tally.write_lines(f, self.menu)?;
        writeln!(f, "{}", rule())?;
        write_totals(f, self.tally)?;
        writeln!(f, "{}", rule())?;
        writeln!(f, "Amount received: {}", Rm(self.amount_paid))?;
        let change = to_sen(self.change());
        if change > Decimal::ZERO {
            writeln!(f, " Change given: {}", Rm(change))?;
        }
        writeln!(f, "{}", rule())?;
        writeln!(f, "{}", FAREWELL)
    }
}
