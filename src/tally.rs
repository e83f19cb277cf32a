use std::fmt;

use rust_decimal::prelude::*;

use crate::menu::Menu;
use crate::money::Rm;

/// SST charged on every subtotal, 10%.
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Per-item quantities for one bill, or for the whole day's sales.
///
/// Slot `i` counts `menu[i]`; the tally holds no reference to the menu, so
/// anything that needs prices takes it as a parameter. Totals are cached and
/// only refreshed by [`Tally::recompute_totals`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    quantities: Vec<u64>,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
}

impl Tally {
    pub fn new(item_count: usize) -> Tally {
        Tally {
            quantities: vec![0; item_count],
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    pub fn for_menu(menu: &Menu) -> Tally {
        Tally::new(menu.len())
    }

    /// Adjusts slot `index` by `delta`, clamping at zero. Out-of-range
    /// indices are ignored. Totals are left stale.
    pub fn add_quantity(&mut self, index: usize, delta: i64) {
        if let Some(qty) = self.quantities.get_mut(index) {
            *qty = if delta < 0 {
                qty.saturating_sub(delta.unsigned_abs())
            } else {
                qty.saturating_add(delta as u64)
            };
        }
    }

    pub fn quantity(&self, index: usize) -> u64 {
        self.quantities.get(index).copied().unwrap_or(0)
    }

    pub fn quantities(&self) -> &[u64] {
        &self.quantities
    }

    pub fn recompute_totals(&mut self, menu: &Menu) {
        debug_assert_eq!(menu.len(), self.quantities.len());
        self.subtotal = self
            .quantities
            .iter()
            .zip(menu)
            .map(|(&qty, item)| item.price() * Decimal::from(qty))
            .sum();
        self.tax = self.subtotal * TAX_RATE;
        self.total = self.subtotal + self.tax;
    }

    /// Folds a completed order into this tally and refreshes the totals.
    pub fn absorb(&mut self, order: &Tally, menu: &Menu) {
        for (index, &qty) in order.quantities.iter().enumerate() {
            self.add_quantity(index, i64::try_from(qty).unwrap_or(i64::MAX));
        }
        self.recompute_totals(menu);
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.iter().all(|&qty| qty == 0)
    }

    pub fn clear(&mut self) {
        self.quantities.iter_mut().for_each(|qty| *qty = 0);
        self.subtotal = Decimal::ZERO;
        self.tax = Decimal::ZERO;
        self.total = Decimal::ZERO;
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }
    pub fn tax(&self) -> Decimal {
        self.tax
    }
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Item lines followed by the amount due, under `heading`.
    pub fn summary<'a>(&'a self, menu: &'a Menu, heading: &'a str) -> Summary<'a> {
        Summary {
            tally: self,
            menu,
            heading,
        }
    }

    pub(crate) fn write_lines(&self, f: &mut fmt::Formatter<'_>, menu: &Menu) -> fmt::Result {
        for (item, &qty) in menu.iter().zip(&self.quantities) {
            if qty == 0 {
                continue;
            }
            writeln!(
                f,
                "({}) [{}] {} × {} = {}",
                item.code(),
                Rm(item.price()),
                item.name(),
                qty,
                Rm(item.price() * Decimal::from(qty))
            )?;
        }
        Ok(())
    }
}

pub struct Summary<'a> {
    tally: &'a Tally,
    menu: &'a Menu,
    heading: &'a str,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        if self.tally.is_empty() {
            return writeln!(f, "Nothing.");
        }
        self.tally.write_lines(f, self.menu)?;
        writeln!(f)?;
        writeln!(f, "Amount to be paid: {}", Rm(self.tally.total))
    }
}
