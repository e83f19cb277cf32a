use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use rust_decimal::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::input::{parse_quantity, Command, InputError, CMD_CLEAR, CMD_END, CMD_HELP, CMD_MENU};
use crate::menu::Menu;
use crate::money::Rm;
use crate::receipt::{rule, write_totals, Receipt, BANNER, FAREWELL, TITLE};
use crate::tally::Tally;

const REPORT_WIDTH: usize = 40;

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("Unrecognised code '{0}'! Simply input '?' to seek help.")]
    UnknownCode(char),
    #[error("Insufficient payment received! Payment should be at least {required}")]
    InsufficientPayment { required: Rm },
}

/// A completed order kept for the end-of-day transaction history.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub number: u32,
    pub tally: Tally,
}

/// One cashier session: the bill being built, the day's aggregate, and the
/// orders billed so far.
pub struct Session {
    menu: Menu,
    order: Tally,
    day: Tally,
    orders_billed: u32,
    history: Vec<OrderRecord>,
    receipt_dir: PathBuf,
}

impl Session {
    pub fn new(menu: Menu, receipt_dir: impl Into<PathBuf>) -> Session {
        Session {
            order: Tally::for_menu(&menu),
            day: Tally::for_menu(&menu),
            menu,
            orders_billed: 0,
            history: Vec::new(),
            receipt_dir: receipt_dir.into(),
        }
    }

    pub fn orders_billed(&self) -> u32 {
        self.orders_billed
    }
    #[cfg(test)]
    pub fn order(&self) -> &Tally {
        &self.order
    }
    #[cfg(test)]
    pub fn day(&self) -> &Tally {
        &self.day
    }
    #[cfg(test)]
    pub fn history(&self) -> &[OrderRecord] {
        &self.history
    }

    pub fn add_item(&mut self, code: char, quantity: i64) -> Result<(), SessionError> {
        let index = self
            .menu
            .position(code)
            .ok_or(SessionError::UnknownCode(code))?;
        self.order.add_quantity(index, quantity);
        self.order.recompute_totals(&self.menu);
        debug!(
            code = %code,
            quantity,
            now = self.order.quantity(index),
            "Adjusted bill"
        );
        Ok(())
    }

    pub fn clear_order(&mut self) {
        self.order.clear();
        debug!("Cleared bill");
    }

    /// Takes payment for the current bill. On success the receipt is printed
    /// to file, the bill is folded into the day's sales and cleared, and the
    /// rendered receipt is returned. On failure nothing changes.
    pub fn checkout(&mut self, amount_paid: Decimal) -> Result<String, SessionError> {
        self.order.recompute_totals(&self.menu);
        if amount_paid < self.order.total() {
            debug!(
                paid = %amount_paid,
                total = %self.order.total(),
                "Rejected payment"
            );
            return Err(SessionError::InsufficientPayment {
                required: Rm(self.order.total()),
            });
        }

        self.orders_billed += 1;
        let number = self.orders_billed;
        let text = {
            let receipt = Receipt::new(&self.order, &self.menu, amount_paid, number);
            receipt.save(&self.receipt_dir);
            receipt.to_string()
        };
        self.day.absorb(&self.order, &self.menu);
        self.history.push(OrderRecord {
            number,
            tally: self.order.clone(),
        });
        info!(
            order = number,
            total = %self.order.total(),
            paid = %amount_paid,
            "Checked out"
        );
        self.order.clear();
        Ok(text)
    }

    pub fn daily_report(&self) -> DailyReport<'_> {
        DailyReport { session: self }
    }

    /// Runs the interactive loop until the end-session command or end of
    /// input, then prints the daily report and waits for a final line.
    pub fn run(&mut self, mut input: impl BufRead, mut out: impl Write) -> Result<()> {
        writeln!(out, "{}\n{}\n{}\n", BANNER, TITLE, BANNER)?;
        write_help(&mut out)?;
        self.write_menu(&mut out)?;

        loop {
            writeln!(out, "\n{}\n", rule())?;
            writeln!(out, "Order: #{}", self.orders_billed() + 1)?;
            write!(out, "\n{}", self.order.summary(&self.menu, "Items in bill:"))?;
            write!(
                out,
                "\nEnter a code to edit bill/view informations,\nor an amount in RM to checkout: "
            )?;
            out.flush()?;

            let line = match read_line(&mut input)? {
                Some(line) => line,
                None => break,
            };
            writeln!(out)?;

            match Command::parse(&line) {
                Ok(Command::Checkout(amount)) => match self.checkout(amount) {
                    Ok(receipt) => write!(out, "{}", receipt)?,
                    Err(e) => writeln!(out, "{}", e)?,
                },
                Ok(Command::Clear) => self.clear_order(),
                Ok(Command::ShowMenu) => self.write_menu(&mut out)?,
                Ok(Command::ShowHelp) => write_help(&mut out)?,
                Ok(Command::EndSession) => break,
                Ok(Command::Item(code)) => self.prompt_item(code, &mut input, &mut out)?,
                Err(InputError::Empty) => {}
                Err(e) => writeln!(out, "Action cancelled: {}.", e)?,
            }
        }

        info!(orders = self.orders_billed(), total = %self.day.total(), "Session ended");
        write!(out, "{}", self.daily_report())?;
        writeln!(out, "Enter anything to exit.")?;
        out.flush()?;
        read_line(&mut input)?;
        Ok(())
    }

    fn prompt_item(
        &mut self,
        code: char,
        input: &mut impl BufRead,
        out: &mut impl Write,
    ) -> Result<()> {
        let item = match self.menu.position(code).and_then(|i| self.menu.get(i)) {
            Some(item) => item,
            None => {
                writeln!(out, "{}", SessionError::UnknownCode(code))?;
                return Ok(());
            }
        };
        write!(out, "Enter the quantity of {} to add: ", item.name())?;
        out.flush()?;
        let line = match read_line(input)? {
            Some(line) => line,
            None => return Ok(()),
        };
        match parse_quantity(&line) {
            Ok(quantity) => self.add_item(code, quantity)?,
            Err(e) => writeln!(out, "Action cancelled: {}.", e)?,
        }
        Ok(())
    }

    fn write_menu(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "\n=== MENU {}\n", "=".repeat(27))?;
        for item in &self.menu {
            write!(out, "{}", item)?;
        }
        writeln!(out, "{}", rule())
    }
}

fn write_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "=== HELP {}", "=".repeat(27))?;
    writeln!(out, "List of codes for internal commands:\n")?;
    writeln!(out, "{} - Clears items in the current bill.", CMD_CLEAR)?;
    writeln!(out, "{} - Displays the menu of available items.", CMD_MENU)?;
    writeln!(out, "{} - Displays this panel.", CMD_HELP)?;
    writeln!(
        out,
        "{} - Ends the current session and generates a sales report.",
        CMD_END
    )?;
    writeln!(out, "{}", rule())?;
    writeln!(out, "How to use:\n")?;
    writeln!(out, "Input item code -> quantity")?;
    writeln!(out, "E.g. 'H' followed by '5' adds 5 Hamburgers")?;
    writeln!(out, "('-5' removes 5 Hamburgers)\n")?;
    writeln!(out, "After confirming the bill,")?;
    writeln!(
        out,
        "input the payment received in RM to checkout and close the bill."
    )?;
    writeln!(out, "{}", rule())
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// End-of-day report over the aggregate tally and the order history.
pub struct DailyReport<'a> {
    session: &'a Session,
}

impl fmt::Display for DailyReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Session {
            menu,
            day,
            orders_billed,
            history,
            ..
        } = self.session;
        let wide = "=".repeat(REPORT_WIDTH);

        writeln!(f, "\n{}\n DAILY MEAL SALES REPORT\n{}", wide, wide)?;
        writeln!(f, "Orders billed: {}", orders_billed)?;

        writeln!(f, "\nTransaction history:")?;
        if history.is_empty() {
            writeln!(f, "No orders processed yet.")?;
        }
        for record in history {
            writeln!(f, "Order #{}", record.number)?;
            for (item, &qty) in menu.iter().zip(record.tally.quantities()) {
                if qty > 0 {
                    writeln!(f, "- {} × {}", item.name(), qty)?;
                }
            }
            writeln!(f, "Total: {}", Rm(record.tally.total()))?;
        }

        write!(f, "\n{}", day.summary(menu, "Items sold today:"))?;
        writeln!(f, "\n{}", rule())?;
        write_totals(f, day)?;
        writeln!(f, "{}", rule())?;
        writeln!(f, "{}", FAREWELL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuItem;
    use std::fs;
    use std::io::Cursor;

    fn two_item_session(dir: &std::path::Path) -> Result<Session> {
        let menu = Menu::new(vec![
            MenuItem::new('N', "Nasi Lemak", Decimal::new(900, 2)),
            MenuItem::new('C', "Chicken Rice", Decimal::new(800, 2)),
        ])?;
        Ok(Session::new(menu, dir))
    }

    #[test]
    fn test_add_item() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut session = two_item_session(dir.path())?;
        session.add_item('n', 2)?;
        session.add_item('C', 1)?;
        assert_eq!(session.order().quantities(), &[2, 1]);
        assert_eq!(session.order().total(), Decimal::new(2860, 2));

        session.add_item('C', -100)?;
        assert_eq!(session.order().quantity(1), 0);

        let res = session.add_item('Z', 1);
        assert_eq!(res.unwrap_err(), SessionError::UnknownCode('Z'));
        assert_eq!(session.order().quantities(), &[2, 0]);
        Ok(())
    }

    #[test]
    fn test_insufficient_payment_changes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut session = two_item_session(dir.path())?;
        session.add_item('N', 2)?;
        session.add_item('C', 1)?;
        let before = session.order().clone();

        let res = session.checkout(Decimal::from(20));
        assert_eq!(
            res.unwrap_err(),
            SessionError::InsufficientPayment {
                required: Rm(Decimal::new(2860, 2))
            }
        );
        assert_eq!(session.order(), &before);
        assert!(session.day().is_empty());
        assert_eq!(session.orders_billed(), 0);
        assert!(session.history().is_empty());
        assert!(!dir.path().join("ReceiptNo1.txt").exists());
        Ok(())
    }

    #[test]
    fn test_checkout() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut session = two_item_session(dir.path())?;
        session.add_item('N', 2)?;
        session.add_item('C', 1)?;

        let receipt = session.checkout(Decimal::from(30))?;
        assert!(receipt.contains("Order: #1\n"));
        assert!(receipt.contains(" Change given: RM 1.40\n"));
        assert!(session.order().is_empty());
        assert_eq!(session.order().total(), Decimal::ZERO);
        assert_eq!(session.day().quantities(), &[2, 1]);
        assert_eq!(session.day().total(), Decimal::new(2860, 2));
        assert_eq!(session.orders_billed(), 1);
        assert_eq!(session.history()[0].number, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("ReceiptNo1.txt"))?,
            receipt
        );
        Ok(())
    }

    #[test]
    fn test_checkout_empty_bill() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut session = two_item_session(dir.path())?;
        let receipt = session.checkout(Decimal::ZERO)?;
        assert!(receipt.contains("Order: #1\n"));
        assert!(receipt.contains(" Grand total: RM 0.00\n"));
        assert!(!receipt.contains("Change given"));
        assert_eq!(session.orders_billed(), 1);
        assert_eq!(session.history().len(), 1);
        assert!(session.day().is_empty());
        assert!(dir.path().join("ReceiptNo1.txt").exists());
        Ok(())
    }

    #[test]
    fn test_sub_sen_overpayment_shows_no_change() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let menu = Menu::new(vec![MenuItem::new('N', "Nasi Lemak", Decimal::new(900, 2))])?;
        let mut session = Session::new(menu, dir.path());
        let mut out = Vec::new();
        session.run(Cursor::new("n\n1\n9.901\n>\n"), &mut out)?;
        let out = String::from_utf8(out)?;
        assert!(out.contains("Amount received: RM 9.90\n"));
        assert!(!out.contains("Change given"));
        assert_eq!(session.orders_billed(), 1);
        Ok(())
    }

    #[test]
    fn test_checkout_survives_unwritable_receipt_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut session = two_item_session(&dir.path().join("missing"))?;
        session.add_item('C', 1)?;
        session.checkout(Decimal::new(880, 2))?;
        assert_eq!(session.orders_billed(), 1);
        assert_eq!(session.day().quantities(), &[0, 1]);
        Ok(())
    }

    #[test]
    fn test_day_accumulates_orders() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut session = two_item_session(dir.path())?;
        session.add_item('N', 2)?;
        session.add_item('C', 1)?;
        session.checkout(Decimal::from(30))?;
        session.add_item('C', 3)?;
        session.checkout(Decimal::from(100))?;
        session.add_item('N', 1)?;
        session.clear_order();

        assert_eq!(session.day().quantities(), &[2, 4]);
        assert_eq!(session.day().subtotal(), Decimal::from(50));
        assert_eq!(session.day().total(), Decimal::from(55));
        assert_eq!(session.orders_billed(), 2);
        assert!(session.order().is_empty());

        let report = session.daily_report().to_string();
        assert!(report.contains("Orders billed: 2\n"));
        assert!(report.contains("Order #2\n- Chicken Rice × 3\nTotal: RM 26.40\n"));
        assert!(report.contains("(C) [RM 8.00] Chicken Rice × 4 = RM 32.00\n"));
        assert!(report.contains(" Grand total: RM 55.00\n"));
        Ok(())
    }

    #[test]
    fn test_report_without_orders() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let session = two_item_session(dir.path())?;
        let report = session.daily_report().to_string();
        assert!(report.contains("Orders billed: 0\n"));
        assert!(report.contains("No orders processed yet.\n"));
        assert!(report.contains("Items sold today:\nNothing.\n"));
        Ok(())
    }

    #[test]
    fn test_run_script() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut session = two_item_session(dir.path())?;
        let script = "n\n2\nc\n1\nx\nc\n1.5\n20\n30\n?\n,\nn\n4\n<\n>\nbye\n";
        let mut out = Vec::new();
        session.run(Cursor::new(script), &mut out)?;
        let out = String::from_utf8(out)?;

        assert!(out.contains("Enter the quantity of Nasi Lemak to add: "));
        assert!(out.contains("Unrecognised code 'X'!"));
        assert!(out.contains("Action cancelled: item quantity should be an integer."));
        assert!(out.contains("Payment should be at least RM 28.60"));
        assert!(out.contains(" Change given: RM 1.40"));
        assert!(out.contains("Order: #2\n"));
        assert!(out.contains("DAILY MEAL SALES REPORT"));
        assert!(out.ends_with("Enter anything to exit.\n"));

        assert_eq!(session.orders_billed(), 1);
        assert_eq!(session.day().quantities(), &[2, 1]);
        assert!(session.order().is_empty());
        assert!(dir.path().join("ReceiptNo1.txt").exists());
        Ok(())
    }

    #[test]
    fn test_run_ends_on_end_of_input() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut session = two_item_session(dir.path())?;
        let mut out = Vec::new();
        session.run(Cursor::new("c\n2\n600000\n"), &mut out)?;
        let out = String::from_utf8(out)?;
        assert!(out.contains("Action cancelled: amounts must be less than RM 524288."));
        assert!(out.contains("Orders billed: 0\n"));
        assert_eq!(session.order().quantities(), &[0, 2]);
        Ok(())
    }
}
