use std::str::FromStr;

use rust_decimal::prelude::*;
use thiserror::Error;

pub const CMD_CLEAR: char = '<';
pub const CMD_MENU: char = ',';
pub const CMD_HELP: char = '?';
pub const CMD_END: char = '>';

pub const CONTROL_CODES: [char; 4] = [CMD_CLEAR, CMD_MENU, CMD_HELP, CMD_END];

/// Payments must be strictly smaller than this in magnitude.
pub const AMOUNT_CEILING: i64 = 524_288;
/// Quantities must be strictly smaller than this in magnitude.
pub const QUANTITY_CEILING: i64 = 8_192;

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error("no input given")]
    Empty,
    #[error("{0:?} is not a number")]
    NotANumber(String),
    #[error("amounts must be less than RM {}", AMOUNT_CEILING)]
    AmountOutOfRange,
    #[error("item quantity should be an integer")]
    NotWhole,
    #[error("only quantities less than {} are accepted", QUANTITY_CEILING)]
    QuantityOutOfRange,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Command {
    Checkout(Decimal),
    Clear,
    ShowMenu,
    ShowHelp,
    EndSession,
    Item(char),
}

/// Plain decimal notation: an optional sign, digits, and an optional
/// fraction with at least one digit.
fn is_plain_number(text: &str) -> bool {
    let unsigned = text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}

/// `too_large` is returned for well-formed numbers `Decimal` cannot hold.
fn parse_number(text: &str, too_large: InputError) -> Result<Decimal, InputError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InputError::Empty);
    }
    if !is_plain_number(text) {
        return Err(InputError::NotANumber(text.to_string()));
    }
    Decimal::from_str(text).map_err(|_| too_large)
}

pub fn parse_amount(text: &str) -> Result<Decimal, InputError> {
    let amount = parse_number(text, InputError::AmountOutOfRange)?;
    if amount.abs() >= Decimal::from(AMOUNT_CEILING) {
        return Err(InputError::AmountOutOfRange);
    }
    Ok(amount)
}

/// Accepts whole numbers, including forms like `5.00`.
pub fn parse_quantity(text: &str) -> Result<i64, InputError> {
    let quantity = parse_number(text, InputError::QuantityOutOfRange)?;
    if !quantity.fract().is_zero() {
        return Err(InputError::NotWhole);
    }
    if quantity.abs() >= Decimal::from(QUANTITY_CEILING) {
        return Err(InputError::QuantityOutOfRange);
    }
    quantity.to_i64().ok_or(InputError::QuantityOutOfRange)
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, InputError> {
        match parse_amount(line) {
            Ok(amount) => return Ok(Command::Checkout(amount)),
            Err(InputError::NotANumber(_)) => {}
            Err(e) => return Err(e),
        }
        let first = line
            .trim()
            .chars()
            .next()
            .ok_or(InputError::Empty)?
            .to_ascii_uppercase();
        Ok(match first {
            CMD_CLEAR => Command::Clear,
            CMD_MENU => Command::ShowMenu,
            CMD_HELP => Command::ShowHelp,
            CMD_END => Command::EndSession,
            code => Command::Item(code),
        })
    }
}
