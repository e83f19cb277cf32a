use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::input::CONTROL_CODES;
use crate::money::Rm;

#[derive(Error, Debug, PartialEq)]
pub enum MenuError {
    #[error("menu must contain at least one item")]
    Empty,
    #[error("duplicate item code '{0}'")]
    DuplicateCode(char),
    #[error("item code '{0}' is reserved")]
    ReservedCode(char),
    #[error("item '{code}' has a negative price")]
    NegativePrice { code: char },
    #[error("item code must be a single character, got {0:?}")]
    InvalidCode(String),
    #[error("invalid price {0:?}")]
    InvalidPrice(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    code: char,
    name: String,
    price: Decimal,
}

impl MenuItem {
    pub fn new(code: char, name: impl Into<String>, price: Decimal) -> MenuItem {
        MenuItem {
            code,
            name: name.into(),
            price,
        }
    }
    pub fn code(&self) -> char {
        self.code
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn price(&self) -> Decimal {
        self.price
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "({}) {}", self.code, self.name)?;
        writeln!(f, "Price: {}", Rm(self.price))
    }
}

/// One row of a menu file: `code,name,price`, no header.
#[derive(Debug, Deserialize, Serialize)]
struct MenuRow {
    code: String,
    name: String,
    price: String,
}

/// The fixed, ordered list of sellable items. Every tally is sized from it and
/// addressed by the same positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Result<Menu, MenuError> {
        if items.is_empty() {
            return Err(MenuError::Empty);
        }
        for (i, item) in items.iter().enumerate() {
            let code = item.code;
            if CONTROL_CODES.contains(&code)
                || code.is_ascii_digit()
                || matches!(code, '-' | '+' | '.')
                || code.is_whitespace()
            {
                return Err(MenuError::ReservedCode(code));
            }
            if item.price < Decimal::ZERO {
                return Err(MenuError::NegativePrice { code });
            }
            if items[..i]
                .iter()
                .any(|prev| prev.code.to_ascii_uppercase() == code.to_ascii_uppercase())
            {
                return Err(MenuError::DuplicateCode(code));
            }
        }
        Ok(Menu { items })
    }

    /// The menu the restaurant opens with when no menu file is available.
    pub fn default_menu() -> Menu {
        Menu {
            items: vec![
                MenuItem::new('N', "Nasi Lemak", Decimal::new(900, 2)),
                MenuItem::new('C', "Chicken Rice", Decimal::new(800, 2)),
                MenuItem::new('M', "Masala Dosa", Decimal::new(600, 2)),
                MenuItem::new('H', "Hamburger", Decimal::new(500, 2)),
                MenuItem::new('F', "Fish and Chips", Decimal::new(1200, 2)),
            ],
        }
    }

    /// Reads a menu file, or seeds `path` with the default menu if it does not
    /// exist yet. Seeding is best-effort.
    pub fn load_or_seed(path: &Path) -> Result<Menu> {
        if !path.exists() {
            let menu = Menu::default_menu();
            if let Err(e) = menu.save(path) {
                warn!(
                    error = e.to_string(),
                    path = %path.display(),
                    "Unable to write default menu"
                );
            }
            return Ok(menu);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut items = Vec::new();
        for result in reader.deserialize() {
            let MenuRow { code, name, price }: MenuRow = result?;
            let mut chars = code.chars();
            let c = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(MenuError::InvalidCode(code).into()),
            };
            let price = Decimal::from_str(&price).map_err(|_| MenuError::InvalidPrice(price))?;
            items.push(MenuItem::new(c, name, price));
        }
        let menu = Menu::new(items)?;
        debug!(items = menu.len(), path = %path.display(), "Loaded menu");
        Ok(menu)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(File::create(path)?);
        for item in &self.items {
            writer.serialize(MenuRow {
                code: item.code.to_string(),
                name: item.name.clone(),
                price: item.price.to_string(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Case-insensitive lookup of an item code, returning its position.
    pub fn position(&self, code: char) -> Option<usize> {
        let code = code.to_ascii_uppercase();
        self.items
            .iter()
            .position(|item| item.code.to_ascii_uppercase() == code)
    }

    pub fn get(&self, index: usize) -> Option<&MenuItem> {
        self.items.get(index)
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, MenuItem> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a Menu {
    type Item = &'a MenuItem;
    type IntoIter = std::slice::Iter<'a, MenuItem>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
