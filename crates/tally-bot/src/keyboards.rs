//! Inline keyboards and their callback data

use tally_core::models::{Currency, DEFAULT_CATEGORIES};

use crate::api::{InlineKeyboardButton, InlineKeyboardMarkup};

pub const CATEGORY_CALLBACK_PREFIX: &str = "category:";
pub const CURRENCY_CALLBACK_PREFIX: &str = "currency:";

/// Alternatives shown under the suggested category
pub const MAX_ALTERNATIVES: usize = 3;

const CURRENCY_COLUMNS: usize = 3;

/// A decoded button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Category(String),
    Currency(String),
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(category) = data.strip_prefix(CATEGORY_CALLBACK_PREFIX) {
            Some(Callback::Category(category.to_string()))
        } else {
            data.strip_prefix(CURRENCY_CALLBACK_PREFIX)
                .map(|code| Callback::Currency(code.to_string()))
        }
    }
}

/// Row 1 confirms the suggestion; row 2 offers the first canonical
/// categories other than the suggestion
pub fn category_confirmation_keyboard(suggested: &str) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![InlineKeyboardButton::new(
        format!("✅ {}", suggested),
        format!("{}{}", CATEGORY_CALLBACK_PREFIX, suggested),
    )]];

    let alternatives: Vec<InlineKeyboardButton> = DEFAULT_CATEGORIES
        .iter()
        .filter(|&&c| c != suggested)
        .take(MAX_ALTERNATIVES)
        .map(|c| InlineKeyboardButton::new(*c, format!("{}{}", CATEGORY_CALLBACK_PREFIX, c)))
        .collect();
    if !alternatives.is_empty() {
        rows.push(alternatives);
    }

    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}

/// Every supported currency, three per row, current one ticked
pub fn currency_selection_keyboard(current: Currency) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = Currency::ALL
        .iter()
        .map(|currency| {
            let mark = if *currency == current { "✓ " } else { "" };
            InlineKeyboardButton::new(
                format!("{}{} {}", mark, currency.symbol(), currency.as_str()),
                format!("{}{}", CURRENCY_CALLBACK_PREFIX, currency.as_str()),
            )
        })
        .collect();

    InlineKeyboardMarkup {
        inline_keyboard: buttons
            .chunks(CURRENCY_COLUMNS)
            .map(|row| row.to_vec())
            .collect(),
    }
}
