//! Domain models for Tally

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Categories the classifier is prompted with, in display order.
///
/// The bot's confirmation keyboard and `tally init` seed from this list.
pub const DEFAULT_CATEGORIES: [&str; 12] = [
    "Food & Dining",
    "Transportation",
    "Utilities",
    "Entertainment",
    "Healthcare",
    "Shopping",
    "Housing",
    "Education",
    "Travel",
    "Personal Care",
    "Subscriptions",
    "Other",
];

/// Supported ISO 4217 currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    #[default]
    Eur,
    Gbp,
    Jpy,
    Aud,
    Cad,
    Chf,
    Cny,
    Sek,
    Nzd,
}

impl Currency {
    pub const ALL: [Currency; 10] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Aud,
        Currency::Cad,
        Currency::Chf,
        Currency::Cny,
        Currency::Sek,
        Currency::Nzd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Aud => "AUD",
            Self::Cad => "CAD",
            Self::Chf => "CHF",
            Self::Cny => "CNY",
            Self::Sek => "SEK",
            Self::Nzd => "NZD",
        }
    }

    /// Display symbol used when rendering amounts
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Eur => "€",
            Self::Gbp => "£",
            Self::Jpy | Self::Cny => "¥",
            Self::Aud => "A$",
            Self::Cad => "C$",
            Self::Chf => "CHF",
            Self::Sek => "kr",
            Self::Nzd => "NZ$",
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "JPY" => Ok(Self::Jpy),
            "AUD" => Ok(Self::Aud),
            "CAD" => Ok(Self::Cad),
            "CHF" => Ok(Self::Chf),
            "CNY" => Ok(Self::Cny),
            "SEK" => Ok(Self::Sek),
            "NZD" => Ok(Self::Nzd),
            _ => Err(format!("Unknown currency: {}", s)),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Case-insensitive so "usd" from an LLM or a query string still parses
impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An expense category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub id: i64,
    pub name: String,
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A recorded expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<ExpenseCategory>,
    /// Telegram user that owns this expense (None for anonymous CLI entries)
    pub telegram_user_id: Option<i64>,
}

impl Expense {
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }
}

/// Input for creating an expense
#[derive(Debug, Clone, Default)]
pub struct NewExpense {
    pub amount: Decimal,
    pub currency: Currency,
    pub description: Option<String>,
    /// Defaults to now when not set
    pub date: Option<DateTime<Utc>>,
    pub category: Option<ExpenseCategory>,
    pub telegram_user_id: Option<i64>,
}

/// Per-user display preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    pub id: i64,
    pub telegram_user_id: i64,
    pub preferred_currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Spending total for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// Spending total for one calendar month ("YYYY-MM")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub month: String,
    pub total: Decimal,
}

/// Aggregates shown on the dashboard and the analytics endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_expenses: Decimal,
    pub expense_count: usize,
    pub category_totals: Vec<CategoryTotal>,
    pub monthly_totals: Vec<MonthlyTotal>,
}

/// Trim and collapse whitespace in a category name, adopting the canonical
/// spelling when it matches one of [`DEFAULT_CATEGORIES`] ignoring case.
pub fn normalize_category_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    DEFAULT_CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(&collapsed))
        .map(|c| c.to_string())
        .unwrap_or(collapsed)
}
