//! Tools exposed to the LLM during classification
//!
//! Each tool has a typed parameter struct whose JSON Schema is sent to the
//! provider. `ToolBox::execute` dispatches a tool call by name and returns
//! the result as text for the follow-up `tool` message.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::ai::types::ToolDefinition;
use crate::currency::CurrencyConverter;
use crate::error::{Error, Result};
use crate::models::Currency;

pub const CONVERT_CURRENCY: &str = "convert_currency";
pub const FORMAT_DATETIME: &str = "format_datetime";

pub const DEFAULT_OUTPUT_TZ: &str = "Europe/Madrid";
const OUTPUT_FORMAT: &str = "%d/%m/%Y %H:%M";

// =============================================================================
// convert_currency
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertCurrencyParams {
    /// Amount to convert, as a decimal string
    #[schemars(description = "Amount to convert, e.g. \"12.50\"")]
    pub amount: String,

    #[schemars(description = "ISO 4217 code of the source currency, e.g. USD")]
    pub from_currency: String,

    #[serde(default = "default_to_currency")]
    #[schemars(description = "ISO 4217 code of the target currency (default EUR)")]
    pub to_currency: String,
}

fn default_to_currency() -> String {
    Currency::Eur.as_str().to_string()
}

pub async fn convert_currency(
    converter: &CurrencyConverter,
    params: ConvertCurrencyParams,
) -> Result<String> {
    let amount: Decimal = params
        .amount
        .trim()
        .parse()
        .map_err(|e| Error::Validation(format!("Invalid amount '{}': {}", params.amount, e)))?;
    let from: Currency = params.from_currency.parse().map_err(Error::Validation)?;
    let to: Currency = params.to_currency.parse().map_err(Error::Validation)?;

    let converted = converter.convert(amount, from, to).await?;
    Ok(format!("{} {}", converted.round_dp(2), to))
}

// =============================================================================
// format_datetime
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FormatDatetimeParams {
    /// Date/time string, RFC 3339 or `YYYY-MM-DD HH:MM[:SS]`
    #[schemars(description = "Date and time to format, e.g. 2024-03-15T14:30:00Z")]
    pub dt: String,

    #[serde(default = "default_output_tz")]
    #[schemars(description = "IANA timezone for the output (default Europe/Madrid)")]
    pub output_tz: String,
}

fn default_output_tz() -> String {
    DEFAULT_OUTPUT_TZ.to_string()
}

/// Render a datetime as `DD/MM/YYYY HH:MM` in the target zone
///
/// Inputs without an offset are taken to be in the target zone already.
pub fn format_datetime(params: &FormatDatetimeParams) -> Result<String> {
    let tz: Tz = params
        .output_tz
        .parse()
        .map_err(|_| Error::Validation(format!("Unknown timezone: {}", params.output_tz)))?;
    let input = params.dt.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&tz).format(OUTPUT_FORMAT).to_string());
    }

    let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| Error::Validation(format!("Unrecognized datetime: {}", params.dt)))?;

    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::Validation(format!("Nonexistent local time: {}", params.dt)))?;
    Ok(local.format(OUTPUT_FORMAT).to_string())
}

// =============================================================================
// Registry
// =============================================================================

fn schema_value<T: schemars::JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

/// Tool declarations sent with classification requests
pub fn expense_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            CONVERT_CURRENCY,
            "Convert an amount of money from one currency to another using live exchange rates",
            schema_value::<ConvertCurrencyParams>(),
        ),
        ToolDefinition::new(
            FORMAT_DATETIME,
            "Format a date and time as DD/MM/YYYY HH:MM in a given timezone",
            schema_value::<FormatDatetimeParams>(),
        ),
    ]
}

/// Executes tool calls requested by the model
#[derive(Clone)]
pub struct ToolBox {
    converter: CurrencyConverter,
}

impl ToolBox {
    pub fn new(converter: CurrencyConverter) -> Self {
        Self { converter }
    }

    pub fn from_env() -> Self {
        Self::new(CurrencyConverter::from_env())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        expense_tools()
    }

    /// Run a tool by name with JSON-encoded arguments
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String> {
        debug!(tool = %name, "Executing tool");
        match name {
            CONVERT_CURRENCY => {
                let params: ConvertCurrencyParams = parse_params(arguments)?;
                convert_currency(&self.converter, params).await
            }
            FORMAT_DATETIME => {
                let params: FormatDatetimeParams = parse_params(arguments)?;
                format_datetime(&params)
            }
            other => Err(Error::Upstream(format!("Unknown tool: {}", other))),
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(arguments: &str) -> Result<T> {
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments)
        .map_err(|e| Error::InvalidData(format!("Invalid params: {}", e)))
}
