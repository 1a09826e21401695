use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217-style currency code.
///
/// The code decides how many minor-unit digits amounts carry when they
/// are rounded for display and how large the share-sum tolerance is.
///
/// # Examples
///
/// ```
/// use split_ledger::core::currency::CurrencyCode;
/// use rust_decimal_macros::dec;
///
/// let usd = CurrencyCode::new("USD");
/// assert_eq!(usd.minor_digits(), 2);
/// assert_eq!(usd.minor_unit(), dec!(0.01));
///
/// let jpy = CurrencyCode::new("JPY");
/// assert_eq!(jpy.minor_unit(), dec!(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

/// Currencies without a minor unit.
const ZERO_DIGIT: &[&str] = &["BIF", "CLP", "ISK", "JPY", "KRW", "PYG", "UGX", "VND", "XAF", "XOF"];
/// Currencies quoted to thousandths.
const THREE_DIGIT: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places in one minor unit.
    pub fn minor_digits(&self) -> u32 {
        let code = self.0.as_str();
        if ZERO_DIGIT.contains(&code) {
            0
        } else if THREE_DIGIT.contains(&code) {
            3
        } else {
            2
        }
    }

    /// The smallest displayable amount, e.g. 0.01 for USD.
    pub fn minor_unit(&self) -> Decimal {
        Decimal::new(1, self.minor_digits())
    }

    /// Round an amount to the currency's minor unit, half away from zero.
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.minor_digits(), RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencyCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}
