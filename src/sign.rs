//! Debit/Credit presentation of summed amounts.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Polarity {
    Debit,
    Credit,
}

impl Polarity {
    pub fn of(value: Decimal) -> Self {
        if value.is_sign_negative() && !value.is_zero() {
            Polarity::Credit
        } else {
            Polarity::Debit
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Debit => "Debit",
            Polarity::Credit => "Credit",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Magnitude and polarity of a summed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Presented {
    pub magnitude: Decimal,
    pub polarity: Polarity,
}

/// Turns signed totals into display values. Only ever fed totals that have
/// already been summed; a per-record magnitude would lose the sign.
#[derive(Debug, Clone)]
pub struct SignPresenter {
    currency_symbol: String,
    unit: String,
}

impl Default for SignPresenter {
    fn default() -> Self {
        Self::new("₹", "Lacs")
    }
}

impl SignPresenter {
    pub fn new(currency_symbol: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
            unit: unit.into(),
        }
    }

    /// Zero is presented as a debit.
    pub fn present(&self, value: Decimal) -> Presented {
        Presented {
            magnitude: value.abs(),
            polarity: Polarity::of(value),
        }
    }

    /// Bar and table label, e.g. `₹1,234.50 (Credit)`.
    pub fn display_text(&self, value: Decimal) -> String {
        let presented = self.present(value);
        format!(
            "{}{} ({})",
            self.currency_symbol,
            group_thousands(presented.magnitude),
            presented.polarity
        )
    }

    /// Summary card label, e.g. `₹1,234.50 Lacs (Debit)`.
    pub fn card_text(&self, value: Decimal) -> String {
        let presented = self.present(value);
        format!(
            "{}{} {} ({})",
            self.currency_symbol,
            group_thousands(presented.magnitude),
            self.unit,
            presented.polarity
        )
    }
}

/// Two decimals with comma thousands separators. Expects a non-negative value.
fn group_thousands(magnitude: Decimal) -> String {
    let fixed = format!("{:.2}", magnitude.round_dp(2));
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{grouped}.{fraction}")
}
