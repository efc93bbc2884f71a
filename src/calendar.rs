//! Month ordering, quarter derivation and period keys.
//!
//! Every chronological comparison in the crate goes through [`PeriodKey`];
//! labels such as `"Jan 2023"` are derived from a key and never parsed back.

use std::fmt;
use std::str::FromStr;

use chrono::Month;
use serde::Serialize;

use crate::error::{KapalError, Result};

/// The canonical month table. Built once and shared through
/// [`crate::config::EngineConfig`].
#[derive(Debug, Clone)]
pub struct PeriodCalendar {
    months: [Month; 12],
}

impl Default for PeriodCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodCalendar {
    pub fn new() -> Self {
        Self {
            months: [
                Month::January,
                Month::February,
                Month::March,
                Month::April,
                Month::May,
                Month::June,
                Month::July,
                Month::August,
                Month::September,
                Month::October,
                Month::November,
                Month::December,
            ],
        }
    }

    /// Months in calendar order.
    pub fn months(&self) -> &[Month] {
        &self.months
    }

    /// Resolves one of the twelve canonical English month names. Abbreviations,
    /// other casings and surrounding whitespace are rejected.
    pub fn parse_month(&self, name: &str) -> Result<Month> {
        self.months
            .iter()
            .copied()
            .find(|month| month.name() == name)
            .ok_or_else(|| KapalError::UnknownMonthName(name.to_string()))
    }

    pub fn month_index(&self, name: &str) -> Result<u32> {
        self.parse_month(name).map(|month| month.number_from_month())
    }

    pub fn quarter_of(&self, name: &str) -> Result<Quarter> {
        self.parse_month(name).map(Quarter::of)
    }

    pub fn period_key(&self, year: i32, name: &str) -> Result<PeriodKey> {
        self.parse_month(name).map(|month| PeriodKey::new(year, month))
    }

    pub fn display_label(&self, year: i32, name: &str) -> Result<String> {
        self.period_key(year, name).map(|key| key.label())
    }
}

/// `(year, month index)` ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: Month) -> Self {
        Self {
            year,
            month: month.number_from_month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// 1-based month index.
    pub fn month_index(&self) -> u32 {
        self.month
    }

    pub fn month(&self) -> Month {
        // month is always 1..=12, constructed from a `Month`
        Month::try_from(self.month as u8).unwrap_or(Month::January)
    }

    pub fn quarter(&self) -> Quarter {
        Quarter::of(self.month())
    }

    /// Months elapsed since January of year zero. Strictly increasing with
    /// the key, used where the comparison has to happen inside a frame.
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    pub fn label(&self) -> String {
        format!("{} {:04}", &self.month().name()[..3], self.year)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn of(month: Month) -> Self {
        match (month.number_from_month() + 2) / 3 {
            1 => Quarter::Q1,
            2 => Quarter::Q2,
            3 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    pub fn number(self) -> i32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    pub fn from_number(number: i32) -> Option<Self> {
        Quarter::ALL.get(usize::try_from(number).ok()?.checked_sub(1)?).copied()
    }

    /// `"Q1 2023"`
    pub fn label(self, year: i32) -> String {
        format!("{self} {year:04}")
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

impl FromStr for Quarter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(Quarter::Q1),
            "Q2" => Ok(Quarter::Q2),
            "Q3" => Ok(Quarter::Q3),
            "Q4" => Ok(Quarter::Q4),
            other => Err(format!("expected one of Q1, Q2, Q3, Q4, got {other:?}")),
        }
    }
}
