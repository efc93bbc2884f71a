//! Ledger records and the fixed KPI column set.

use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut};
use std::str::FromStr;

use chrono::Month;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::calendar::{PeriodKey, Quarter};
use crate::error::{KapalError, Result};

/// Fractional digits carried by amounts inside a ledger frame.
pub const AMOUNT_SCALE: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Kpi {
    #[serde(rename = "Total_Income")]
    TotalIncome,
    #[serde(rename = "DOE")]
    Doe,
    #[serde(rename = "IOE")]
    Ioe,
    #[serde(rename = "PBT")]
    Pbt,
    #[serde(rename = "GOP")]
    Gop,
}

impl Kpi {
    /// Column order used everywhere a KPI set is emitted.
    pub const ALL: [Kpi; 5] = [Kpi::TotalIncome, Kpi::Doe, Kpi::Ioe, Kpi::Pbt, Kpi::Gop];

    pub fn column(self) -> &'static str {
        match self {
            Kpi::TotalIncome => "Total_Income",
            Kpi::Doe => "DOE",
            Kpi::Ioe => "IOE",
            Kpi::Pbt => "PBT",
            Kpi::Gop => "GOP",
        }
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Kpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Kpi {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Kpi::ALL
            .into_iter()
            .find(|kpi| kpi.column().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown KPI {s:?}"))
    }
}

/// One signed amount per KPI, indexed by [`Kpi`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct KpiValues([Decimal; 5]);

impl KpiValues {
    pub fn new(values: [Decimal; 5]) -> Self {
        Self(values)
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Kpi, Decimal)>,
    {
        let mut values = Self::default();
        for (kpi, amount) in pairs {
            values[kpi] = amount;
        }
        values
    }

    pub fn get(&self, kpi: Kpi) -> Decimal {
        self.0[kpi.position()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Kpi, Decimal)> + '_ {
        Kpi::ALL.into_iter().map(move |kpi| (kpi, self.get(kpi)))
    }

    /// Same values rounded to [`AMOUNT_SCALE`] digits.
    pub fn rescaled(mut self) -> Self {
        for value in self.0.iter_mut() {
            *value = value.round_dp(AMOUNT_SCALE);
        }
        self
    }
}

impl Index<Kpi> for KpiValues {
    type Output = Decimal;

    fn index(&self, kpi: Kpi) -> &Decimal {
        &self.0[kpi.position()]
    }
}

impl IndexMut<Kpi> for KpiValues {
    fn index_mut(&mut self, kpi: Kpi) -> &mut Decimal {
        &mut self.0[kpi.position()]
    }
}

impl AddAssign for KpiValues {
    fn add_assign(&mut self, other: Self) {
        for (lhs, rhs) in self.0.iter_mut().zip(other.0) {
            *lhs += rhs;
        }
    }
}

impl Add for KpiValues {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl std::iter::Sum for KpiValues {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Converts an amount to fixed-point units of `10^-AMOUNT_SCALE`.
pub fn to_units(amount: Decimal) -> Result<i64> {
    amount
        .round_dp(AMOUNT_SCALE)
        .checked_mul(Decimal::from(10i64.pow(AMOUNT_SCALE)))
        .and_then(|scaled| scaled.to_i64())
        .ok_or_else(|| KapalError::AmountOutOfRange(amount.to_string()))
}

/// Inverse of [`to_units`].
pub fn from_units(units: i64) -> Decimal {
    Decimal::new(units, AMOUNT_SCALE).normalize()
}

/// One month of KPI figures for a vessel within a sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    year: i32,
    month: Month,
    sector: String,
    vessel: String,
    kpis: KpiValues,
}

impl Record {
    /// Builds a record, rounding amounts to the ledger scale. A year below 1 or
    /// a blank sector or vessel name violates the provider contract.
    pub fn new(
        year: i32,
        month: Month,
        sector: impl Into<String>,
        vessel: impl Into<String>,
        kpis: KpiValues,
    ) -> Result<Self> {
        let sector = sector.into();
        let vessel = vessel.into();
        if year < 1 {
            return Err(KapalError::InvalidYear { year, row: None });
        }
        if sector.trim().is_empty() {
            return Err(KapalError::MissingDimensionValue {
                dimension: "sector",
                row: None,
            });
        }
        if vessel.trim().is_empty() {
            return Err(KapalError::MissingDimensionValue {
                dimension: "vessel",
                row: None,
            });
        }
        Ok(Self {
            year,
            month,
            sector,
            vessel,
            kpis: kpis.rescaled(),
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn quarter(&self) -> Quarter {
        Quarter::of(self.month)
    }

    pub fn period_key(&self) -> PeriodKey {
        PeriodKey::new(self.year, self.month)
    }

    pub fn sector(&self) -> &str {
        &self.sector
    }

    pub fn vessel(&self) -> &str {
        &self.vessel
    }

    pub fn kpis(&self) -> &KpiValues {
        &self.kpis
    }
}
