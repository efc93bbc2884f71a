use std::fmt;

use chrono::Month;
use itertools::Itertools;
use polars::{lazy::dsl::Expr, prelude::*};
use serde::Serialize;

use crate::calendar::{PeriodKey, Quarter};
use crate::error::Result;
use crate::frame::{records_to_frame, Header};
use crate::record::{from_units, Kpi, KpiValues, Record};

/// A column a ledger can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    Year,
    Month,
    Quarter,
    Sector,
    Vessel,
}

impl Dimension {
    pub fn column(self, header: &Header) -> &'static str {
        match self {
            Dimension::Year => header.year,
            Dimension::Month => header.month_index,
            Dimension::Quarter => header.quarter,
            Dimension::Sector => header.sector,
            Dimension::Vessel => header.vessel,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Year => "year",
            Dimension::Month => "month",
            Dimension::Quarter => "quarter",
            Dimension::Sector => "sector",
            Dimension::Vessel => "vessel",
        };
        f.write_str(name)
    }
}

/// Grouping key of a bucket. Dimensions that were not grouped on are `None`.
///
/// Field order matters: the derived `Ord` sorts by year, then month or
/// quarter, then sector and vessel alphabetically, which is the order every
/// result is presented in.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub quarter: Option<Quarter>,
    pub sector: Option<String>,
    pub vessel: Option<String>,
}

impl BucketKey {
    pub fn month(&self) -> Option<Month> {
        self.month
            .and_then(|index| u8::try_from(index).ok())
            .and_then(|index| Month::try_from(index).ok())
    }

    pub fn period_key(&self) -> Option<PeriodKey> {
        Some(PeriodKey::new(self.year?, self.month()?))
    }

    /// `Jan 2023`, `Q1 2023` or `2023` depending on the temporal grain.
    pub fn period_label(&self) -> String {
        match (self.year, self.period_key(), self.quarter) {
            (_, Some(key), _) => key.label(),
            (Some(year), None, Some(quarter)) => quarter.label(year),
            (Some(year), None, None) => year.to_string(),
            (None, None, Some(quarter)) => quarter.to_string(),
            (None, None, None) => self
                .month()
                .map(|month| month.name().to_string())
                .unwrap_or_else(|| "All".to_string()),
        }
    }

    pub fn value_of(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::Year => self.year.map(|year| year.to_string()),
            Dimension::Month => self.month().map(|month| month.name().to_string()),
            Dimension::Quarter => self.quarter.map(|quarter| quarter.to_string()),
            Dimension::Sector => self.sector.clone(),
            Dimension::Vessel => self.vessel.clone(),
        }
    }
}

/// One grouped-and-summed row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bucket {
    pub key: BucketKey,
    pub totals: KpiValues,
}

/// Immutable record snapshot held as a columnar frame. Every query starts a
/// fresh lazy plan from it, so one ledger serves concurrent queries.
#[derive(Debug, Clone)]
pub struct KpiLedger {
    pub columns: Header,
    frame: DataFrame,
}

impl KpiLedger {
    pub fn from_records(records: &[Record]) -> Result<Self> {
        Ok(Self {
            columns: Header::new(),
            frame: records_to_frame(records)?,
        })
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    fn kpi_sums(&self) -> Vec<Expr> {
        Kpi::ALL
            .iter()
            .map(|kpi| col(kpi.column()).fill_null(lit(0i64)).sum())
            .collect()
    }

    /// Lazy group-by-sum over `dimensions`. Duplicate dimensions are ignored.
    /// Row order of the result is unspecified.
    pub fn group(&self, dimensions: &[Dimension]) -> LazyFrame {
        let keys = dimensions
            .iter()
            .unique()
            .map(|dimension| col(dimension.column(&self.columns)))
            .collect_vec();
        if keys.is_empty() {
            return self.lazy().select(self.kpi_sums());
        }
        self.lazy().group_by(keys).agg(self.kpi_sums())
    }

    /// One bucket per distinct key combination present in the ledger.
    pub fn aggregate(&self, dimensions: &[Dimension]) -> Result<Vec<Bucket>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let grouped = self.group(dimensions).collect()?;
        let buckets = buckets_from_frame(&grouped, dimensions, &self.columns)?;
        tracing::debug!(
            dimensions = %dimensions.iter().join(","),
            buckets = buckets.len(),
            "aggregated ledger"
        );
        Ok(buckets)
    }

    /// Ungrouped sum of every KPI.
    pub fn grand_total(&self) -> Result<KpiValues> {
        let totals = self.lazy().select(self.kpi_sums()).collect()?;
        let mut values = KpiValues::default();
        for kpi in Kpi::ALL {
            let units = totals.column(kpi.column())?.i64()?.get(0).unwrap_or(0);
            values[kpi] = from_units(units);
        }
        Ok(values)
    }

    pub fn overview(&self) -> Result<DatasetOverview> {
        let distinct = |column: &str| -> Result<Vec<String>> {
            Ok(self
                .frame
                .column(column)?
                .str()?
                .into_iter()
                .flatten()
                .unique()
                .sorted()
                .map(str::to_string)
                .collect())
        };
        let years: Vec<i32> = self
            .frame
            .column(self.columns.year)?
            .i32()?
            .into_iter()
            .flatten()
            .unique()
            .sorted()
            .collect();

        Ok(DatasetOverview {
            records: self.len(),
            years,
            sectors: distinct(self.columns.sector)?,
            vessels: distinct(self.columns.vessel)?,
        })
    }
}

/// Reads the grouped frame back into typed buckets.
pub fn buckets_from_frame(
    frame: &DataFrame,
    dimensions: &[Dimension],
    header: &Header,
) -> Result<Vec<Bucket>> {
    let mut keys = vec![BucketKey::default(); frame.height()];
    for dimension in dimensions.iter().unique() {
        let column = frame.column(dimension.column(header))?;
        match dimension {
            Dimension::Year => {
                for (key, value) in keys.iter_mut().zip(column.i32()?) {
                    key.year = value;
                }
            }
            Dimension::Month => {
                for (key, value) in keys.iter_mut().zip(column.i32()?) {
                    key.month = value.and_then(|index| u32::try_from(index).ok());
                }
            }
            Dimension::Quarter => {
                for (key, value) in keys.iter_mut().zip(column.i32()?) {
                    key.quarter = value.and_then(Quarter::from_number);
                }
            }
            Dimension::Sector => {
                for (key, value) in keys.iter_mut().zip(column.str()?) {
                    key.sector = value.map(str::to_string);
                }
            }
            Dimension::Vessel => {
                for (key, value) in keys.iter_mut().zip(column.str()?) {
                    key.vessel = value.map(str::to_string);
                }
            }
        }
    }

    let mut totals = vec![KpiValues::default(); frame.height()];
    for kpi in Kpi::ALL {
        for (total, units) in totals.iter_mut().zip(frame.column(kpi.column())?.i64()?) {
            total[kpi] = from_units(units.unwrap_or(0));
        }
    }

    Ok(keys
        .into_iter()
        .zip(totals)
        .map(|(key, totals)| Bucket { key, totals })
        .collect())
}

/// Headline numbers about a snapshot, plus the observed values callers pick
/// default selections from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetOverview {
    pub records: usize,
    pub years: Vec<i32>,
    pub sectors: Vec<String>,
    pub vessels: Vec<String>,
}

impl DatasetOverview {
    /// First and last observed year.
    pub fn coverage(&self) -> Option<(i32, i32)> {
        Some((*self.years.first()?, *self.years.last()?))
    }
}
