use std::path::Path;

use itertools::Itertools;
use polars::prelude::*;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::calendar::PeriodCalendar;
use crate::error::{KapalError, Result};
use crate::record::{to_units, Kpi, KpiValues, Record};

/// Column names of snapshot files and of the in-memory ledger frame.
///
/// Snapshots carry `month` as a canonical name; the ledger frame replaces it
/// with the derived `month_index` and `quarter` columns.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub year: &'static str,
    pub month: &'static str,
    pub month_index: &'static str,
    pub quarter: &'static str,
    pub sector: &'static str,
    pub vessel: &'static str,
}

impl Header {
    pub const fn new() -> Self {
        Self {
            year: "year",
            month: "month",
            month_index: "month_index",
            quarter: "quarter",
            sector: "sector",
            vessel: "vessel",
        }
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the ledger frame. Amounts become fixed-point `i64` units so that
/// grouped sums stay exact.
pub fn records_to_frame(records: &[Record]) -> Result<DataFrame> {
    let header = Header::new();
    let mut columns = vec![
        Series::new(header.year, records.iter().map(Record::year).collect_vec()),
        Series::new(
            header.month_index,
            records
                .iter()
                .map(|r| r.period_key().month_index() as i32)
                .collect_vec(),
        ),
        Series::new(
            header.quarter,
            records.iter().map(|r| r.quarter().number()).collect_vec(),
        ),
        Series::new(header.sector, records.iter().map(Record::sector).collect_vec()),
        Series::new(header.vessel, records.iter().map(Record::vessel).collect_vec()),
    ];
    for kpi in Kpi::ALL {
        let units = records
            .iter()
            .map(|r| to_units(r.kpis().get(kpi)))
            .collect::<Result<Vec<i64>>>()?;
        columns.push(Series::new(kpi.column(), units));
    }
    Ok(DataFrame::new(columns)?)
}

/// Reads records out of a snapshot frame, enforcing the provider contract:
/// integer years, canonical month names, present year/sector/vessel and
/// numeric KPI cells. Missing KPI columns and null KPI cells count as zero;
/// anything else that is not a number is an error.
pub fn records_from_frame(frame: &DataFrame, calendar: &PeriodCalendar) -> Result<Vec<Record>> {
    let header = Header::new();
    let years = frame.column(header.year)?;
    if !years.dtype().is_integer() {
        return Err(KapalError::ColumnType {
            column: header.year.to_string(),
            expected: "integer",
            found: years.dtype().to_string(),
        });
    }
    let years = years.strict_cast(&DataType::Int32)?;
    let years = years.i32()?;
    let months = frame.column(header.month)?.cast(&DataType::String)?;
    let months = months.str()?;
    let sectors = frame.column(header.sector)?.cast(&DataType::String)?;
    let sectors = sectors.str()?;
    let vessels = frame.column(header.vessel)?.cast(&DataType::String)?;
    let vessels = vessels.str()?;
    let amounts = Kpi::ALL
        .iter()
        .map(|kpi| kpi_amounts(frame, *kpi))
        .collect::<Result<Vec<_>>>()?;

    let missing = |dimension: &'static str, row: usize| KapalError::MissingDimensionValue {
        dimension,
        row: Some(row),
    };

    (0..frame.height())
        .map(|row| {
            let year = years.get(row).ok_or_else(|| missing(header.year, row))?;
            let month = months.get(row).ok_or_else(|| missing(header.month, row))?;
            let month = calendar.parse_month(month)?;
            let sector = sectors.get(row).ok_or_else(|| missing(header.sector, row))?;
            let vessel = vessels.get(row).ok_or_else(|| missing(header.vessel, row))?;
            let kpis = KpiValues::from_pairs(
                Kpi::ALL
                    .iter()
                    .zip(&amounts)
                    .map(|(kpi, column)| (*kpi, column[row])),
            );
            Record::new(year, month, sector, vessel, kpis).map_err(|err| match err {
                KapalError::MissingDimensionValue { dimension, .. } => missing(dimension, row),
                KapalError::InvalidYear { year, .. } => KapalError::InvalidYear {
                    year,
                    row: Some(row),
                },
                other => other,
            })
        })
        .collect()
}

fn kpi_amounts(frame: &DataFrame, kpi: Kpi) -> Result<Vec<Decimal>> {
    if !frame.get_column_names().contains(&kpi.column()) {
        return Ok(vec![Decimal::ZERO; frame.height()]);
    }
    let column = frame.column(kpi.column())?;
    let invalid = |row: usize, value: String| KapalError::InvalidAmount {
        column: kpi.column().to_string(),
        row,
        value,
    };

    match column.dtype() {
        DataType::Null => Ok(vec![Decimal::ZERO; frame.height()]),
        // CSV inference falls back to text when any cell is not a number
        DataType::String => column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(Decimal::ZERO),
                Some(text) => text
                    .trim()
                    .parse::<Decimal>()
                    .map_err(|_| invalid(row, text.to_string())),
            })
            .collect(),
        dtype if dtype.is_numeric() => {
            let values = column.strict_cast(&DataType::Float64)?;
            values
                .f64()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| match value {
                    None => Ok(Decimal::ZERO),
                    Some(v) => Decimal::from_f64(v).ok_or_else(|| invalid(row, v.to_string())),
                })
                .collect()
        }
        other => Err(KapalError::ColumnType {
            column: kpi.column().to_string(),
            expected: "numeric",
            found: other.to_string(),
        }),
    }
}

/// Loads a cleaned snapshot from a `.csv` or `.parquet` file.
pub fn load_records(path: &Path, calendar: &PeriodCalendar) -> Result<Vec<Record>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let frame = match extension.as_deref() {
        Some("csv") => CsvReader::from_path(path)?.has_header(true).finish()?,
        Some("parquet") => {
            LazyFrame::scan_parquet(path, ScanArgsParquet::default())?.collect()?
        }
        _ => return Err(KapalError::UnsupportedFormat(path.display().to_string())),
    };
    let records = records_from_frame(&frame, calendar)?;
    tracing::info!(
        path = %path.display(),
        records = records.len(),
        "loaded record snapshot"
    );
    Ok(records)
}
