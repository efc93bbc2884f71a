//! Inclusive range and set-membership filtering of aggregated buckets.
//!
//! Criteria are validated up front, then compiled into a polars predicate that
//! is applied to the grouped lazy frame. The predicate only references
//! columns the grouping actually produced, so the [`FilterScope`] of a query
//! has to agree with its grouping dimensions.

use std::collections::BTreeSet;

use chrono::Month;
use polars::prelude::*;

use crate::calendar::{PeriodKey, Quarter};
use crate::error::{KapalError, Result};
use crate::frame::Header;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
}

impl YearRange {
    pub fn new(from: i32, to: i32) -> Self {
        Self { from, to }
    }

    pub fn validate(&self) -> Result<()> {
        if self.from > self.to {
            return Err(KapalError::InvalidRange {
                from: self.from.to_string(),
                to: self.to.to_string(),
            });
        }
        Ok(())
    }

    /// January of `from` through December of `to`.
    pub fn as_periods(&self) -> PeriodRange {
        PeriodRange::new(
            PeriodKey::new(self.from, Month::January),
            PeriodKey::new(self.to, Month::December),
        )
    }
}

/// Inclusive range of months, compared through [`PeriodKey`] so it crosses
/// year boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub from: PeriodKey,
    pub to: PeriodKey,
}

impl PeriodRange {
    pub fn new(from: PeriodKey, to: PeriodKey) -> Self {
        Self { from, to }
    }

    pub fn validate(&self) -> Result<()> {
        if self.from > self.to {
            return Err(KapalError::InvalidRange {
                from: self.from.label(),
                to: self.to.label(),
            });
        }
        Ok(())
    }

    pub fn contains(&self, key: PeriodKey) -> bool {
        self.from <= key && key <= self.to
    }
}

/// Which sectors or vessels a query keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Only(values.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub years: YearRange,
    pub months: Option<PeriodRange>,
    pub quarters: BTreeSet<Quarter>,
    pub sectors: Selection,
    pub vessels: Selection,
}

impl FilterCriteria {
    /// All quarters, every sector and vessel.
    pub fn new(years: YearRange) -> Self {
        Self {
            years,
            months: None,
            quarters: Quarter::ALL.into_iter().collect(),
            sectors: Selection::All,
            vessels: Selection::All,
        }
    }

    pub fn with_months(mut self, months: PeriodRange) -> Self {
        self.months = Some(months);
        self
    }

    pub fn with_quarters<I: IntoIterator<Item = Quarter>>(mut self, quarters: I) -> Self {
        self.quarters = quarters.into_iter().collect();
        self
    }

    pub fn with_sectors(mut self, sectors: Selection) -> Self {
        self.sectors = sectors;
        self
    }

    pub fn with_vessels(mut self, vessels: Selection) -> Self {
        self.vessels = vessels;
        self
    }

    /// The month window used at month granularity: the explicit month range,
    /// else the whole of the year range.
    pub fn period_range(&self) -> PeriodRange {
        self.months.unwrap_or_else(|| self.years.as_periods())
    }
}

/// The parts of [`FilterCriteria`] a query applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterScope {
    pub years: bool,
    pub periods: bool,
    pub quarters: bool,
    pub sectors: bool,
    pub vessels: bool,
}

pub struct RangeFilter<'a> {
    header: &'a Header,
}

impl<'a> RangeFilter<'a> {
    pub fn new(header: &'a Header) -> Self {
        Self { header }
    }

    /// Rejects a reversed year range, and any other applicable bound whose
    /// `from` is after its `to`.
    pub fn validate(&self, criteria: &FilterCriteria, scope: FilterScope) -> Result<()> {
        criteria.years.validate()?;
        if scope.periods {
            criteria.period_range().validate()?;
        }
        Ok(())
    }

    /// AND of every active filter in `scope`.
    pub fn predicate(&self, criteria: &FilterCriteria, scope: FilterScope) -> Result<Expr> {
        self.validate(criteria, scope)?;
        let header = self.header;
        let mut predicate = lit(true);

        if scope.years {
            let year = col(header.year);
            predicate = predicate.and(
                year.clone()
                    .gt_eq(lit(criteria.years.from))
                    .and(year.lt_eq(lit(criteria.years.to))),
            );
        }
        if scope.periods {
            let range = criteria.period_range();
            let ordinal = col(header.year).cast(DataType::Int64) * lit(12i64)
                + col(header.month_index).cast(DataType::Int64)
                - lit(1i64);
            predicate = predicate.and(
                ordinal
                    .clone()
                    .gt_eq(lit(range.from.ordinal()))
                    .and(ordinal.lt_eq(lit(range.to.ordinal()))),
            );
        }
        if scope.quarters {
            predicate = predicate.and(any_of(
                header.quarter,
                criteria.quarters.iter().map(|quarter| lit(quarter.number())),
            ));
        }
        if scope.sectors {
            if let Selection::Only(sectors) = &criteria.sectors {
                predicate = predicate.and(any_of(
                    header.sector,
                    sectors.iter().map(|sector| lit(sector.as_str())),
                ));
            }
        }
        if scope.vessels {
            if let Selection::Only(vessels) = &criteria.vessels {
                predicate = predicate.and(any_of(
                    header.vessel,
                    vessels.iter().map(|vessel| lit(vessel.as_str())),
                ));
            }
        }
        Ok(predicate)
    }

    /// Applies the predicate to a grouped plan.
    pub fn apply(
        &self,
        grouped: LazyFrame,
        criteria: &FilterCriteria,
        scope: FilterScope,
    ) -> Result<LazyFrame> {
        Ok(grouped.filter(self.predicate(criteria, scope)?))
    }
}

/// `column == v1 OR column == v2 ...`; false for an empty set.
fn any_of(column: &str, values: impl Iterator<Item = Expr>) -> Expr {
    values.fold(lit(false), |acc, value| acc.or(col(column).eq(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Dimension, KpiLedger};
    use crate::record::{KpiValues, Record};
    use itertools::Itertools;

    fn ledger() -> KpiLedger {
        let months = [
            (2022, Month::October),
            (2022, Month::November),
            (2022, Month::December),
            (2023, Month::January),
            (2023, Month::February),
            (2023, Month::March),
        ];
        let records = months
            .iter()
            .flat_map(|(year, month)| {
                ["Tanker", "Bulk"].into_iter().map(move |sector| {
                    Record::new(*year, *month, sector, "Jag Rani", KpiValues::default()).unwrap()
                })
            })
            .collect_vec();
        KpiLedger::from_records(&records).unwrap()
    }

    fn labels(ledger: &KpiLedger, criteria: &FilterCriteria, scope: FilterScope) -> Vec<String> {
        let dims = [Dimension::Year, Dimension::Month, Dimension::Sector];
        let filter = RangeFilter::new(&ledger.columns);
        let frame = filter
            .apply(ledger.group(&dims), criteria, scope)
            .unwrap()
            .collect()
            .unwrap();
        crate::ledger::buckets_from_frame(&frame, &dims, &ledger.columns)
            .unwrap()
            .into_iter()
            .map(|bucket| bucket.key)
            .sorted()
            .map(|key| format!("{} {}", key.period_label(), key.sector.unwrap_or_default()))
            .collect()
    }

    fn periods() -> FilterScope {
        FilterScope {
            periods: true,
            sectors: true,
            ..Default::default()
        }
    }

    #[test]
    fn month_window_crosses_the_year_boundary() {
        let criteria = FilterCriteria::new(YearRange::new(2022, 2023))
            .with_months(PeriodRange::new(
                PeriodKey::new(2022, Month::November),
                PeriodKey::new(2023, Month::February),
            ))
            .with_sectors(Selection::only(["Tanker"]));
        assert_eq!(
            labels(&ledger(), &criteria, periods()),
            [
                "Nov 2022 Tanker",
                "Dec 2022 Tanker",
                "Jan 2023 Tanker",
                "Feb 2023 Tanker"
            ]
        );
    }

    #[test]
    fn year_range_without_months_spans_whole_years() {
        let criteria = FilterCriteria::new(YearRange::new(2023, 2023))
            .with_sectors(Selection::only(["Bulk"]));
        assert_eq!(
            labels(&ledger(), &criteria, periods()),
            ["Jan 2023 Bulk", "Feb 2023 Bulk", "Mar 2023 Bulk"]
        );
    }

    #[test]
    fn empty_selection_matches_nothing() {
        let criteria = FilterCriteria::new(YearRange::new(2022, 2023))
            .with_sectors(Selection::Only(BTreeSet::new()));
        assert!(labels(&ledger(), &criteria, periods()).is_empty());
    }

    #[test]
    fn reversed_year_range_is_invalid_not_empty() {
        let ledger = ledger();
        let filter = RangeFilter::new(&ledger.columns);
        let criteria = FilterCriteria::new(YearRange::new(2024, 2023));
        let scope = FilterScope {
            years: true,
            ..Default::default()
        };
        let err = filter.predicate(&criteria, scope).unwrap_err();
        assert!(matches!(err, KapalError::InvalidRange { ref from, ref to } if from == "2024" && to == "2023"));
    }

    #[test]
    fn reversed_month_window_is_invalid() {
        let criteria = FilterCriteria::new(YearRange::new(2022, 2023)).with_months(PeriodRange::new(
            PeriodKey::new(2023, Month::February),
            PeriodKey::new(2022, Month::November),
        ));
        let header = Header::new();
        let err = RangeFilter::new(&header)
            .validate(&criteria, periods())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid range: Feb 2023 is after Nov 2022");
    }

    #[test]
    fn month_window_is_ignored_when_out_of_scope() {
        let criteria = FilterCriteria::new(YearRange::new(2022, 2023)).with_months(PeriodRange::new(
            PeriodKey::new(2023, Month::February),
            PeriodKey::new(2022, Month::November),
        ));
        let header = Header::new();
        let scope = FilterScope {
            years: true,
            ..Default::default()
        };
        assert!(RangeFilter::new(&header).validate(&criteria, scope).is_ok());
    }

    #[test]
    fn reversed_year_range_is_invalid_in_every_scope() {
        let criteria = FilterCriteria::new(YearRange::new(2024, 2023)).with_months(PeriodRange::new(
            PeriodKey::new(2022, Month::November),
            PeriodKey::new(2023, Month::February),
        ));
        let header = Header::new();
        let err = RangeFilter::new(&header)
            .validate(&criteria, periods())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid range: 2024 is after 2023");
    }

    #[test]
    fn period_range_bounds_are_inclusive() {
        let range = PeriodRange::new(
            PeriodKey::new(2022, Month::November),
            PeriodKey::new(2023, Month::February),
        );
        assert!(range.contains(PeriodKey::new(2022, Month::November)));
        assert!(range.contains(PeriodKey::new(2023, Month::February)));
        assert!(!range.contains(PeriodKey::new(2023, Month::March)));
        assert!(!range.contains(PeriodKey::new(2022, Month::October)));
    }
}
