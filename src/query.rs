//! One pipeline for every analysis mode: group, filter, sort, then reshape
//! or summarise.

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::filter::{FilterCriteria, FilterScope, RangeFilter};
use crate::ledger::{buckets_from_frame, Bucket, BucketKey, Dimension, KpiLedger};
use crate::record::{Kpi, KpiValues};
use crate::reshape::{to_long, WideRow};
use crate::sign::Polarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
pub enum AnalysisMode {
    Yearly,
    Monthly,
    Quarterly,
    SectorWise,
    VesselWise,
}

/// Grouping, filtering and charting choices of one mode.
#[derive(Debug, Clone, Copy)]
struct ModeProfile {
    dimensions: &'static [Dimension],
    scope: FilterScope,
    facet: Option<Dimension>,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 5] = [
        AnalysisMode::Yearly,
        AnalysisMode::Monthly,
        AnalysisMode::Quarterly,
        AnalysisMode::SectorWise,
        AnalysisMode::VesselWise,
    ];

    fn profile(self) -> ModeProfile {
        use Dimension::*;
        match self {
            AnalysisMode::Yearly => ModeProfile {
                dimensions: &[Year, Sector, Vessel],
                scope: FilterScope {
                    years: true,
                    sectors: true,
                    vessels: true,
                    ..Default::default()
                },
                facet: None,
            },
            AnalysisMode::Monthly => ModeProfile {
                dimensions: &[Year, Month, Sector, Vessel],
                scope: FilterScope {
                    years: true,
                    periods: true,
                    sectors: true,
                    vessels: true,
                    ..Default::default()
                },
                facet: None,
            },
            AnalysisMode::Quarterly => ModeProfile {
                dimensions: &[Year, Quarter, Sector, Vessel],
                scope: FilterScope {
                    years: true,
                    quarters: true,
                    sectors: true,
                    vessels: true,
                    ..Default::default()
                },
                facet: None,
            },
            AnalysisMode::SectorWise => ModeProfile {
                dimensions: &[Year, Sector, Month],
                scope: FilterScope {
                    years: true,
                    periods: true,
                    sectors: true,
                    ..Default::default()
                },
                facet: Some(Sector),
            },
            AnalysisMode::VesselWise => ModeProfile {
                dimensions: &[Year, Vessel, Month],
                scope: FilterScope {
                    years: true,
                    periods: true,
                    vessels: true,
                    ..Default::default()
                },
                facet: Some(Vessel),
            },
        }
    }

    pub fn dimensions(self) -> &'static [Dimension] {
        self.profile().dimensions
    }

    pub fn scope(self) -> FilterScope {
        self.profile().scope
    }

    /// Dimension charts are split by, if any.
    pub fn facet(self) -> Option<Dimension> {
        self.profile().facet
    }

    /// Whether sector and vessel pickers allow several values.
    pub fn is_multi_select(self) -> bool {
        self.facet().is_some()
    }

    pub fn title(self) -> &'static str {
        match self {
            AnalysisMode::Yearly => "Yearly",
            AnalysisMode::Monthly => "Monthly",
            AnalysisMode::Quarterly => "Quarterly",
            AnalysisMode::SectorWise => "Sector-wise",
            AnalysisMode::VesselWise => "Vessel-wise",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A fully formed request: one mode, one set of criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub mode: AnalysisMode,
    pub criteria: FilterCriteria,
}

impl QueryRequest {
    pub fn new(mode: AnalysisMode, criteria: FilterCriteria) -> Self {
        Self { mode, criteria }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Data(QueryResult),
    /// The query was valid but nothing survived the filters.
    NoMatchingData,
}

impl QueryOutcome {
    pub fn data(&self) -> Option<&QueryResult> {
        match self {
            QueryOutcome::Data(result) => Some(result),
            QueryOutcome::NoMatchingData => None,
        }
    }
}

/// Filtered buckets in presentation order, plus their KPI summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub mode: AnalysisMode,
    pub rows: Vec<Bucket>,
    pub summary: Vec<SummaryCard>,
}

impl QueryResult {
    pub fn totals(&self) -> KpiValues {
        self.rows.iter().map(|bucket| bucket.totals).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryCard {
    pub kpi: Kpi,
    pub total: Decimal,
    pub magnitude: Decimal,
    pub polarity: Polarity,
    pub text: String,
}

/// Identifying columns of a table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowLabel {
    pub period: String,
    pub sector: Option<String>,
    pub vessel: Option<String>,
}

/// Long-form tuple handed to a chart renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub period_label: String,
    pub dimension_value: Option<String>,
    pub kpi: Kpi,
    pub value: Decimal,
    pub display_text: String,
    pub color: String,
}

pub struct QueryDispatcher<'a> {
    config: &'a EngineConfig,
}

impl<'a> QueryDispatcher<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, ledger: &KpiLedger, request: &QueryRequest) -> Result<QueryOutcome> {
        let mode = request.mode;
        let profile = mode.profile();
        let filter = RangeFilter::new(&ledger.columns);
        if let Err(err) = filter.validate(&request.criteria, profile.scope) {
            tracing::warn!(%mode, error = %err, "rejected query");
            return Err(err);
        }

        let grouped = ledger.group(profile.dimensions);
        let filtered = filter
            .apply(grouped, &request.criteria, profile.scope)?
            .collect()?;
        let mut rows = buckets_from_frame(&filtered, profile.dimensions, &ledger.columns)?;
        tracing::debug!(%mode, rows = rows.len(), "grouped and filtered");

        if rows.is_empty() {
            tracing::info!(%mode, "no data matches the filter criteria");
            return Ok(QueryOutcome::NoMatchingData);
        }
        rows.sort_by(|a, b| a.key.cmp(&b.key));

        let mut result = QueryResult {
            mode,
            rows,
            summary: Vec::new(),
        };
        result.summary = self.summarize(&result.totals());
        Ok(QueryOutcome::Data(result))
    }

    /// Summary cards for the configured KPIs.
    pub fn summarize(&self, totals: &KpiValues) -> Vec<SummaryCard> {
        let presenter = &self.config.presenter;
        self.config
            .kpis
            .iter()
            .map(|kpi| {
                let total = totals[*kpi];
                let presented = presenter.present(total);
                SummaryCard {
                    kpi: *kpi,
                    total,
                    magnitude: presented.magnitude,
                    polarity: presented.polarity,
                    text: presenter.card_text(total),
                }
            })
            .collect()
    }

    /// Wide form for tabular display.
    pub fn table(&self, result: &QueryResult) -> Vec<WideRow<RowLabel>> {
        result
            .rows
            .iter()
            .map(|bucket| WideRow {
                id: RowLabel {
                    period: bucket.key.period_label(),
                    sector: bucket.key.sector.clone(),
                    vessel: bucket.key.vessel.clone(),
                },
                values: bucket.totals,
            })
            .collect()
    }

    /// Long form for charting: one point per row and KPI.
    pub fn chart(&self, result: &QueryResult) -> Vec<ChartPoint> {
        let facet = result.mode.facet();
        let wide = result
            .rows
            .iter()
            .map(|bucket| WideRow {
                id: bucket.key.clone(),
                values: bucket.totals,
            })
            .collect::<Vec<_>>();
        to_long(&wide, &self.config.kpis)
            .into_iter()
            .map(|row| self.point(&row.id, facet, row.kpi, row.value))
            .collect()
    }

    /// One KPI summed per period (and facet value), in chronological order.
    pub fn kpi_series(&self, result: &QueryResult, kpi: Kpi) -> Vec<ChartPoint> {
        let facet = result.mode.facet();
        let mut series: BTreeMap<BucketKey, Decimal> = BTreeMap::new();
        for bucket in &result.rows {
            let mut key = bucket.key.clone();
            if facet != Some(Dimension::Sector) {
                key.sector = None;
            }
            if facet != Some(Dimension::Vessel) {
                key.vessel = None;
            }
            *series.entry(key).or_default() += bucket.totals[kpi];
        }
        series
            .iter()
            .map(|(key, value)| self.point(key, facet, kpi, *value))
            .collect()
    }

    fn point(&self, key: &BucketKey, facet: Option<Dimension>, kpi: Kpi, value: Decimal) -> ChartPoint {
        ChartPoint {
            period_label: key.period_label(),
            dimension_value: facet.and_then(|dimension| key.value_of(dimension)),
            kpi,
            value,
            display_text: self.config.presenter.display_text(value),
            color: self.config.color_of(kpi).to_string(),
        }
    }
}
