//! Wide/long reshaping of KPI rows.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::record::{Kpi, KpiValues};

/// Identifying columns plus one value per KPI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WideRow<I> {
    pub id: I,
    pub values: KpiValues,
}

/// Identifying columns, one KPI name and its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongRow<I> {
    pub id: I,
    pub kpi: Kpi,
    pub value: Decimal,
}

/// One long row per `(row, kpi)` pair, rows in input order and KPIs in the
/// order given.
pub fn to_long<I: Clone>(rows: &[WideRow<I>], kpis: &[Kpi]) -> Vec<LongRow<I>> {
    rows.iter()
        .flat_map(|row| {
            kpis.iter().map(move |kpi| LongRow {
                id: row.id.clone(),
                kpi: *kpi,
                value: row.values[*kpi],
            })
        })
        .collect()
}

/// Inverse of [`to_long`]. A wide row is closed when the id changes or a KPI
/// repeats, so adjacent rows sharing an id survive the round trip.
///
/// KPIs absent from the long form come back as zero, so
/// `to_wide(&to_long(rows, kpis)) == rows` only holds when `kpis` is the full
/// [`Kpi::ALL`] set or the omitted columns were already zero.
pub fn to_wide<I: Clone + PartialEq>(rows: &[LongRow<I>]) -> Vec<WideRow<I>> {
    let mut wide: Vec<WideRow<I>> = Vec::new();
    let mut seen = [false; Kpi::ALL.len()];

    for row in rows {
        let slot = Kpi::ALL
            .iter()
            .position(|kpi| *kpi == row.kpi)
            .unwrap_or_default();
        let continues = matches!(wide.last(), Some(last) if last.id == row.id && !seen[slot]);
        if !continues {
            wide.push(WideRow {
                id: row.id.clone(),
                values: KpiValues::default(),
            });
            seen = [false; Kpi::ALL.len()];
        }
        if let Some(current) = wide.last_mut() {
            current.values[row.kpi] = row.value;
        }
        seen[slot] = true;
    }
    wide
}
