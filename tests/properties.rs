//! Property tests for aggregation, filtering and reshaping.

use chrono::Month;
use proptest::prelude::*;
use rust_decimal::Decimal;

use kapal::calendar::PeriodKey;
use kapal::filter::{FilterCriteria, PeriodRange, YearRange};
use kapal::ledger::Dimension;
use kapal::record::{Kpi, KpiValues, Record};
use kapal::reshape::{to_long, to_wide, WideRow};
use kapal::sign::{Polarity, SignPresenter};
use kapal::{AnalysisMode, EngineConfig, KpiLedger, QueryDispatcher, QueryOutcome, QueryRequest};

// =============================================================================
// Generators
// =============================================================================

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_kpis() -> impl Strategy<Value = KpiValues> {
    proptest::array::uniform5(arb_amount()).prop_map(KpiValues::new)
}

fn arb_record() -> impl Strategy<Value = Record> {
    (
        2020i32..2025,
        1u8..=12,
        prop::sample::select(vec!["Tanker", "Bulk", "Offshore"]),
        prop::sample::select(vec!["Jag Rani", "Desh Ujaala", "Sagar Ratna"]),
        arb_kpis(),
    )
        .prop_map(|(year, month, sector, vessel, kpis)| {
            let month = Month::try_from(month).unwrap();
            Record::new(year, month, sector, vessel, kpis).unwrap()
        })
}

fn arb_records() -> impl Strategy<Value = Vec<Record>> {
    proptest::collection::vec(arb_record(), 1..40)
}

fn arb_period() -> impl Strategy<Value = PeriodKey> {
    (2020i32..2025, 1u8..=12)
        .prop_map(|(year, month)| PeriodKey::new(year, Month::try_from(month).unwrap()))
}

const YEAR_ONLY: &[Dimension] = &[Dimension::Year];
const UNGROUPED: &[Dimension] = &[];

fn record_total(records: &[Record]) -> KpiValues {
    records.iter().map(|record| *record.kpis()).sum()
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Grouping partitions the records: bucket totals add up to the grand
    /// total for every mode grouping, the bare year grouping and no grouping.
    #[test]
    fn prop_buckets_partition_the_ledger(records in arb_records()) {
        let ledger = KpiLedger::from_records(&records).unwrap();
        let expected = record_total(&records);
        prop_assert_eq!(ledger.grand_total().unwrap(), expected);
        let groupings = AnalysisMode::ALL
            .iter()
            .map(|mode| mode.dimensions())
            .chain([YEAR_ONLY, UNGROUPED]);
        for dimensions in groupings {
            let buckets = ledger.aggregate(dimensions).unwrap();
            let total: KpiValues = buckets.iter().map(|bucket| bucket.totals).sum();
            prop_assert_eq!(total, expected);
        }
    }

    /// A monthly query keeps exactly the records inside the month window.
    #[test]
    fn prop_month_window_keeps_matching_records(
        records in arb_records(),
        a in arb_period(),
        b in arb_period(),
    ) {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        let range = PeriodRange::new(from, to);
        let criteria = FilterCriteria::new(YearRange::new(from.year(), to.year())).with_months(range);
        let ledger = KpiLedger::from_records(&records).unwrap();
        let config = EngineConfig::default();
        let outcome = QueryDispatcher::new(&config)
            .run(&ledger, &QueryRequest::new(AnalysisMode::Monthly, criteria))
            .unwrap();

        let inside = records
            .iter()
            .filter(|record| range.contains(record.period_key()))
            .cloned()
            .collect::<Vec<_>>();
        match outcome {
            QueryOutcome::NoMatchingData => prop_assert!(inside.is_empty()),
            QueryOutcome::Data(result) => {
                prop_assert_eq!(result.totals(), record_total(&inside));
                let keys = result.rows.iter().map(|row| row.key.clone()).collect::<Vec<_>>();
                prop_assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
                prop_assert!(result
                    .rows
                    .iter()
                    .all(|row| row.key.period_key().is_some_and(|key| range.contains(key))));
            }
        }
    }

    /// Long form followed by wide form gives back the input rows.
    #[test]
    fn prop_reshape_round_trips(
        rows in proptest::collection::vec(("[a-c]{1,2}", arb_kpis()), 0..20)
    ) {
        let rows = rows
            .into_iter()
            .map(|(id, values)| WideRow { id, values })
            .collect::<Vec<_>>();
        prop_assert_eq!(to_wide(&to_long(&rows, &Kpi::ALL)), rows);
    }

    /// Magnitude and polarity together recover the signed amount.
    #[test]
    fn prop_presentation_keeps_the_sign(value in arb_amount()) {
        let presented = SignPresenter::default().present(value);
        prop_assert!(presented.magnitude >= Decimal::ZERO);
        let signed = match presented.polarity {
            Polarity::Debit => presented.magnitude,
            Polarity::Credit => -presented.magnitude,
        };
        prop_assert_eq!(signed, value);
    }
}

#[test]
fn month_dimension_is_never_summed_across_years() {
    let kpis = KpiValues::from_pairs([(Kpi::Gop, Decimal::ONE)]);
    let records = [
        Record::new(2022, Month::March, "Tanker", "Jag Rani", kpis).unwrap(),
        Record::new(2023, Month::March, "Tanker", "Jag Rani", kpis).unwrap(),
    ];
    let ledger = KpiLedger::from_records(&records).unwrap();
    let buckets = ledger
        .aggregate(&[Dimension::Year, Dimension::Month])
        .unwrap();
    assert_eq!(buckets.len(), 2);
}
