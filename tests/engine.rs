use std::thread;

use chrono::Month;
use rust_decimal_macros::dec;

use kapal::filter::{FilterCriteria, Selection, YearRange};
use kapal::record::{Kpi, KpiValues, Record};
use kapal::sign::Polarity;
use kapal::{AnalysisMode, EngineConfig, KpiLedger, QueryDispatcher, QueryOutcome, QueryRequest};

fn fleet() -> KpiLedger {
    let mut records = Vec::new();
    for (index, month) in [Month::January, Month::February, Month::March, Month::April]
        .into_iter()
        .enumerate()
    {
        for (sector, vessel) in [("Tanker", "Jag Rani"), ("Bulk", "Desh Ujaala"), ("Bulk", "Jag Rani")] {
            let income = dec!(25) * rust_decimal::Decimal::from(index as i64) - dec!(30);
            let kpis = KpiValues::from_pairs([(Kpi::TotalIncome, income), (Kpi::Gop, dec!(1.5))]);
            records.push(Record::new(2023, month, sector, vessel, kpis).unwrap());
        }
    }
    KpiLedger::from_records(&records).unwrap()
}

#[test]
fn january_and_february_net_to_a_credit() {
    let ledger = KpiLedger::from_records(&[
        Record::new(
            2023,
            Month::January,
            "Tanker",
            "Jag Rani",
            KpiValues::from_pairs([(Kpi::TotalIncome, dec!(100))]),
        )
        .unwrap(),
        Record::new(
            2023,
            Month::February,
            "Tanker",
            "Jag Rani",
            KpiValues::from_pairs([(Kpi::TotalIncome, dec!(-150))]),
        )
        .unwrap(),
    ])
    .unwrap();
    let config = EngineConfig::default();
    let criteria = FilterCriteria::new(YearRange::new(2023, 2023))
        .with_sectors(Selection::only(["Tanker"]))
        .with_vessels(Selection::only(["Jag Rani"]));
    let outcome = QueryDispatcher::new(&config)
        .run(&ledger, &QueryRequest::new(AnalysisMode::Yearly, criteria))
        .unwrap();

    let result = outcome.data().unwrap();
    assert_eq!(result.rows.len(), 1);
    let income = &result.summary[0];
    assert_eq!(income.total, dec!(-50));
    assert_eq!(income.magnitude, dec!(50));
    assert_eq!(income.polarity, Polarity::Credit);
}

#[test]
fn concurrent_queries_match_sequential_ones() {
    let ledger = fleet();
    let config = EngineConfig::default();
    let requests = AnalysisMode::ALL
        .into_iter()
        .map(|mode| QueryRequest::new(mode, FilterCriteria::new(YearRange::new(2023, 2023))))
        .collect::<Vec<_>>();

    let dispatcher = QueryDispatcher::new(&config);
    let sequential = requests
        .iter()
        .map(|request| dispatcher.run(&ledger, request).unwrap())
        .collect::<Vec<_>>();

    let concurrent = thread::scope(|scope| {
        let handles = requests
            .iter()
            .map(|request| {
                let (ledger, config) = (&ledger, &config);
                scope.spawn(move || QueryDispatcher::new(config).run(ledger, request).unwrap())
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(concurrent, sequential);
    for outcome in &concurrent {
        let result = outcome.data().unwrap();
        assert_eq!(result.totals()[Kpi::Gop], dec!(18));
    }
}

#[test]
fn no_matching_data_is_distinct_from_errors() {
    let ledger = fleet();
    let config = EngineConfig::default();
    let criteria = FilterCriteria::new(YearRange::new(2023, 2023))
        .with_vessels(Selection::only(["Sagar Ratna"]));
    let outcome = QueryDispatcher::new(&config)
        .run(&ledger, &QueryRequest::new(AnalysisMode::VesselWise, criteria))
        .unwrap();
    assert_eq!(outcome, QueryOutcome::NoMatchingData);
}
