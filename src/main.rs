//! Fleet KPI reports from a cleaned record snapshot.

use std::{error::Error, fs::File, io, path::PathBuf};

use chrono::Month;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use kapal::calendar::{PeriodKey, Quarter};
use kapal::filter::{FilterCriteria, PeriodRange, Selection, YearRange};
use kapal::frame::load_records;
use kapal::ledger::DatasetOverview;
use kapal::record::Kpi;
use kapal::{
    AnalysisMode, EngineConfig, KpiLedger, QueryDispatcher, QueryOutcome, QueryRequest, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "kapal", version, about)]
struct Cli {
    /// Record snapshot (.csv or .parquet). Falls back to KAPAL_RECORDS.
    #[arg(long, global = true)]
    records: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record count, distinct sectors and vessels, year coverage.
    Overview,
    /// Run one analysis mode and write the result as CSV.
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(value_enum)]
    mode: AnalysisMode,
    #[arg(long)]
    from_year: Option<i32>,
    #[arg(long)]
    to_year: Option<i32>,
    /// Full month name, e.g. November.
    #[arg(long)]
    from_month: Option<String>,
    #[arg(long)]
    to_month: Option<String>,
    #[arg(long = "quarter")]
    quarters: Vec<Quarter>,
    #[arg(long = "sector")]
    sectors: Vec<String>,
    #[arg(long = "vessel")]
    vessels: Vec<String>,
    #[arg(long, value_enum, default_value_t = View::Table)]
    view: View,
    /// KPI plotted by the `kpi` view.
    #[arg(long, default_value_t = Kpi::TotalIncome)]
    kpi: Kpi,
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum View {
    Table,
    Chart,
    Summary,
    Kpi,
}

fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::from_env();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&settings.log_filter))
                .unwrap_or_else(|_| "kapal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = settings.engine_config();
    let path = cli
        .records
        .or_else(|| settings.records_path.clone())
        .ok_or("no record snapshot given, pass --records or set KAPAL_RECORDS")?;
    let records = load_records(&path, &config.calendar)?;
    let ledger = KpiLedger::from_records(&records)?;
    let overview = ledger.overview()?;

    match cli.command {
        Command::Overview => print_overview(&overview),
        Command::Query(args) => {
            let request = build_request(&args, &overview, &config, settings.default_selection)?;
            let dispatcher = QueryDispatcher::new(&config);
            match dispatcher.run(&ledger, &request)? {
                QueryOutcome::NoMatchingData => println!("No data matches your filter criteria."),
                QueryOutcome::Data(result) => {
                    let sink: Box<dyn io::Write> = match &args.output {
                        Some(path) => Box::new(File::create(path)?),
                        None => Box::new(io::stdout()),
                    };
                    let mut writer = csv::Writer::from_writer(sink);
                    match args.view {
                        View::Table => {
                            let mut header = vec!["Period", "Sector", "Vessel"];
                            header.extend(config.kpis.iter().map(|kpi| kpi.column()));
                            writer.write_record(&header)?;
                            for row in dispatcher.table(&result) {
                                let mut cells = vec![
                                    row.id.period,
                                    row.id.sector.unwrap_or_default(),
                                    row.id.vessel.unwrap_or_default(),
                                ];
                                cells.extend(
                                    config
                                        .kpis
                                        .iter()
                                        .map(|kpi| config.presenter.display_text(row.values[*kpi])),
                                );
                                writer.write_record(&cells)?;
                            }
                        }
                        View::Chart => {
                            for point in dispatcher.chart(&result) {
                                writer.serialize(point)?;
                            }
                        }
                        View::Summary => {
                            for card in &result.summary {
                                writer.serialize(card)?;
                            }
                        }
                        View::Kpi => {
                            for point in dispatcher.kpi_series(&result, args.kpi) {
                                writer.serialize(point)?;
                            }
                        }
                    }
                    writer.flush()?;
                }
            }
        }
    }
    Ok(())
}

fn print_overview(overview: &DatasetOverview) {
    println!("Total records: {}", overview.records);
    println!("Unique sectors: {}", overview.sectors.len());
    println!("Unique vessels: {}", overview.vessels.len());
    match overview.coverage() {
        Some((first, last)) => println!("Year coverage: {first} - {last}"),
        None => println!("Year coverage: none"),
    }
}

/// Fills every absent flag from what the snapshot contains.
fn build_request(
    args: &QueryArgs,
    overview: &DatasetOverview,
    config: &EngineConfig,
    default_selection: usize,
) -> Result<QueryRequest, Box<dyn Error>> {
    let (first_year, last_year) = overview.coverage().unwrap_or_default();
    let years = YearRange::new(
        args.from_year.unwrap_or(first_year),
        args.to_year.unwrap_or(last_year),
    );
    let month = |name: &Option<String>, fallback: Month| match name {
        Some(name) => config.calendar.parse_month(name),
        None => Ok(fallback),
    };
    let months = PeriodRange::new(
        PeriodKey::new(years.from, month(&args.from_month, Month::January)?),
        PeriodKey::new(years.to, month(&args.to_month, Month::December)?),
    );

    let take = if args.mode.is_multi_select() {
        default_selection
    } else {
        1
    };
    let pick = |given: &[String], observed: &[String]| {
        if given.is_empty() {
            Selection::only(observed.iter().take(take).cloned())
        } else {
            Selection::only(given.iter().cloned())
        }
    };

    let mut criteria = FilterCriteria::new(years)
        .with_months(months)
        .with_sectors(pick(&args.sectors, &overview.sectors))
        .with_vessels(pick(&args.vessels, &overview.vessels));
    if !args.quarters.is_empty() {
        criteria = criteria.with_quarters(args.quarters.iter().copied());
    }
    tracing::debug!(mode = %args.mode, ?criteria, "built query");
    Ok(QueryRequest::new(args.mode, criteria))
}
