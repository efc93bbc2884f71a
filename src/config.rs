use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use crate::calendar::PeriodCalendar;
use crate::record::Kpi;
use crate::sign::SignPresenter;

/// Lookup tables shared by every component. Built once at start-up and
/// handed to the dispatcher by reference.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub calendar: PeriodCalendar,
    pub kpis: Vec<Kpi>,
    pub kpi_colors: BTreeMap<Kpi, String>,
    pub presenter: SignPresenter,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_currency("₹")
    }
}

impl EngineConfig {
    pub fn with_currency(symbol: &str) -> Self {
        let kpi_colors = [
            (Kpi::TotalIncome, "#1f77b4"),
            (Kpi::Doe, "#ff7f0e"),
            (Kpi::Ioe, "#2ca02c"),
            (Kpi::Pbt, "#d62728"),
            (Kpi::Gop, "#9467bd"),
        ]
        .into_iter()
        .map(|(kpi, color)| (kpi, color.to_string()))
        .collect();

        Self {
            calendar: PeriodCalendar::new(),
            kpis: Kpi::ALL.to_vec(),
            kpi_colors,
            presenter: SignPresenter::new(symbol, "Lacs"),
        }
    }

    pub fn color_of(&self, kpi: Kpi) -> &str {
        self.kpi_colors.get(&kpi).map(String::as_str).unwrap_or("#7f7f7f")
    }
}

/// Process settings, read from the environment after loading `.env`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub records_path: Option<PathBuf>,
    pub log_filter: String,
    pub default_selection: usize,
    pub currency_symbol: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            records_path: None,
            log_filter: "kapal=info".into(),
            default_selection: 3,
            currency_symbol: "₹".into(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            records_path: env::var("KAPAL_RECORDS").ok().map(PathBuf::from),
            log_filter: env::var("KAPAL_LOG").unwrap_or(defaults.log_filter),
            default_selection: env::var("KAPAL_DEFAULT_SELECTION")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.default_selection),
            currency_symbol: env::var("KAPAL_CURRENCY").unwrap_or(defaults.currency_symbol),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::with_currency(&self.currency_symbol)
    }
}
