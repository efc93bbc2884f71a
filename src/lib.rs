//! Fleet KPI aggregation: group monthly vessel records by period, sector and
//! vessel, filter the buckets and present signed totals as Debit or Credit.

pub mod calendar;
pub mod config;
pub mod error;
pub mod filter;
pub mod frame;
pub mod ledger;
pub mod query;
pub mod record;
pub mod reshape;
pub mod sign;

pub use config::{EngineConfig, Settings};
pub use error::{KapalError, Result};
pub use ledger::KpiLedger;
pub use query::{AnalysisMode, QueryDispatcher, QueryOutcome, QueryRequest};
