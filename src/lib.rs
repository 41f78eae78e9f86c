//! # Holdings Report Builder
//!
//! Turns the sparse, per-instrument records of a portfolio report into the
//! dense, date-indexed tables shown on a report screen.
//!
//! ## Core Concepts
//!
//! - **Pivot table**: one row per date, one column per instrument (or category),
//!   a trailing `total` column. Absent cells hold the `"-"` sentinel.
//! - **Undated records**: instruments that never carry a dated value are shown
//!   in a single synthetic `"-"` row instead of getting a column.
//! - **Authoritative totals**: when the report ships its own totals by date,
//!   they replace the computed row sums.
//! - **Derived series**: row-over-row deltas, weekly percentage change and the
//!   chained cumulative change of the holdings total, each next to the
//!   inflation and FX reference values for the date.
//!
//! ## Example
//!
//! ```rust,ignore
//! use holdings_report_builder::*;
//!
//! let payload = ReportPayload::from_json_str(&std::fs::read_to_string("report.json")?)?;
//! let tables = process_report(&payload, &ReportConfig::default())?;
//!
//! for row in &tables.cumulative {
//!     println!("{} {:.2}%", row.date, row.change * 100.0);
//! }
//! println!("{}", table_to_csv(&tables.holdings)?);
//! ```

#[cfg(feature = "http")]
pub mod client;
pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod percentage;
pub mod reconciler;
pub mod references;
pub mod returns;
pub mod rollup;
pub mod schema;
pub mod session;
pub mod utils;

#[cfg(feature = "http")]
pub use client::ReportClient;
pub use config::{ReportConfig, UnavailableMessages};
pub use delta::{delta, DeltaTable};
pub use engine::{
    build_holdings_table, Cell, Observation, PivotBuilder, PivotPolicy, PivotRow, PivotTable,
    ReportTable, Unavailable,
};
pub use error::{ReportError, Result};
pub use export::{
    references_to_csv, rows_to_csv, table_to_csv, ExportFormat, ExportRequest, ExportedFile,
    ReportPeriod, ReportQuery, ReportRequest,
};
pub use ingestion::*;
pub use percentage::{CumulativePercentRow, PercentageSeriesEngine, WeeklyPercentRow};
pub use reconciler::{
    find_total_discrepancies, verify_totals, TotalDiscrepancy, TotalsReconciler, UnmatchedTotal,
};
pub use references::{
    lookup, lookup_with, ReferenceAligner, ReferenceRow, ReferenceSeries, ReferenceTable,
    ValuationMatch,
};
pub use returns::ReturnSeriesEngine;
pub use rollup::CategoryRollupEngine;
pub use schema::*;
pub use session::{LogNotifier, Notifier, ReportExporter, ReportFetcher, ReportSession};
pub use utils::*;

use log::{debug, info, warn};
use serde::Serialize;

/// Every table of one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTables {
    pub holdings: ReportTable,
    pub returns: ReportTable,
    pub category_holdings: ReportTable,
    pub category_returns: ReportTable,
    pub references: ReferenceTable,
    /// Row-over-row differences of `holdings`; empty when holdings are unavailable.
    pub deltas: DeltaTable,
    pub weekly: Vec<WeeklyPercentRow>,
    pub cumulative: Vec<CumulativePercentRow>,
}

pub struct ReportProcessor;

impl ReportProcessor {
    pub fn process(payload: &ReportPayload, config: &ReportConfig) -> Result<ReportTables> {
        config.validate()?;

        info!(
            "Building report tables for {} asset categories",
            payload.assets_by_category().len()
        );
        debug!(
            "Payload contains {} category aggregates and {} reference series",
            payload.category_holdings().len(),
            payload.reference_variables.len()
        );

        let holdings = build_holdings_table(payload, config)?;
        let returns = ReturnSeriesEngine::from_config(config).build(payload, config)?;

        let rollup = CategoryRollupEngine::from_config(config);
        let category_holdings = rollup.holdings(payload, config)?;
        let category_returns = rollup.returns(payload, config)?;

        let references = ReferenceAligner::from_report(payload, config);

        for (name, table) in [("holdings", &holdings), ("category holdings", &category_holdings)] {
            if let Some(pivot) = table.as_pivot() {
                for d in find_total_discrepancies(pivot, config.totals_tolerance) {
                    warn!(
                        "Reported {} total on {} is {} but the rows sum to {} (difference {})",
                        name, d.date, d.reported, d.computed, d.difference
                    );
                }
            }
        }

        let (deltas, weekly, cumulative) = match holdings.as_pivot() {
            Some(table) => {
                let deltas = delta(table);
                let engine =
                    PercentageSeriesEngine::new(ReferenceSeries::from_report(payload, config));
                let weekly = engine.weekly(table, &deltas)?;
                let cumulative = engine.cumulative(&weekly);
                (deltas, weekly, cumulative)
            }
            None => (DeltaTable::default(), Vec::new(), Vec::new()),
        };

        debug!(
            "Built {} holdings rows, {} return rows and {} percentage rows",
            holdings.as_pivot().map_or(0, PivotTable::len),
            returns.as_pivot().map_or(0, PivotTable::len),
            weekly.len()
        );

        Ok(ReportTables {
            holdings,
            returns,
            category_holdings,
            category_returns,
            references,
            deltas,
            weekly,
            cumulative,
        })
    }

    /// Like [`ReportProcessor::process`], but fails when a reported holdings
    /// total differs from its row sum by more than `config.totals_tolerance`.
    pub fn process_with_verification(
        payload: &ReportPayload,
        config: &ReportConfig,
    ) -> Result<ReportTables> {
        let tables = Self::process(payload, config)?;

        for table in [&tables.holdings, &tables.category_holdings] {
            if let Some(pivot) = table.as_pivot() {
                verify_totals(pivot, config.totals_tolerance)?;
            }
        }

        Ok(tables)
    }
}

pub fn process_report(payload: &ReportPayload, config: &ReportConfig) -> Result<ReportTables> {
    ReportProcessor::process(payload, config)
}

pub fn process_with_verification(
    payload: &ReportPayload,
    config: &ReportConfig,
) -> Result<ReportTables> {
    ReportProcessor::process_with_verification(payload, config)
}
