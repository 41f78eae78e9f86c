use crate::engine::{Cell, PivotRow, PivotTable};
use crate::error::{ReportError, Result};
use crate::ingestion::TotalObservation;
use crate::utils::DateKey;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a dated row's total becomes when the authoritative series has no entry for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedTotal {
    /// Show `"-"`.
    #[default]
    Sentinel,
    /// Show the computed row sum.
    KeepComputed,
}

#[derive(Debug, Clone, Default)]
pub struct TotalsReconciler {
    unmatched: UnmatchedTotal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalDiscrepancy {
    pub date: DateKey,
    pub computed: f64,
    pub reported: f64,
    pub difference: f64,
}

impl TotalsReconciler {
    pub fn new(unmatched: UnmatchedTotal) -> Self {
        Self { unmatched }
    }

    /// Replaces the `total` of every dated row with the authoritative value
    /// for its date. Synthetic undated rows keep their own total.
    pub fn reconcile(&self, table: PivotTable, totals: &[TotalObservation]) -> PivotTable {
        let authoritative = authoritative_by_date(totals);
        let columns = table.columns().to_vec();

        let rows = table
            .into_rows()
            .into_iter()
            .map(|row| {
                let total = match row.date {
                    DateKey::Undated => row.total,
                    DateKey::Day(date) => match authoritative.get(&date) {
                        Some(cell) => *cell,
                        None => match self.unmatched {
                            UnmatchedTotal::Sentinel => Cell::Missing,
                            UnmatchedTotal::KeepComputed => row.computed_total,
                        },
                    },
                };
                PivotRow { total, ..row }
            })
            .collect();

        PivotTable::new(columns, rows)
    }
}

// Later entries for the same date replace earlier ones; undated entries never match.
fn authoritative_by_date(totals: &[TotalObservation]) -> HashMap<NaiveDate, Cell> {
    totals
        .iter()
        .filter_map(|t| t.date_key.day().map(|date| (date, Cell::from(t.value))))
        .collect()
}

/// Dated rows whose computed sum differs from the reported total by more than `tolerance`.
pub fn find_total_discrepancies(table: &PivotTable, tolerance: f64) -> Vec<TotalDiscrepancy> {
    table
        .rows()
        .iter()
        .filter(|row| row.date.is_dated())
        .filter_map(|row| {
            let computed = row.computed_total().value()?;
            let reported = row.total.value()?;
            let difference = reported - computed;
            (difference.abs() > tolerance).then_some(TotalDiscrepancy {
                date: row.date,
                computed,
                reported,
                difference,
            })
        })
        .collect()
}

pub fn verify_totals(table: &PivotTable, tolerance: f64) -> Result<()> {
    match find_total_discrepancies(table, tolerance).into_iter().next() {
        Some(d) => Err(ReportError::TotalsMismatch {
            date: d.date.to_string(),
            computed: d.computed,
            reported: d.reported,
        }),
        None => Ok(()),
    }
}
