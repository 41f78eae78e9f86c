//! Period-over-period and chained cumulative percentage change of the
//! holdings total, enriched with the reference indices for each date.
//!
//! These rows feed arithmetic directly, so missing data falls back to `0`
//! rather than the `"-"` sentinel used by the pivot tables. The one exception
//! is the weekly `ARS` value, which is the delta table's total as-is.

use crate::delta::DeltaTable;
use crate::engine::{Cell, PivotTable};
use crate::error::{ReportError, Result};
use crate::references::ReferenceSeries;
use crate::utils::DateKey;
use serde::Serialize;

pub const PERCENTAGE_COLUMNS: [&str; 5] = ["date", "porcentual", "ARS", "A3500", "inflacion"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPercentRow {
    pub date: DateKey,
    #[serde(rename = "porcentual")]
    pub change: f64,
    #[serde(rename = "ARS")]
    pub delta_total: Cell,
    #[serde(rename = "A3500")]
    pub fx_rate: Option<f64>,
    #[serde(rename = "inflacion")]
    pub inflation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePercentRow {
    pub date: DateKey,
    #[serde(rename = "porcentual")]
    pub change: f64,
    #[serde(rename = "ARS")]
    pub delta_total: f64,
    #[serde(rename = "A3500")]
    pub fx_rate: Option<f64>,
    #[serde(rename = "inflacion")]
    pub inflation: Option<f64>,
}

pub struct PercentageSeriesEngine<'a> {
    references: ReferenceSeries<'a>,
}

impl<'a> PercentageSeriesEngine<'a> {
    pub fn new(references: ReferenceSeries<'a>) -> Self {
        Self { references }
    }

    /// `total[i] / total[i-1] - 1` per row, with the matching delta total.
    ///
    /// Every row after the first must have a delta row for its date.
    pub fn weekly(&self, table: &PivotTable, deltas: &DeltaTable) -> Result<Vec<WeeklyPercentRow>> {
        let rows = table.rows();
        let mut out = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            if i == 0 {
                out.push(WeeklyPercentRow {
                    date: row.date,
                    change: 0.0,
                    delta_total: Cell::Value(0.0),
                    fx_rate: Some(0.0),
                    inflation: Some(0.0),
                });
                continue;
            }

            let change = match (row.total, rows[i - 1].total) {
                (Cell::Value(current), Cell::Value(previous)) => {
                    let ratio = current / previous - 1.0;
                    if ratio.is_finite() {
                        ratio
                    } else {
                        0.0
                    }
                }
                _ => 0.0,
            };

            let delta_row = deltas
                .row(&row.date)
                .ok_or_else(|| ReportError::MissingBaseline {
                    series: "delta".to_string(),
                    date: row.date.to_string(),
                })?;

            out.push(WeeklyPercentRow {
                date: row.date,
                change,
                delta_total: delta_row.total,
                fx_rate: self.references.fx_at(&row.date),
                inflation: self.references.inflation_at(&row.date),
            });
        }

        Ok(out)
    }

    /// Chains the weekly changes: `1 + cum[i] = (1 + cum[i-1]) * (1 + weekly[i])`.
    /// `ARS` is a running sum of the weekly delta totals that restarts at `0`
    /// whenever a weekly delta is missing.
    pub fn cumulative(&self, weekly: &[WeeklyPercentRow]) -> Vec<CumulativePercentRow> {
        let mut out: Vec<CumulativePercentRow> = Vec::with_capacity(weekly.len());

        for row in weekly {
            let next = match out.last() {
                None => CumulativePercentRow {
                    date: row.date,
                    change: 0.0,
                    delta_total: 0.0,
                    fx_rate: Some(0.0),
                    inflation: Some(0.0),
                },
                Some(prev) => CumulativePercentRow {
                    date: row.date,
                    change: (1.0 + prev.change) * (1.0 + row.change) - 1.0,
                    delta_total: match row.delta_total {
                        Cell::Value(v) => prev.delta_total + v,
                        Cell::Missing => 0.0,
                    },
                    fx_rate: self.references.fx_at(&row.date),
                    inflation: self.references.inflation_at(&row.date),
                },
            };
            out.push(next);
        }

        out
    }
}
