use crate::config::ReportConfig;
use crate::error::Result;
use crate::ingestion::{holding_observations, total_holding_observations, TotalObservation};
use crate::reconciler::{TotalsReconciler, UnmatchedTotal};
use crate::schema::{Keyed, ReportPayload};
use crate::utils::{sum_present, DateKey, SENTINEL};
use chrono::NaiveDate;
use log::debug;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const DATE_COLUMN: &str = "date";
pub const TOTAL_COLUMN: &str = "total";
pub const MESSAGE_COLUMN: &str = "message";

/// A table cell: a number or the `"-"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Value(f64),
    Missing,
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Value(v) => Some(*v),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// `self - other` when both are numeric, otherwise the sentinel.
    pub fn minus(&self, other: &Cell) -> Cell {
        match (self, other) {
            (Cell::Value(a), Cell::Value(b)) => Cell::Value(a - b),
            _ => Cell::Missing,
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Value).unwrap_or(Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Value(v) => write!(f, "{}", v),
            Cell::Missing => f.write_str(SENTINEL),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Cell::Value(v) => serializer.serialize_f64(*v),
            Cell::Missing => serializer.serialize_str(SENTINEL),
        }
    }
}

/// One `(entity, date, value)` data point fed into the pivot.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub entity_id: String,
    pub date_key: DateKey,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(entity_id: impl Into<String>, date_key: DateKey, value: Option<f64>) -> Self {
        Self {
            entity_id: entity_id.into(),
            date_key,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub date: DateKey,
    pub cells: Keyed<Cell>,
    pub total: Cell,
    /// Sum of the numeric cells before any authoritative override.
    pub(crate) computed_total: Cell,
}

impl PivotRow {
    pub fn new(date: DateKey, cells: Keyed<Cell>, total: Cell) -> Self {
        Self {
            date,
            cells,
            total,
            computed_total: total,
        }
    }

    /// Cell of a column; `"total"` addresses the total, unknown columns are the sentinel.
    pub fn get(&self, column: &str) -> Cell {
        if column == TOTAL_COLUMN {
            return self.total;
        }
        self.cells.get(column).copied().unwrap_or(Cell::Missing)
    }

    pub fn computed_total(&self) -> Cell {
        self.computed_total
    }
}

impl Serialize for PivotRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len() + 2))?;
        map.serialize_entry(DATE_COLUMN, &self.date)?;
        for (column, cell) in self.cells.iter() {
            map.serialize_entry(column, cell)?;
        }
        map.serialize_entry(TOTAL_COLUMN, &self.total)?;
        map.end()
    }
}

/// Dense date × entity matrix. `columns` holds the entity columns only; the
/// leading `date` and trailing `total` columns are implicit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotTable {
    columns: Vec<String>,
    rows: Vec<PivotRow>,
    /// Position of the first row carrying each date key.
    first_row: HashMap<DateKey, usize>,
}

impl PivotTable {
    pub fn new(columns: Vec<String>, rows: Vec<PivotRow>) -> Self {
        let mut first_row = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            first_row.entry(row.date).or_insert(i);
        }
        Self {
            columns,
            rows,
            first_row,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[PivotRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PivotRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `["date", <entity columns>..., "total"]`
    pub fn displayed_columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.columns.len() + 2);
        columns.push(DATE_COLUMN.to_string());
        columns.extend(self.columns.iter().cloned());
        columns.push(TOTAL_COLUMN.to_string());
        columns
    }

    /// First row carrying the given date key.
    pub fn row(&self, date: &DateKey) -> Option<&PivotRow> {
        self.first_row.get(date).map(|&i| &self.rows[i])
    }
}

impl Serialize for PivotTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("columns", &self.displayed_columns())?;
        map.serialize_entry("rows", &self.rows)?;
        map.end()
    }
}

/// Placeholder shown instead of a table when the report has no data for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unavailable {
    pub label: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportTable {
    Pivot(PivotTable),
    Unavailable(Unavailable),
}

impl ReportTable {
    pub fn as_pivot(&self) -> Option<&PivotTable> {
        match self {
            ReportTable::Pivot(table) => Some(table),
            ReportTable::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ReportTable::Pivot(_))
    }

    pub fn displayed_columns(&self) -> Vec<String> {
        match self {
            ReportTable::Pivot(table) => table.displayed_columns(),
            ReportTable::Unavailable(_) => {
                vec![DATE_COLUMN.to_string(), MESSAGE_COLUMN.to_string()]
            }
        }
    }
}

impl Serialize for ReportTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ReportTable::Pivot(table) => table.serialize(serializer),
            ReportTable::Unavailable(placeholder) => {
                let mut row = BTreeMap::new();
                row.insert(DATE_COLUMN, placeholder.label.as_str());
                row.insert(MESSAGE_COLUMN, placeholder.message.as_str());

                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("columns", &self.displayed_columns())?;
                map.serialize_entry("rows", &[row])?;
                map.end()
            }
        }
    }
}

/// Switches for the behaviours that differ between asset and category tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotPolicy {
    /// Emit one synthetic `"-"` row per entity that never had a dated observation.
    pub undated_rows: bool,
    /// Total of a dated row the authoritative series has no entry for.
    pub unmatched_totals: UnmatchedTotal,
}

impl Default for PivotPolicy {
    fn default() -> Self {
        Self {
            undated_rows: true,
            unmatched_totals: UnmatchedTotal::default(),
        }
    }
}

pub struct PivotBuilder {
    policy: PivotPolicy,
}

impl Default for PivotBuilder {
    fn default() -> Self {
        Self::new(PivotPolicy::default())
    }
}

impl PivotBuilder {
    pub fn new(policy: PivotPolicy) -> Self {
        Self { policy }
    }

    /// Reshapes observations into a dense table with computed totals.
    ///
    /// Entities are scanned in the order they first appear. An entity with at
    /// least one dated observation becomes a column; its undated observations
    /// are ignored. An entity with none contributes a synthetic undated row
    /// holding the sum of its values instead.
    pub fn build<I>(&self, observations: I) -> PivotTable
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut entity_order: Vec<String> = Vec::new();
        let mut by_entity: HashMap<String, Vec<(DateKey, Option<f64>)>> = HashMap::new();

        for obs in observations {
            let slot = by_entity.entry(obs.entity_id.clone()).or_insert_with(|| {
                entity_order.push(obs.entity_id.clone());
                Vec::new()
            });
            slot.push((obs.date_key, obs.value));
        }

        let mut columns: Vec<String> = Vec::new();
        let mut undated: Vec<(String, Option<f64>)> = Vec::new();
        let mut grid: BTreeMap<NaiveDate, HashMap<String, Cell>> = BTreeMap::new();

        for entity in entity_order {
            let entries = &by_entity[&entity];

            if entries.iter().any(|(key, _)| key.is_dated()) {
                for (key, value) in entries {
                    if let DateKey::Day(date) = key {
                        // Last write wins within a (date, entity) cell
                        grid.entry(*date)
                            .or_default()
                            .insert(entity.clone(), Cell::from(*value));
                    }
                }
                columns.push(entity);
            } else {
                let sum = sum_present(entries.iter().map(|(_, value)| *value));
                undated.push((entity, sum));
            }
        }

        let mut rows: Vec<PivotRow> = grid
            .into_iter()
            .map(|(date, recorded)| {
                let cells: Keyed<Cell> = columns
                    .iter()
                    .map(|column| {
                        let cell = recorded.get(column).copied().unwrap_or(Cell::Missing);
                        (column.clone(), cell)
                    })
                    .collect();
                let total = Cell::from(sum_present(cells.iter().map(|(_, c)| c.value())));
                PivotRow::new(DateKey::Day(date), cells, total)
            })
            .collect();

        if self.policy.undated_rows {
            for (entity, sum) in undated {
                let cell = Cell::from(sum);
                let total = Cell::from(sum.filter(|v| *v > 0.0));
                if cell.is_missing() && total.is_missing() {
                    continue;
                }

                let mut cells = Keyed::new();
                cells.insert(entity, cell);
                rows.push(PivotRow::new(DateKey::Undated, cells, total));
            }
        }

        debug!(
            "Built pivot with {} columns and {} rows",
            columns.len(),
            rows.len()
        );

        PivotTable::new(columns, rows)
    }

    /// Builds a table for display: an empty observation set becomes the
    /// "no data" placeholder, and a supplied authoritative series overrides
    /// the computed totals.
    pub fn build_report(
        &self,
        observations: Vec<Observation>,
        totals: Option<&[TotalObservation]>,
        placeholder: &Unavailable,
    ) -> ReportTable {
        if observations.is_empty() {
            return ReportTable::Unavailable(placeholder.clone());
        }

        let table = self.build(observations);
        let table = match totals {
            Some(totals) => {
                TotalsReconciler::new(self.policy.unmatched_totals).reconcile(table, totals)
            }
            None => table,
        };

        ReportTable::Pivot(table)
    }
}

/// Holdings by date and instrument, reconciled against `TotalHoldingsByDate`.
pub fn build_holdings_table(payload: &ReportPayload, config: &ReportConfig) -> Result<ReportTable> {
    let placeholder = config.messages.holdings();
    let assets = payload.assets_by_category();
    if assets.is_empty() {
        return Ok(ReportTable::Unavailable(placeholder));
    }

    let observations = holding_observations(assets)?;
    let totals = payload
        .total_holdings()
        .map(total_holding_observations)
        .transpose()?;

    let builder = PivotBuilder::new(config.pivot_policy());
    Ok(builder.build_report(observations, totals.as_deref(), &placeholder))
}
