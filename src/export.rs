//! Report request parameters, export formats and tabular serialisation.

use crate::engine::ReportTable;
use crate::error::{ReportError, Result};
use crate::references::ReferenceTable;
use chrono::NaiveDate;
use csv::{Writer, WriterBuilder};
use serde::{Deserialize, Serialize};

const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Either a single day or an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportPeriod {
    Day {
        date: NaiveDate,
    },
    #[serde(rename_all = "camelCase")]
    Range {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

/// What the user asked for: a period plus optional sampling intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(flatten)]
    pub period: ReportPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks_interval: Option<u32>,
}

/// Export requests carry the same parameters as searches.
pub type ExportRequest = ReportRequest;

impl ReportRequest {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            period: ReportPeriod::Day { date },
            days_interval: None,
            weeks_interval: None,
        }
    }

    pub fn range(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            period: ReportPeriod::Range {
                start_date,
                end_date,
            },
            days_interval: None,
            weeks_interval: None,
        }
    }

    pub fn with_intervals(mut self, days: Option<u32>, weeks: Option<u32>) -> Self {
        self.days_interval = days;
        self.weeks_interval = weeks;
        self
    }

    /// Parameters as sent to the export endpoint: `date` for a single day,
    /// `startDate`/`endDate` for a range, plus any intervals.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = match self.period {
            ReportPeriod::Day { date } => vec![("date", format_date(date))],
            ReportPeriod::Range {
                start_date,
                end_date,
            } => vec![
                ("startDate", format_date(start_date)),
                ("endDate", format_date(end_date)),
            ],
        };
        push_intervals(&mut pairs, self.days_interval, self.weeks_interval);
        pairs
    }
}

/// Fetch parameters. A single day is sent as `start == end` without intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_interval: Option<u32>,
    pub weeks_interval: Option<u32>,
}

impl ReportQuery {
    pub fn from_request(request: &ReportRequest) -> Result<Self> {
        match request.period {
            ReportPeriod::Day { date } => Ok(Self {
                start_date: date,
                end_date: date,
                days_interval: None,
                weeks_interval: None,
            }),
            ReportPeriod::Range {
                start_date,
                end_date,
            } => {
                if end_date < start_date {
                    return Err(ReportError::InvalidPeriod(format!(
                        "end date {} is before start date {}",
                        end_date, start_date
                    )));
                }
                Ok(Self {
                    start_date,
                    end_date,
                    days_interval: request.days_interval,
                    weeks_interval: request.weeks_interval,
                })
            }
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("startDate", format_date(self.start_date)),
            ("endDate", format_date(self.end_date)),
        ];
        push_intervals(&mut pairs, self.days_interval, self.weeks_interval);
        pairs
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(QUERY_DATE_FORMAT).to_string()
}

fn push_intervals(pairs: &mut Vec<(&'static str, String)>, days: Option<u32>, weeks: Option<u32>) {
    if let Some(days) = days {
        pairs.push(("daysInterval", days.to_string()));
    }
    if let Some(weeks) = weeks {
        pairs.push(("weeksInterval", weeks.to_string()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn file_name(&self) -> String {
        format!("reporte.{}", self.extension())
    }
}

/// A downloaded export and the name it is offered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format.file_name(),
            bytes,
        }
    }
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::IoError(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// CSV with the displayed columns as header. Cells of the undated row that
/// are not table columns are not written.
pub fn table_to_csv(table: &ReportTable) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(table.displayed_columns())?;

    match table {
        ReportTable::Pivot(pivot) => {
            for row in pivot.rows() {
                let mut record = Vec::with_capacity(pivot.columns().len() + 2);
                record.push(row.date.to_string());
                record.extend(pivot.columns().iter().map(|c| row.get(c).to_string()));
                record.push(row.total.to_string());
                writer.write_record(&record)?;
            }
        }
        ReportTable::Unavailable(placeholder) => {
            writer.write_record([&placeholder.label, &placeholder.message])?;
        }
    }

    finish(writer)
}

pub fn references_to_csv(table: &ReferenceTable) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(ReferenceTable::COLUMNS)?;

    match table {
        ReferenceTable::Aligned(rows) => {
            for row in rows {
                writer.serialize(row)?;
            }
        }
        ReferenceTable::Unavailable { label } => {
            writer.write_record(ReferenceTable::COLUMNS.iter().map(|_| label.as_str()))?;
        }
    }

    finish(writer)
}

/// CSV of any row type, header taken from its serialized field names.
pub fn rows_to_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    finish(writer)
}
