//! Reference index series (inflation, FX) and their alignment with report dates.

use crate::config::ReportConfig;
use crate::schema::{ReportPayload, Valuation};
use crate::utils::DateKey;
use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// How a report date is matched against a valuation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMatch {
    /// The valuation date only has to occur inside the row date string.
    #[default]
    Contains,
    Exact,
}

impl ValuationMatch {
    fn matches(&self, date_key: &str, valuation_date: &str) -> bool {
        match self {
            ValuationMatch::Contains => date_key.contains(valuation_date),
            ValuationMatch::Exact => date_key == valuation_date,
        }
    }
}

/// Value of the first valuation whose date occurs within `date_key`.
pub fn lookup(date_key: &str, series: &[Valuation]) -> Option<f64> {
    lookup_with(date_key, series, ValuationMatch::Contains)
}

pub fn lookup_with(date_key: &str, series: &[Valuation], rule: ValuationMatch) -> Option<f64> {
    series
        .iter()
        .find(|v| rule.matches(date_key, &v.date))
        .map(|v| v.value)
}

/// The two reference series of one report, as consumed by the percentage tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceSeries<'a> {
    pub inflation: Option<&'a [Valuation]>,
    pub fx: Option<&'a [Valuation]>,
    pub rule: ValuationMatch,
}

impl<'a> ReferenceSeries<'a> {
    pub fn from_report(payload: &'a ReportPayload, config: &ReportConfig) -> Self {
        Self {
            inflation: payload.reference(&config.inflation_key),
            fx: payload.reference(&config.fx_key),
            rule: config.valuation_match,
        }
    }

    pub fn inflation_at(&self, date: &DateKey) -> Option<f64> {
        self.inflation
            .and_then(|series| lookup_with(&date.to_string(), series, self.rule))
    }

    pub fn fx_at(&self, date: &DateKey) -> Option<f64> {
        self.fx
            .and_then(|series| lookup_with(&date.to_string(), series, self.rule))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub date: String,
    pub value_dolar: f64,
    /// Inflation as a fraction (the series is published in percentage points).
    pub value_inflation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceTable {
    Aligned(Vec<ReferenceRow>),
    Unavailable { label: String },
}

impl ReferenceTable {
    pub const COLUMNS: [&'static str; 3] = ["date", "value_dolar", "value_inflation"];

    pub fn rows(&self) -> &[ReferenceRow] {
        match self {
            ReferenceTable::Aligned(rows) => rows,
            ReferenceTable::Unavailable { .. } => &[],
        }
    }
}

impl Serialize for ReferenceTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("columns", &Self::COLUMNS)?;
        match self {
            ReferenceTable::Aligned(rows) => map.serialize_entry("rows", rows)?,
            ReferenceTable::Unavailable { label } => {
                let row: BTreeMap<&str, &str> = Self::COLUMNS
                    .iter()
                    .map(|column| (*column, label.as_str()))
                    .collect();
                map.serialize_entry("rows", &[row])?
            }
        }
        map.end()
    }
}

pub struct ReferenceAligner;

impl ReferenceAligner {
    /// Inner join of the two series on exact date equality, in inflation order.
    ///
    /// Dates present in only one series are dropped, so the result may be
    /// shorter than either input.
    pub fn align(inflation: &[Valuation], fx: &[Valuation]) -> Vec<ReferenceRow> {
        inflation
            .iter()
            .filter_map(|infl| {
                fx.iter().find(|d| d.date == infl.date).map(|d| ReferenceRow {
                    date: infl.date.clone(),
                    value_dolar: d.value,
                    value_inflation: infl.value / 100.0,
                })
            })
            .collect()
    }

    pub fn from_report(payload: &ReportPayload, config: &ReportConfig) -> ReferenceTable {
        let references = ReferenceSeries::from_report(payload, config);
        match (references.inflation, references.fx) {
            (Some(inflation), Some(fx)) => ReferenceTable::Aligned(Self::align(inflation, fx)),
            _ => ReferenceTable::Unavailable {
                label: config.messages.label.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn valuation(date: &str, value: f64) -> Valuation {
        Valuation {
            date: date.to_string(),
            value,
        }
    }

    #[test]
    fn test_align_divides_inflation_by_hundred() {
        let rows = ReferenceAligner::align(
            &[valuation("2024-01-01", 500.0)],
            &[valuation("2024-01-01", 1000.0)],
        );
        assert_eq!(
            rows,
            vec![ReferenceRow {
                date: "2024-01-01".to_string(),
                value_dolar: 1000.0,
                value_inflation: 5.0,
            }]
        );
    }

    #[test]
    fn test_align_is_an_inner_join() {
        let inflation = [
            valuation("2024-01-01", 2.0),
            valuation("2024-01-08", 3.0),
            valuation("2024-01-15", 4.0),
        ];
        let fx = [valuation("2024-01-15", 900.0), valuation("2024-01-01", 850.0)];

        let rows = ReferenceAligner::align(&inflation, &fx);
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-15"]);
        assert_eq!(rows[1].value_dolar, 900.0);
    }

    #[test]
    fn test_align_drops_dates_missing_on_either_side() {
        let inflation = [valuation("2024-01-08", 3.0), valuation("2024-01-22", 5.0)];
        let fx = [
            valuation("2024-01-01", 840.0),
            valuation("2024-01-08", 845.0),
            valuation("2024-01-15", 850.0),
        ];

        let rows = ReferenceAligner::align(&inflation, &fx);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "2024-01-08");
        assert_eq!(rows[0].value_dolar, 845.0);
        assert!(ReferenceAligner::align(&[], &fx).is_empty());
    }

    #[test]
    fn test_lookup_uses_containment() {
        let series = [valuation("2024-01", 1.0), valuation("2024-01-08", 2.0)];
        // The month-only entry is found first for any January date
        assert_eq!(lookup("2024-01-08", &series), Some(1.0));
        assert_eq!(
            lookup_with("2024-01-08", &series, ValuationMatch::Exact),
            Some(2.0)
        );
        assert_eq!(lookup("2023-12-31", &series), None);
    }

    #[test]
    fn test_reference_series_by_date_key() {
        let inflation = vec![valuation("2024-01-01", 3.5)];
        let refs = ReferenceSeries {
            inflation: Some(&inflation),
            fx: None,
            rule: ValuationMatch::Contains,
        };
        let key = DateKey::Day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(refs.inflation_at(&key), Some(3.5));
        assert_eq!(refs.fx_at(&key), None);
        assert_eq!(refs.inflation_at(&DateKey::Undated), None);
    }

    #[test]
    fn test_missing_series_gives_unavailable_table() {
        let payload = ReportPayload::default();
        let table = ReferenceAligner::from_report(&payload, &ReportConfig::default());
        assert!(table.rows().is_empty());

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["columns"][0], "date");
        assert_eq!(json["rows"][0]["value_dolar"], ReportConfig::default().messages.label);
    }
}
