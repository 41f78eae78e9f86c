use crate::config::ReportConfig;
use crate::engine::{PivotBuilder, ReportTable};
use crate::error::Result;
use crate::ingestion::{
    category_holding_observations, category_return_observations, total_holding_observations,
    total_return_observations,
};
use crate::schema::ReportPayload;

/// The pivot one level up the hierarchy: one column per category.
pub struct CategoryRollupEngine {
    builder: PivotBuilder,
}

impl CategoryRollupEngine {
    pub fn new(builder: PivotBuilder) -> Self {
        Self { builder }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(PivotBuilder::new(config.pivot_policy()))
    }

    /// Category holdings, reconciled against `TotalHoldingsByDate`.
    pub fn holdings(&self, payload: &ReportPayload, config: &ReportConfig) -> Result<ReportTable> {
        let placeholder = config.messages.category_holdings();
        let categories = payload.category_holdings();
        if categories.is_empty() {
            return Ok(ReportTable::Unavailable(placeholder));
        }

        let observations = category_holding_observations(categories)?;
        let totals = payload
            .total_holdings()
            .map(total_holding_observations)
            .transpose()?;

        Ok(self
            .builder
            .build_report(observations, totals.as_deref(), &placeholder))
    }

    /// Category returns, reconciled against `TotalReturns`.
    pub fn returns(&self, payload: &ReportPayload, config: &ReportConfig) -> Result<ReportTable> {
        let placeholder = config.messages.category_returns();
        let categories = payload.category_returns();
        if categories.is_empty() {
            return Ok(ReportTable::Unavailable(placeholder));
        }

        let observations = category_return_observations(categories)?;
        let totals = payload
            .total_returns()
            .map(total_return_observations)
            .transpose()?;

        Ok(self
            .builder
            .build_report(observations, totals.as_deref(), &placeholder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Cell;
    use serde_json::json;

    fn payload() -> ReportPayload {
        serde_json::from_value(json!({
            "CategoryAssets": {
                "Stocks": { "Holdings": [
                    { "Value": 300.0, "DateRequested": "2024-01-01T00:00:00Z", "Date": "2024-01-01T00:00:00Z" },
                    { "Value": 320.0, "DateRequested": "2024-01-08T00:00:00Z", "Date": "2024-01-08T00:00:00Z" }
                ]},
                "Cash": { "Holdings": [
                    { "Value": 50.0, "DateRequested": "2024-01-08T00:00:00Z", "Date": null }
                ]},
                "Bonds": { "Holdings": [
                    { "Value": 100.0, "DateRequested": "2024-01-08T00:00:00Z", "Date": "2024-01-08T00:00:00Z" }
                ]}
            },
            "CategoryAssetsReturn": {
                "Stocks": { "ReturnsByDateRange": [
                    { "StartDate": "2024-01-01T00:00:00Z", "ReturnPercentage": 0.066 }
                ]}
            },
            "TotalHoldingsByDate": [
                { "Value": 300.0, "DateRequested": "2024-01-01T00:00:00Z", "Date": "2024-01-01T00:00:00Z" },
                { "Value": 470.0, "DateRequested": "2024-01-08T00:00:00Z", "Date": "2024-01-08T00:00:00Z" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_category_holdings_rollup() {
        let config = ReportConfig::default();
        let table = CategoryRollupEngine::from_config(&config)
            .holdings(&payload(), &config)
            .unwrap();
        let pivot = table.as_pivot().unwrap();

        assert_eq!(pivot.displayed_columns(), vec!["date", "Stocks", "Bonds", "total"]);
        assert_eq!(pivot.len(), 3);
        assert_eq!(pivot.rows()[0].get("Bonds"), Cell::Missing);
        assert_eq!(pivot.rows()[1].total, Cell::Value(470.0));

        let cash = &pivot.rows()[2];
        assert_eq!(cash.get("Cash"), Cell::Value(50.0));
        assert_eq!(cash.total, Cell::Value(50.0));
    }

    #[test]
    fn test_category_order_is_kept_through_json_values() {
        let raw = r#"{"CategoryAssets": {
            "Stocks": { "Holdings": [{ "Value": 1.0, "DateRequested": "2024-01-01T00:00:00Z", "Date": "2024-01-01T00:00:00Z" }] },
            "Bonds": { "Holdings": [{ "Value": 2.0, "DateRequested": "2024-01-01T00:00:00Z", "Date": "2024-01-01T00:00:00Z" }] }
        }}"#;
        let direct = ReportPayload::from_json_str(raw).unwrap();
        let value: serde_json::Value = serde_json::from_str(raw).unwrap();
        let via_value: ReportPayload = serde_json::from_value(value).unwrap();

        let config = ReportConfig::default();
        let engine = CategoryRollupEngine::from_config(&config);
        let columns = |payload: &ReportPayload| {
            engine
                .holdings(payload, &config)
                .unwrap()
                .displayed_columns()
        };

        assert_eq!(columns(&direct), vec!["date", "Stocks", "Bonds", "total"]);
        assert_eq!(columns(&direct), columns(&via_value));
    }

    #[test]
    fn test_category_returns_without_totals_use_computed_sum() {
        let config = ReportConfig::default();
        let table = CategoryRollupEngine::from_config(&config)
            .returns(&payload(), &config)
            .unwrap();
        let pivot = table.as_pivot().unwrap();
        assert_eq!(pivot.rows()[0].total, Cell::Value(0.066));
    }

    #[test]
    fn test_undated_policy_follows_config() {
        let config = ReportConfig {
            undated_rows: false,
            ..Default::default()
        };
        let table = CategoryRollupEngine::from_config(&config)
            .holdings(&payload(), &config)
            .unwrap();
        assert_eq!(table.as_pivot().unwrap().len(), 2);
    }
}
