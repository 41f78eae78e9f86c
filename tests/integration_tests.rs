use anyhow::Result;
use holdings_report_builder::*;
use serde_json::json;

fn holding(value: f64, date: Option<&str>) -> serde_json::Value {
    let requested = date.unwrap_or("2024-01-01T00:00:00Z");
    json!({
        "Currency": "ARS",
        "CurrencySign": "$",
        "Value": value,
        "DateRequested": requested,
        "Date": date,
    })
}

fn scenario_payload() -> Result<ReportPayload> {
    Ok(serde_json::from_value(json!({
        "AssetsByCategory": {
            "Stocks": [
                { "ID": "A", "Type": "Stock", "Holdings": [holding(100.0, Some("2024-01-01T00:00:00Z"))] },
                { "ID": "B", "Type": "Stock", "Holdings": [holding(50.0, Some("2024-01-01T00:00:00Z"))] }
            ],
            "Cash": [
                { "ID": "C", "Type": "Cash", "Holdings": [holding(30.0, None)] }
            ]
        },
        "TotalHoldingsByDate": [holding(140.0, Some("2024-01-01T00:00:00Z"))]
    }))?)
}

#[test]
fn test_holdings_pivot_with_undated_row() -> Result<()> {
    let tables = process_report(&scenario_payload()?, &ReportConfig::default())?;
    let json = serde_json::to_value(&tables.holdings)?;

    assert_eq!(json["columns"], json!(["date", "A", "B", "total"]));
    assert_eq!(
        json["rows"],
        json!([
            { "date": "2024-01-01", "A": 100.0, "B": 50.0, "total": 140.0 },
            { "date": "-", "C": 30.0, "total": 30.0 }
        ])
    );
    Ok(())
}

#[test]
fn test_reference_alignment() -> Result<()> {
    let payload: ReportPayload = serde_json::from_value(json!({
        "ReferenceVariables": {
            "INFLATION": { "Valuations": [{ "Date": "2024-01-01", "Value": 500.0 }] },
            "A3500": { "Valuations": [{ "Date": "2024-01-01", "Value": 1000.0 }] }
        }
    }))?;

    let tables = process_report(&payload, &ReportConfig::default())?;
    assert_eq!(
        serde_json::to_value(tables.references.rows())?,
        json!([{ "date": "2024-01-01", "value_dolar": 1000.0, "value_inflation": 5.0 }])
    );
    Ok(())
}

#[test]
fn test_empty_assets_give_message_table() -> Result<()> {
    let payload = ReportPayload::from_json_str(r#"{ "AssetsByCategory": {} }"#)?;
    let tables = process_report(&payload, &ReportConfig::default())?;

    assert_eq!(tables.holdings.displayed_columns(), vec!["date", "message"]);
    let json = serde_json::to_value(&tables.holdings)?;
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0]["message"].as_str().unwrap().is_empty());
    Ok(())
}

#[test]
fn test_processing_is_idempotent() -> Result<()> {
    let payload = scenario_payload()?;
    let config = ReportConfig::default();

    let first = serde_json::to_string(&process_report(&payload, &config)?)?;
    let second = serde_json::to_string(&process_report(&payload, &config)?)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_weekly_series_follow_chained_growth() -> Result<()> {
    let dates = [
        "2024-01-01T00:00:00Z",
        "2024-01-08T00:00:00Z",
        "2024-01-15T00:00:00Z",
        "2024-01-22T00:00:00Z",
        "2024-01-29T00:00:00Z",
    ];
    let values = [1000.0, 1050.0, 997.5, 1100.0, 1155.0];
    let holdings: Vec<_> = dates
        .iter()
        .zip(values)
        .map(|(d, v)| holding(v, Some(*d)))
        .collect();

    let payload: ReportPayload = serde_json::from_value(json!({
        "AssetsByCategory": { "Bonds": [{ "ID": "AL30", "Holdings": holdings }] }
    }))?;
    let tables = process_report(&payload, &ReportConfig::default())?;

    assert_eq!(tables.weekly.len(), 5);
    assert_eq!(tables.cumulative[0].change, 0.0);
    for i in 1..tables.cumulative.len() {
        let expected =
            (1.0 + tables.cumulative[i - 1].change) * (1.0 + tables.weekly[i].change) - 1.0;
        assert!((tables.cumulative[i].change - expected).abs() < 1e-12);
    }

    let overall = values[4] / values[0] - 1.0;
    assert!((tables.cumulative[4].change - overall).abs() < 1e-9);
    assert!((tables.cumulative[4].delta_total - 155.0).abs() < 1e-9);

    let json = serde_json::to_value(&tables.weekly[1])?;
    assert_eq!(json["date"], "2024-01-08");
    assert!(json.get("porcentual").is_some());
    assert!(json["A3500"].is_null());
    Ok(())
}

#[test]
fn test_category_tables_and_returns() -> Result<()> {
    let payload: ReportPayload = serde_json::from_value(json!({
        "AssetsReturnByCategory": {
            "Stocks": [{ "ID": "GGAL", "ReturnsByDateRange": [
                { "StartDate": "2024-01-01T00:00:00Z", "EndDate": "2024-01-08T00:00:00Z", "ReturnPercentage": 0.05 }
            ]}]
        },
        "CategoryAssets": {
            "Stocks": { "Holdings": [holding(300.0, Some("2024-01-01T00:00:00Z"))] },
            "Bonds": { "Holdings": [holding(200.0, Some("2024-01-01T00:00:00Z"))] }
        },
        "CategoryAssetsReturn": {
            "Stocks": { "ReturnsByDateRange": [
                { "StartDate": "2024-01-01T00:00:00Z", "ReturnPercentage": 0.05 }
            ]}
        },
        "TotalReturns": [
            { "StartDate": "2024-01-01T00:00:00Z", "ReturnPercentage": 0.03 }
        ]
    }))?;

    let tables = process_report(&payload, &ReportConfig::default())?;

    let returns = tables.returns.as_pivot().unwrap();
    assert_eq!(returns.rows()[0].total, Cell::Value(0.03));

    let categories = tables.category_holdings.as_pivot().unwrap();
    assert_eq!(
        categories.displayed_columns(),
        vec!["date", "Stocks", "Bonds", "total"]
    );
    assert_eq!(categories.rows()[0].total, Cell::Value(500.0));

    assert_eq!(
        tables.category_returns.as_pivot().unwrap().rows()[0].total,
        Cell::Value(0.03)
    );
    Ok(())
}

#[test]
fn test_unmatched_totals_policy_from_config() -> Result<()> {
    let payload: ReportPayload = serde_json::from_value(json!({
        "AssetsByCategory": {
            "Stocks": [{ "ID": "A", "Holdings": [
                holding(100.0, Some("2024-01-01T00:00:00Z")),
                holding(120.0, Some("2024-01-08T00:00:00Z"))
            ]}]
        },
        "TotalHoldingsByDate": [holding(90.0, Some("2024-01-01T00:00:00Z"))]
    }))?;

    let totals = |config: &ReportConfig| -> Result<Vec<Cell>> {
        let tables = process_report(&payload, config)?;
        Ok(tables
            .holdings
            .as_pivot()
            .unwrap()
            .rows()
            .iter()
            .map(|r| r.total)
            .collect())
    };

    assert_eq!(
        totals(&ReportConfig::default())?,
        vec![Cell::Value(90.0), Cell::Missing]
    );

    let config = ReportConfig::from_json_str(r#"{"unmatched_totals": "keep_computed"}"#)?;
    assert_eq!(
        totals(&config)?,
        vec![Cell::Value(90.0), Cell::Value(120.0)]
    );
    Ok(())
}

#[test]
fn test_malformed_date_aborts_processing() -> Result<()> {
    let payload: ReportPayload = serde_json::from_value(json!({
        "AssetsByCategory": {
            "Stocks": [{ "ID": "A", "Holdings": [
                { "Value": 1.0, "DateRequested": "yesterday", "Date": "yesterday" }
            ]}]
        }
    }))?;

    match process_report(&payload, &ReportConfig::default()) {
        Err(ReportError::DateFormat { field, value }) => {
            assert_eq!(field, "DateRequested");
            assert_eq!(value, "yesterday");
        }
        other => panic!("expected a date format error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_csv_export_of_tables() -> Result<()> {
    let tables = process_report(&scenario_payload()?, &ReportConfig::default())?;

    let csv = table_to_csv(&tables.holdings)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "date,A,B,total");
    assert_eq!(lines[1], "2024-01-01,100,50,140");
    assert_eq!(lines[2], "-,-,-,30");

    let weekly = rows_to_csv(&tables.weekly)?;
    assert!(weekly.starts_with("date,porcentual,ARS,A3500,inflacion\n"));
    Ok(())
}

#[test]
fn test_exact_valuation_matching_from_config() -> Result<()> {
    let config = ReportConfig::from_json_str(r#"{ "valuation_match": "exact" }"#)?;
    let payload: ReportPayload = serde_json::from_value(json!({
        "AssetsByCategory": { "Stocks": [{ "ID": "A", "Holdings": [
            holding(100.0, Some("2024-01-01T00:00:00Z")),
            holding(110.0, Some("2024-01-08T00:00:00Z"))
        ]}]},
        "ReferenceVariables": {
            "A3500": { "Valuations": [{ "Date": "2024-01", "Value": 800.0 }] }
        }
    }))?;

    let tables = process_report(&payload, &config)?;
    assert_eq!(tables.weekly[1].fx_rate, None);

    let contains = process_report(&payload, &ReportConfig::default())?;
    assert_eq!(contains.weekly[1].fx_rate, Some(800.0));
    Ok(())
}

#[test]
fn test_payload_schema_generation() -> Result<()> {
    let schema = ReportPayload::schema_as_json()?;
    assert!(schema.contains("AssetsByCategory"));
    assert!(schema.contains("ReferenceVariables"));
    Ok(())
}
