use holdings_report_builder::{
    process_report, references_to_csv, rows_to_csv, table_to_csv, ReportConfig, ReportPayload,
};
use std::error::Error;

// cargo run --example weekly_report -- report.json [config.json]
fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let payload_path = args
        .next()
        .ok_or("usage: weekly_report <report.json> [config.json]")?;

    let config = match args.next() {
        Some(path) => ReportConfig::from_path(path)?,
        None => ReportConfig::default(),
    };

    println!("📄 Loading report from {}", payload_path);
    let payload = ReportPayload::from_json_str(&std::fs::read_to_string(&payload_path)?)?;
    let tables = process_report(&payload, &config)?;

    println!("\n📊 Holdings");
    println!("{}", table_to_csv(&tables.holdings)?);

    println!("📊 Holdings by category");
    println!("{}", table_to_csv(&tables.category_holdings)?);

    println!("📈 Weekly change");
    println!("{}", rows_to_csv(&tables.weekly)?);

    println!("📈 Cumulative change");
    println!("{}", rows_to_csv(&tables.cumulative)?);

    println!("💱 Reference variables");
    println!("{}", references_to_csv(&tables.references)?);

    if let Some(last) = tables.cumulative.last() {
        println!(
            "✅ {} weeks, cumulative change {:.2}% ({:+.2} ARS)",
            tables.cumulative.len(),
            last.change * 100.0,
            last.delta_total
        );
    }

    Ok(())
}
