use crate::config::ReportConfig;
use crate::engine::{PivotBuilder, ReportTable};
use crate::error::Result;
use crate::ingestion::{asset_return_observations, total_return_observations};
use crate::schema::ReportPayload;

/// Return percentages by start date and instrument, reconciled against
/// `TotalReturns`. Independent of the holdings table.
pub struct ReturnSeriesEngine {
    builder: PivotBuilder,
}

impl ReturnSeriesEngine {
    pub fn new(builder: PivotBuilder) -> Self {
        Self { builder }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(PivotBuilder::new(config.pivot_policy()))
    }

    pub fn build(&self, payload: &ReportPayload, config: &ReportConfig) -> Result<ReportTable> {
        let placeholder = config.messages.returns();
        let assets = payload.asset_returns_by_category();
        if assets.is_empty() {
            return Ok(ReportTable::Unavailable(placeholder));
        }

        let observations = asset_return_observations(assets)?;
        let totals = payload
            .total_returns()
            .map(total_return_observations)
            .transpose()?;

        Ok(self
            .builder
            .build_report(observations, totals.as_deref(), &placeholder))
    }
}
