use crate::engine::{PivotPolicy, Unavailable};
use crate::error::{ReportError, Result};
use crate::reconciler::UnmatchedTotal;
use crate::references::ValuationMatch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_INFLATION_KEY: &str = "INFLATION";
pub const DEFAULT_FX_KEY: &str = "A3500";

/// Texts of the placeholder tables shown when a report section has no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UnavailableMessages {
    #[schemars(description = "Shown in the date column of every placeholder row")]
    pub label: String,
    pub holdings: String,
    pub returns: String,
    pub category_holdings: String,
    pub category_returns: String,
}

impl Default for UnavailableMessages {
    fn default() -> Self {
        Self {
            label: "Not available".to_string(),
            holdings: "Holdings data is not available at this time.".to_string(),
            returns: "Returns data is not available at this time.".to_string(),
            category_holdings: "Holdings by category are not available at this time.".to_string(),
            category_returns: "Returns by category are not available at this time.".to_string(),
        }
    }
}

impl UnavailableMessages {
    fn placeholder(&self, message: &str) -> Unavailable {
        Unavailable {
            label: self.label.clone(),
            message: message.to_string(),
        }
    }

    pub fn holdings(&self) -> Unavailable {
        self.placeholder(&self.holdings)
    }

    pub fn returns(&self) -> Unavailable {
        self.placeholder(&self.returns)
    }

    pub fn category_holdings(&self) -> Unavailable {
        self.placeholder(&self.category_holdings)
    }

    pub fn category_returns(&self) -> Unavailable {
        self.placeholder(&self.category_returns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    #[schemars(description = "Name of the inflation series under ReferenceVariables")]
    pub inflation_key: String,

    #[schemars(description = "Name of the FX series under ReferenceVariables")]
    pub fx_key: String,

    #[schemars(description = "How row dates are matched against reference valuation dates")]
    pub valuation_match: ValuationMatch,

    #[schemars(description = "Emit a synthetic '-' row for instruments without any dated value")]
    pub undated_rows: bool,

    #[schemars(
        description = "Total shown on a dated row the authoritative totals series has no entry for"
    )]
    pub unmatched_totals: UnmatchedTotal,

    #[schemars(description = "Largest accepted gap between a computed row sum and the reported total")]
    pub totals_tolerance: f64,

    pub messages: UnavailableMessages,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            inflation_key: DEFAULT_INFLATION_KEY.to_string(),
            fx_key: DEFAULT_FX_KEY.to_string(),
            valuation_match: ValuationMatch::default(),
            undated_rows: true,
            unmatched_totals: UnmatchedTotal::default(),
            totals_tolerance: 0.01,
            messages: UnavailableMessages::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inflation_key.trim().is_empty() || self.fx_key.trim().is_empty() {
            return Err(ReportError::Config(
                "reference series keys must not be empty".to_string(),
            ));
        }

        if !self.totals_tolerance.is_finite() || self.totals_tolerance < 0.0 {
            return Err(ReportError::Config(format!(
                "totals_tolerance must be a non-negative number, got {}",
                self.totals_tolerance
            )));
        }

        Ok(())
    }

    pub fn pivot_policy(&self) -> PivotPolicy {
        PivotPolicy {
            undated_rows: self.undated_rows,
            unmatched_totals: self.unmatched_totals,
        }
    }
}
