use crate::change::UNBOUNDED_GROWTH;
use crate::error::{ReportingError, Result};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tunables shared by every report. All fields have defaults, so an empty JSON
/// object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    #[schemars(
        description = "Percentage reported when a value grows from a zero baseline. Must be at least 1000 so it cannot be mistaken for an ordinary change."
    )]
    pub unbounded_growth_sentinel: f64,

    #[schemars(
        description = "How many months before the current one are offered as month labels (the current month is always included)."
    )]
    pub month_history: u32,

    #[schemars(description = "Decimal places used by the compact amount formatter.")]
    pub amount_decimals: usize,

    #[schemars(description = "Entity name used for records without a BD name.")]
    pub unassigned_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unbounded_growth_sentinel: UNBOUNDED_GROWTH,
            month_history: 12,
            amount_decimals: 2,
            unassigned_label: "Unassigned".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        debug!("Loaded engine configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.unbounded_growth_sentinel.is_finite()
            || self.unbounded_growth_sentinel < UNBOUNDED_GROWTH
        {
            return Err(ReportingError::InvalidConfig(format!(
                "unboundedGrowthSentinel must be a finite value >= {}, got {}",
                UNBOUNDED_GROWTH, self.unbounded_growth_sentinel
            )));
        }

        if self.amount_decimals > 6 {
            return Err(ReportingError::InvalidConfig(format!(
                "amountDecimals must be at most 6, got {}",
                self.amount_decimals
            )));
        }

        if self.unassigned_label.trim().is_empty() {
            return Err(ReportingError::InvalidConfig(
                "unassignedLabel must not be blank".to_string(),
            ));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EngineConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.month_history, 12);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(r#"{"monthHistory": 6, "amountDecimals": 1}"#).unwrap();
        assert_eq!(config.month_history, 6);
        assert_eq!(config.amount_decimals, 1);
        assert_eq!(config.unbounded_growth_sentinel, 1000.0);
    }

    #[test]
    fn test_small_sentinel_rejected() {
        let result = EngineConfig::from_json_str(r#"{"unboundedGrowthSentinel": 500}"#);
        assert!(matches!(result, Err(ReportingError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let result = EngineConfig::from_json_str("{not json");
        assert!(matches!(result, Err(ReportingError::SerializationError(_))));
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = serde_json::to_string(&EngineConfig::generate_json_schema()).unwrap();
        assert!(schema.contains("unboundedGrowthSentinel"));
    }
}
