//! Reload pipeline configuration.

use serde::Deserialize;

use crate::transform::DEFAULT_DISCOUNT_EFFECT_TYPES;

/// Business rules applied by the reload.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Effect types whose values are summed into a session's discount.
    pub discount_effect_types: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            discount_effect_types: DEFAULT_DISCOUNT_EFFECT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}
