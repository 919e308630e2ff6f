//! Pipeline configuration

use serde::{Deserialize, Serialize};

/// What to write into a foreign key column whose parent row cannot be found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedFkPolicy {
    /// Set the column to null
    #[default]
    Null,
    /// Leave the raw input value in place
    KeepRaw,
}

impl std::fmt::Display for UnresolvedFkPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedFkPolicy::Null => write!(f, "null"),
            UnresolvedFkPolicy::KeepRaw => write!(f, "keep_raw"),
        }
    }
}

/// Configuration for a normalization run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Policy for foreign keys that do not resolve
    #[serde(default)]
    pub unresolved_fk_policy: UnresolvedFkPolicy,

    /// Validate the plan against the input columns before processing
    #[serde(default = "default_validate_plan")]
    pub validate_plan: bool,
}

fn default_validate_plan() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unresolved_fk_policy: UnresolvedFkPolicy::default(),
            validate_plan: default_validate_plan(),
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unresolved foreign key policy
    pub fn with_unresolved_fk_policy(mut self, policy: UnresolvedFkPolicy) -> Self {
        self.unresolved_fk_policy = policy;
        self
    }

    /// Enable or disable plan validation
    pub fn with_plan_validation(mut self, enabled: bool) -> Self {
        self.validate_plan = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new();
        assert_eq!(config.unresolved_fk_policy, UnresolvedFkPolicy::Null);
        assert!(config.validate_plan);
    }

    #[test]
    fn test_policy_from_toml() {
        let config: PipelineConfig = toml::from_str("unresolved_fk_policy = \"keep_raw\"").unwrap();
        assert_eq!(config.unresolved_fk_policy, UnresolvedFkPolicy::KeepRaw);
        assert!(config.validate_plan);
    }
}
