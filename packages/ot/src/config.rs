use serde::{Deserialize, Serialize};

/// Tuning knobs of the replay engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Seeks that cross more operations than this rebuild the document from
    /// scratch instead of applying/reverting one op at a time
    #[serde(default = "default_big_jump_threshold")]
    pub big_jump_threshold: usize,

    /// Deepest allowed nesting of exercise/assert regions
    #[serde(default = "default_max_region_depth")]
    pub max_region_depth: usize,
}

fn default_big_jump_threshold() -> usize {
    10
}

fn default_max_region_depth() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            big_jump_threshold: default_big_jump_threshold(),
            max_region_depth: default_max_region_depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{ "bigJumpThreshold": 25, "maxRegionDepth": 2 }"#;

        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.big_jump_threshold, 25);
        assert_eq!(config.max_region_depth, 2);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.big_jump_threshold, 10);
    }
}
