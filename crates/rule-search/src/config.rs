use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, RuleSearchError};
use crate::filter::FilterCapabilities;
use crate::query::ProfileKind;

pub const DEFAULT_GROUP_LIMIT: usize = 40;
pub const FILTERED_GROUP_LIMIT: usize = 2000;
pub const BACKEND_RULE_LIMIT: usize = 100;
pub const DEFAULT_DATASOURCE_CACHE_CAPACITY: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub capabilities: FilterCapabilities,
    pub page_sizes: PageSizes,
    pub datasource_cache_capacity: u64,
    pub profile: ProfileKind,
}

/// Page sizes requested from rule sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSizes {
    /// Groups per page when no filter runs locally.
    pub default_group_limit: usize,
    /// Groups per page when local filters will discard part of each page.
    pub filtered_group_limit: usize,
    /// Rules per page when the rule source applies every active filter.
    pub backend_rule_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            capabilities: FilterCapabilities::default(),
            page_sizes: PageSizes::default(),
            datasource_cache_capacity: DEFAULT_DATASOURCE_CACHE_CAPACITY,
            profile: ProfileKind::default(),
        }
    }
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            default_group_limit: DEFAULT_GROUP_LIMIT,
            filtered_group_limit: FILTERED_GROUP_LIMIT,
            backend_rule_limit: BACKEND_RULE_LIMIT,
        }
    }
}

impl SearchConfig {
    pub fn from_json_str(data: &str) -> Result<Self> {
        let config: SearchConfig = serde_json::from_str(data).map_err(|error| {
            RuleSearchError::Config(format!("failed to parse search config: {error}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RuleSearchError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data).map_err(|error| match error {
            RuleSearchError::Config(message) => {
                RuleSearchError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|error| {
            RuleSearchError::Serialization(format!("failed to serialize search config: {error}"))
        })
    }

    pub fn validate(&self) -> Result<()> {
        let sizes = &self.page_sizes;
        if sizes.default_group_limit == 0
            || sizes.filtered_group_limit == 0
            || sizes.backend_rule_limit == 0
        {
            return Err(RuleSearchError::Config(
                "page sizes must be greater than zero".to_string(),
            ));
        }
        if self.datasource_cache_capacity == 0 {
            return Err(RuleSearchError::Config(
                "datasource_cache_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
