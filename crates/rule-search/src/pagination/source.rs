use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::BackendQueryParams;
use crate::types::{Page, RuleSourceId};

/// Page size for a request: a number of groups, or a total number of rules
/// when every active filter is applied remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "limit")]
pub enum PageLimit {
    Groups(usize),
    Rules(usize),
}

impl PageLimit {
    /// The query parameter carrying this limit.
    pub fn param_name(&self) -> &'static str {
        match self {
            Self::Groups(_) => "group_limit",
            Self::Rules(_) => "rule_limit",
        }
    }

    pub fn value(&self) -> usize {
        match self {
            Self::Groups(limit) | Self::Rules(limit) => *limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub source: RuleSourceId,
    pub limit: PageLimit,
    /// `None` for the first page.
    pub continuation_token: Option<String>,
    pub filters: Option<BackendQueryParams>,
}

impl PageRequest {
    /// Flattens the request into URL query pairs: the limit, the continuation
    /// token and any structural filters.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![(self.limit.param_name(), self.limit.value().to_string())];
        if let Some(token) = &self.continuation_token {
            pairs.push(("group_next_token", token.clone()));
        }
        if let Some(filters) = &self.filters {
            pairs.extend(filters.to_query_pairs());
        }
        pairs
    }
}

/// Fetches pages of rule groups from a rule source.
#[async_trait]
pub trait RuleSourceClient: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page>;
}
