//! Rule search and paginated filtering.
//!
//! This crate provides:
//! - A `key:value` query language with round-trip serialization
//! - Filter state, label matchers and fuzzy name matching
//! - A planner splitting filters between the rule source and local predicates
//! - Cursor-based paging over many rule sources, merged into one lazy stream

pub mod cancel;
pub mod config;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod query;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types
pub use cancel::{CancellationToken, SearchVersionTracker};
pub use config::{PageSizes, SearchConfig};
pub use error::{Result, RuleSearchError};
pub use filter::{
    normalize_filter, DataSourceNameResolver, DataSourceRegistry, FilterCapabilities,
    InMemoryDataSourceRegistry, MatchContext, RulesFilter,
};
pub use pagination::{
    FilteredRuleStream, PageLimit, PageRequest, RuleMatch, RuleSearch, RuleSourceClient,
    SearchSession,
};
pub use query::{parse_query, serialize_filter, ProfileKind, QueryProfile};
pub use types::{Page, Rule, RuleGroup, RuleGroupIdentifier, RuleSource, RuleSourceId};
