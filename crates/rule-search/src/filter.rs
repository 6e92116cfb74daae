//! Filter state, matching, and the remote/local split.
//!
//! This module provides:
//! - The [`RulesFilter`] aggregate and its normalization
//! - Label matchers and fuzzy name matching
//! - Per-dimension predicates composed with AND semantics
//! - Data-source name resolution with a bounded cache
//! - The planner deciding which dimensions the rule source applies

mod datasource;
mod fuzzy;
mod matcher;
mod planner;
mod predicates;
mod state;

pub use datasource::{DataSourceNameResolver, DataSourceRegistry, InMemoryDataSourceRegistry};
pub use fuzzy::fuzzy_matches;
pub use matcher::{labels_match_matchers, parse_matcher, parse_matcher_loose, LabelMatcher};
pub use planner::{
    has_client_side_filters, plan_filter, route, BackendQueryParams, FilterCapabilities,
    FilterPlan, FilterRoute,
};
pub use predicates::{
    group_matches, group_predicate, rule_matches, rule_predicate, DataSourceIds, MatchContext,
    Predicate, PredicateConfig,
};
pub use state::{
    build_title_search, normalize_filter, FilterDimension, PluginsVisibility, RulesFilter,
};
