//! Splits a filter between the remote rule API and local predicates.
//!
//! Routing is a pure function of the source kind, the dimension and the
//! injected [`FilterCapabilities`]. Turning a capability on can only move
//! dimensions from local to remote.

use serde::{Deserialize, Serialize};

use crate::types::{Rule, RuleGroup, RuleHealth, RuleSourceKind, RuleState, RuleType};

use super::predicates::{
    group_predicate, rule_predicate, DataSourceIds, MatchContext, PredicateConfig,
};
use super::state::{build_title_search, FilterDimension, PluginsVisibility, RulesFilter};

/// Backend feature switches, passed in rather than read from global state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCapabilities {
    /// Backend supports title search and group name filtering.
    pub backend_filters_enabled: bool,
    /// Backend supports every structural filter it exposes.
    pub fully_compatible_backend_filters: bool,
}

impl FilterCapabilities {
    pub fn all() -> Self {
        Self {
            backend_filters_enabled: true,
            fully_compatible_backend_filters: true,
        }
    }

    fn any(self) -> bool {
        self.backend_filters_enabled || self.fully_compatible_backend_filters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterRoute {
    /// Applied by the rule source (query parameter or source selection).
    Remote,
    /// Applied by a local predicate after fetching.
    Local,
    /// Cannot be satisfied by this kind of source.
    Unsupported,
}

pub fn route(
    kind: RuleSourceKind,
    dimension: FilterDimension,
    capabilities: FilterCapabilities,
) -> FilterRoute {
    use FilterDimension as D;

    match kind {
        RuleSourceKind::Grafana => match dimension {
            D::Labels | D::Namespace => FilterRoute::Local,
            D::RuleState | D::RuleHealth | D::ContactPoint | D::RuleSource => FilterRoute::Remote,
            D::RuleName | D::FreeFormWords | D::GroupName => remote_if(capabilities.any()),
            D::RuleType | D::DashboardUid | D::DataSourceNames | D::Plugins => {
                remote_if(capabilities.fully_compatible_backend_filters)
            }
        },
        RuleSourceKind::DataSource => match dimension {
            D::ContactPoint => FilterRoute::Unsupported,
            D::DataSourceNames | D::RuleSource => FilterRoute::Remote,
            _ => FilterRoute::Local,
        },
    }
}

fn remote_if(enabled: bool) -> FilterRoute {
    if enabled {
        FilterRoute::Remote
    } else {
        FilterRoute::Local
    }
}

/// True iff some dimension set in `filter` is evaluated by a local predicate
/// for this source kind.
pub fn has_client_side_filters(
    filter: &RulesFilter,
    kind: RuleSourceKind,
    capabilities: FilterCapabilities,
) -> bool {
    filter.active_dimensions().into_iter().any(|dimension| {
        route(kind, dimension, capabilities) == FilterRoute::Local
            && (rule_predicate(dimension).is_some() || group_predicate(dimension).is_some())
    })
}

// ---------------------------------------------------------------------------
// Backend query parameters
// ---------------------------------------------------------------------------

/// Structural filters sent with every page request of the built-in source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendQueryParams {
    pub state: Option<RuleState>,
    pub health: Option<RuleHealth>,
    pub contact_point: Option<String>,
    pub title: Option<String>,
    pub rule_type: Option<RuleType>,
    pub dashboard_uid: Option<String>,
    pub group_name: Option<String>,
    pub datasource_uids: Vec<String>,
    pub hide_plugins: bool,
}

impl BackendQueryParams {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Renders the parameters as URL query pairs. `datasource_uid` repeats.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(state) = self.state {
            pairs.push(("state", state.as_str().to_string()));
        }
        if let Some(health) = self.health {
            pairs.push(("health", health.as_str().to_string()));
        }
        if let Some(contact_point) = &self.contact_point {
            pairs.push(("receiver_name", contact_point.clone()));
        }
        if let Some(title) = &self.title {
            pairs.push(("search.rule_name", title.clone()));
        }
        if let Some(rule_type) = self.rule_type {
            pairs.push(("rule_type", rule_type.as_str().to_string()));
        }
        if let Some(dashboard_uid) = &self.dashboard_uid {
            pairs.push(("dashboard_uid", dashboard_uid.clone()));
        }
        if let Some(group_name) = &self.group_name {
            pairs.push(("search.rule_group", group_name.clone()));
        }
        for uid in &self.datasource_uids {
            pairs.push(("datasource_uid", uid.clone()));
        }
        if self.hide_plugins {
            pairs.push(("hide_plugins", "true".to_string()));
        }
        pairs
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// How one kind of rule source evaluates a filter.
#[derive(Debug, Clone)]
pub struct FilterPlan {
    pub kind: RuleSourceKind,
    pub backend_query_params: BackendQueryParams,
    pub rule_config: PredicateConfig<Rule>,
    pub group_config: PredicateConfig<RuleGroup>,
    /// Active dimensions this kind of source cannot satisfy.
    pub unsupported: Vec<FilterDimension>,
    pub has_invalid_data_source_names: bool,
}

impl FilterPlan {
    /// True when some active dimension rules out every rule of this kind.
    pub fn excludes_all(&self) -> bool {
        !self.unsupported.is_empty()
    }

    /// True when a predicate will run locally for a dimension set in `filter`.
    pub fn has_client_side_filters(&self, filter: &RulesFilter) -> bool {
        filter.active_dimensions().into_iter().any(|dimension| {
            self.rule_config.is_local(dimension) || self.group_config.is_local(dimension)
        })
    }
}

/// Plans `context`'s filter for one source kind.
pub fn plan_filter(
    kind: RuleSourceKind,
    context: &MatchContext,
    capabilities: FilterCapabilities,
) -> FilterPlan {
    let filter = context.filter();
    let mut rule_config = PredicateConfig::new();
    let mut group_config = PredicateConfig::new();
    let mut remote = Vec::new();
    let mut unsupported = Vec::new();

    for dimension in FilterDimension::ALL {
        match route(kind, dimension, capabilities) {
            FilterRoute::Local => {
                rule_config.set(dimension, rule_predicate(dimension));
                group_config.set(dimension, group_predicate(dimension));
            }
            FilterRoute::Remote => {
                rule_config.set(dimension, None);
                group_config.set(dimension, None);
                remote.push(dimension);
            }
            FilterRoute::Unsupported => {
                rule_config.set(dimension, None);
                group_config.set(dimension, None);
                if dimension.is_active(filter) {
                    unsupported.push(dimension);
                }
            }
        }
    }

    let backend_query_params = match kind {
        RuleSourceKind::Grafana => backend_params(&remote, context),
        RuleSourceKind::DataSource => BackendQueryParams::default(),
    };

    let plan = FilterPlan {
        kind,
        backend_query_params,
        rule_config,
        group_config,
        unsupported,
        has_invalid_data_source_names: context.has_invalid_data_source_names(),
    };
    tracing::debug!(
        kind = kind.as_str(),
        remote = ?remote,
        unsupported = ?plan.unsupported,
        client_side = plan.has_client_side_filters(filter),
        "planned rule filter"
    );
    plan
}

fn backend_params(remote: &[FilterDimension], context: &MatchContext) -> BackendQueryParams {
    let filter = context.filter();
    let mut params = BackendQueryParams::default();

    for dimension in remote {
        match dimension {
            FilterDimension::RuleState => params.state = filter.rule_state,
            FilterDimension::RuleHealth => params.health = filter.rule_health,
            FilterDimension::ContactPoint => params.contact_point = filter.contact_point.clone(),
            // Rule name and free-form words share the remote title search.
            FilterDimension::RuleName | FilterDimension::FreeFormWords => {
                params.title = build_title_search(filter)
            }
            FilterDimension::RuleType => params.rule_type = filter.rule_type,
            FilterDimension::DashboardUid => params.dashboard_uid = filter.dashboard_uid.clone(),
            FilterDimension::GroupName => params.group_name = filter.group_name.clone(),
            FilterDimension::DataSourceNames => {
                if let DataSourceIds::Resolved(ids) = context.data_source_ids() {
                    params.datasource_uids = ids.as_ref().clone();
                }
            }
            FilterDimension::Plugins => {
                params.hide_plugins = filter.plugins == Some(PluginsVisibility::Hide)
            }
            FilterDimension::RuleSource | FilterDimension::Namespace | FilterDimension::Labels => {}
        }
    }

    params
}
