//! Per-dimension predicates and their AND composition.
//!
//! Predicates are plain functions of a rule (or group) and a [`MatchContext`].
//! A [`PredicateConfig`] decides which of them run locally; the planner leaves
//! a slot empty when the remote side already applied that dimension.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{Rule, RuleGroup, DASHBOARD_UID_ANNOTATION};

use super::datasource::DataSourceNameResolver;
use super::fuzzy::fuzzy_matches;
use super::matcher::{labels_match_matchers, parse_matcher_loose, LabelMatcher};
use super::state::{normalize_filter, FilterDimension, PluginsVisibility, RulesFilter};

pub type Predicate<T> = fn(&T, &MatchContext) -> bool;

/// Outcome of resolving the filter's data-source names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceIds {
    /// No `datasource:` filter is set.
    Unused,
    Resolved(Arc<Vec<String>>),
    /// The lookup failed; the data-source predicate rejects every rule.
    Failed,
}

/// Everything the predicates need, computed once per search.
#[derive(Debug, Clone)]
pub struct MatchContext {
    filter: RulesFilter,
    label_matchers: Vec<LabelMatcher>,
    free_form_needle: String,
    data_source_ids: DataSourceIds,
}

impl MatchContext {
    /// Normalizes `filter`, compiles its label matchers and resolves its
    /// data-source names.
    pub fn new(filter: &RulesFilter, resolver: &DataSourceNameResolver) -> Self {
        let filter = normalize_filter(filter);
        let data_source_ids = if filter.data_source_names.is_empty() {
            DataSourceIds::Unused
        } else {
            match resolver.resolve(&filter.data_source_names) {
                Ok(ids) => DataSourceIds::Resolved(ids),
                Err(_) => DataSourceIds::Failed,
            }
        };
        Self::with_data_source_ids(filter, data_source_ids)
    }

    /// Builds a context from an already normalized filter.
    pub fn with_data_source_ids(filter: RulesFilter, data_source_ids: DataSourceIds) -> Self {
        let label_matchers = filter
            .labels
            .iter()
            .map(|raw| parse_matcher_loose(raw))
            .collect();
        let free_form_needle = filter.free_form_words.join(" ");

        Self {
            filter,
            label_matchers,
            free_form_needle,
            data_source_ids,
        }
    }

    /// The normalized filter.
    pub fn filter(&self) -> &RulesFilter {
        &self.filter
    }

    pub fn label_matchers(&self) -> &[LabelMatcher] {
        &self.label_matchers
    }

    pub fn data_source_ids(&self) -> &DataSourceIds {
        &self.data_source_ids
    }

    /// True when names were given but none of them could be resolved.
    pub fn has_invalid_data_source_names(&self) -> bool {
        match &self.data_source_ids {
            DataSourceIds::Unused => false,
            DataSourceIds::Resolved(ids) => ids.is_empty(),
            DataSourceIds::Failed => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Predicate configuration
// ---------------------------------------------------------------------------

/// Dimension → predicate table. `None` (or a missing dimension) means the
/// dimension is not checked locally.
#[derive(Debug, Clone)]
pub struct PredicateConfig<T> {
    slots: BTreeMap<FilterDimension, Option<Predicate<T>>>,
}

impl<T> Default for PredicateConfig<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<T> PredicateConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, dimension: FilterDimension, predicate: Option<Predicate<T>>) {
        self.slots.insert(dimension, predicate);
    }

    pub fn get(&self, dimension: FilterDimension) -> Option<Predicate<T>> {
        self.slots.get(&dimension).copied().flatten()
    }

    pub fn is_local(&self, dimension: FilterDimension) -> bool {
        self.get(dimension).is_some()
    }

    /// Slots in canonical evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterDimension, Option<Predicate<T>>)> + '_ {
        self.slots
            .iter()
            .map(|(dimension, predicate)| (*dimension, *predicate))
    }
}

impl PredicateConfig<Rule> {
    /// Every rule-level dimension evaluated locally.
    pub fn all_rules() -> Self {
        let mut config = Self::new();
        for dimension in FilterDimension::ALL {
            config.set(dimension, rule_predicate(dimension));
        }
        config
    }
}

impl PredicateConfig<RuleGroup> {
    /// Every group-level dimension evaluated locally.
    pub fn all_groups() -> Self {
        let mut config = Self::new();
        for dimension in FilterDimension::ALL {
            config.set(dimension, group_predicate(dimension));
        }
        config
    }
}

/// The local predicate for a rule-level dimension.
///
/// Group-level dimensions and the rule source (applied by source selection)
/// have none.
pub fn rule_predicate(dimension: FilterDimension) -> Option<Predicate<Rule>> {
    let predicate: Predicate<Rule> = match dimension {
        FilterDimension::FreeFormWords => free_form_words_matches,
        FilterDimension::RuleName => rule_name_matches,
        FilterDimension::Labels => labels_match,
        FilterDimension::RuleState => rule_state_matches,
        FilterDimension::RuleType => rule_type_matches,
        FilterDimension::RuleHealth => rule_health_matches,
        FilterDimension::DashboardUid => dashboard_uid_matches,
        FilterDimension::Plugins => plugins_match,
        FilterDimension::ContactPoint => contact_point_matches,
        FilterDimension::DataSourceNames => data_source_names_match,
        FilterDimension::RuleSource | FilterDimension::Namespace | FilterDimension::GroupName => {
            return None
        }
    };
    Some(predicate)
}

pub fn group_predicate(dimension: FilterDimension) -> Option<Predicate<RuleGroup>> {
    let predicate: Predicate<RuleGroup> = match dimension {
        FilterDimension::Namespace => namespace_matches,
        FilterDimension::GroupName => group_name_matches,
        _ => return None,
    };
    Some(predicate)
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// AND of every configured predicate whose dimension is set in the filter.
/// Evaluation stops at the first failure.
pub fn rule_matches(rule: &Rule, context: &MatchContext, config: &PredicateConfig<Rule>) -> bool {
    matches_all(rule, context, config)
}

pub fn group_matches(
    group: &RuleGroup,
    context: &MatchContext,
    config: &PredicateConfig<RuleGroup>,
) -> bool {
    matches_all(group, context, config)
}

fn matches_all<T>(item: &T, context: &MatchContext, config: &PredicateConfig<T>) -> bool {
    config.iter().all(|(dimension, predicate)| {
        if !dimension.is_active(&context.filter) {
            return true;
        }
        predicate.map_or(true, |predicate| predicate(item, context))
    })
}

// ---------------------------------------------------------------------------
// Rule predicates
// ---------------------------------------------------------------------------

fn free_form_words_matches(rule: &Rule, context: &MatchContext) -> bool {
    fuzzy_matches(rule.name(), &context.free_form_needle)
}

fn rule_name_matches(rule: &Rule, context: &MatchContext) -> bool {
    context
        .filter
        .rule_name
        .as_deref()
        .map_or(true, |needle| fuzzy_matches(rule.name(), needle))
}

/// Rule labels, or the labels of any one live instance, must satisfy every
/// matcher.
fn labels_match(rule: &Rule, context: &MatchContext) -> bool {
    let matchers = context.label_matchers.as_slice();
    if labels_match_matchers(rule.labels(), matchers) {
        return true;
    }
    rule.as_alerting().is_some_and(|alerting| {
        alerting
            .alerts
            .iter()
            .any(|instance| labels_match_matchers(&instance.labels, matchers))
    })
}

fn rule_state_matches(rule: &Rule, context: &MatchContext) -> bool {
    rule.as_alerting()
        .is_some_and(|alerting| context.filter.rule_state == Some(alerting.state))
}

fn rule_type_matches(rule: &Rule, context: &MatchContext) -> bool {
    context.filter.rule_type == Some(rule.rule_type())
}

fn rule_health_matches(rule: &Rule, context: &MatchContext) -> bool {
    context.filter.rule_health == Some(rule.health())
}

fn dashboard_uid_matches(rule: &Rule, context: &MatchContext) -> bool {
    let Some(expected) = context.filter.dashboard_uid.as_deref() else {
        return true;
    };
    rule.as_alerting().is_some_and(|alerting| {
        alerting
            .annotations
            .get(DASHBOARD_UID_ANNOTATION)
            .is_some_and(|uid| uid == expected)
    })
}

fn plugins_match(rule: &Rule, context: &MatchContext) -> bool {
    match context.filter.plugins {
        Some(PluginsVisibility::Hide) => !rule.is_plugin_provided(),
        Some(PluginsVisibility::Show) | None => true,
    }
}

fn contact_point_matches(rule: &Rule, context: &MatchContext) -> bool {
    let Some(expected) = context.filter.contact_point.as_deref() else {
        return true;
    };
    rule.grafana()
        .and_then(|meta| meta.contact_point.as_deref())
        .is_some_and(|contact_point| contact_point == expected)
}

fn data_source_names_match(rule: &Rule, context: &MatchContext) -> bool {
    let ids = match &context.data_source_ids {
        DataSourceIds::Unused => return true,
        DataSourceIds::Failed => return false,
        DataSourceIds::Resolved(ids) => ids,
    };
    rule.grafana().is_some_and(|meta| {
        meta.queried_datasource_uids
            .iter()
            .any(|uid| ids.contains(uid))
    })
}

// ---------------------------------------------------------------------------
// Group predicates
// ---------------------------------------------------------------------------

fn namespace_matches(group: &RuleGroup, context: &MatchContext) -> bool {
    context
        .filter
        .namespace
        .as_deref()
        .map_or(true, |needle| fuzzy_matches(&group.file, needle))
}

fn group_name_matches(group: &RuleGroup, context: &MatchContext) -> bool {
    context
        .filter
        .group_name
        .as_deref()
        .map_or(true, |needle| fuzzy_matches(&group.name, needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse_query, QueryProfile};
    use crate::testing::{alerting, grafana_meta, group, instance, recording};
    use crate::types::{RuleHealth, RuleState, RuleType, ORIGIN_LABEL};

    fn context(filter: RulesFilter) -> MatchContext {
        MatchContext::with_data_source_ids(normalize_filter(&filter), DataSourceIds::Unused)
    }

    fn query_context(query: &str) -> MatchContext {
        context(parse_query(query, &QueryProfile::default()).unwrap())
    }

    fn matches(rule: &Rule, context: &MatchContext) -> bool {
        rule_matches(rule, context, &PredicateConfig::all_rules())
    }

    #[test]
    fn label_scenario() {
        let context = query_context("label:team label:region=emea");
        assert_eq!(context.filter().labels, vec!["team", "region=emea"]);

        let emea = Rule::Alerting(alerting(
            "HighCPU",
            &[("team", "ops"), ("region", "emea")],
            RuleState::Firing,
        ));
        let apac = Rule::Alerting(alerting(
            "HighCPU",
            &[("team", "ops"), ("region", "apac")],
            RuleState::Firing,
        ));
        assert!(matches(&emea, &context));
        assert!(!matches(&apac, &context));
    }

    #[test]
    fn instance_labels_are_ored_with_rule_labels() {
        let context = query_context("label:region=emea label:team=ops");

        let mut rule = alerting("HighCPU", &[("team", "ops")], RuleState::Firing);
        rule.alerts = vec![
            instance(&[("region", "apac"), ("team", "ops")]),
            instance(&[("region", "emea"), ("team", "ops")]),
        ];
        assert!(matches(&Rule::Alerting(rule.clone()), &context));

        // Matchers split across two instances do not combine.
        rule.alerts = vec![instance(&[("region", "emea")]), instance(&[("team", "ops")])];
        assert!(!matches(&Rule::Alerting(rule), &context));
    }

    #[test]
    fn recording_rules_fail_state_and_dashboard_filters() {
        let rule = Rule::Recording(recording("requests:rate5m", &[]));

        let state = context(RulesFilter {
            rule_state: Some(RuleState::Firing),
            rule_name: Some("requests".to_string()),
            ..RulesFilter::default()
        });
        assert!(!matches(&rule, &state));

        let dashboard = context(RulesFilter {
            dashboard_uid: Some("x".to_string()),
            rule_type: Some(RuleType::Recording),
            ..RulesFilter::default()
        });
        assert!(!matches(&rule, &dashboard));
    }

    #[test]
    fn dashboard_annotation_must_match() {
        let mut rule = alerting("HighCPU", &[], RuleState::Firing);
        let context = context(RulesFilter {
            dashboard_uid: Some("x".to_string()),
            ..RulesFilter::default()
        });
        assert!(!matches(&Rule::Alerting(rule.clone()), &context));

        rule.annotations
            .insert(DASHBOARD_UID_ANNOTATION.to_string(), "x".to_string());
        assert!(matches(&Rule::Alerting(rule), &context));
    }

    #[test]
    fn legacy_health_spelling_matches_error() {
        let mut rule = alerting("HighCPU", &[], RuleState::Firing);
        rule.health = "err".to_string();
        let context = context(RulesFilter {
            rule_health: Some(RuleHealth::Error),
            ..RulesFilter::default()
        });
        assert!(matches(&Rule::Alerting(rule), &context));
    }

    #[test]
    fn composition_is_a_logical_and() {
        let rule = Rule::Alerting(alerting("HighCPU", &[("team", "ops")], RuleState::Firing));
        let by_state = RulesFilter {
            rule_state: Some(RuleState::Firing),
            ..RulesFilter::default()
        };
        let by_label = RulesFilter {
            labels: vec!["team=ops".to_string()],
            ..RulesFilter::default()
        };
        let by_wrong_label = RulesFilter {
            labels: vec!["team=db".to_string()],
            ..RulesFilter::default()
        };

        assert!(matches(&rule, &context(by_state.clone())));
        assert!(matches(&rule, &context(by_label.clone())));
        assert!(!matches(&rule, &context(by_wrong_label.clone())));

        let both = RulesFilter {
            labels: by_label.labels.clone(),
            ..by_state.clone()
        };
        assert!(matches(&rule, &context(both)));

        let one_failing = RulesFilter {
            labels: by_wrong_label.labels,
            ..by_state
        };
        assert!(!matches(&rule, &context(one_failing)));
    }

    #[test]
    fn empty_slots_are_skipped() {
        let rule = Rule::Recording(recording("requests:rate5m", &[]));
        let context = context(RulesFilter {
            rule_state: Some(RuleState::Firing),
            ..RulesFilter::default()
        });

        let mut config = PredicateConfig::all_rules();
        assert!(!rule_matches(&rule, &context, &config));

        config.set(FilterDimension::RuleState, None);
        assert!(rule_matches(&rule, &context, &config));
        assert!(rule_matches(&rule, &context, &PredicateConfig::new()));
    }

    #[test]
    fn free_form_and_rule_name_use_fuzzy_matching() {
        let rule = Rule::Alerting(alerting("High CPU usage", &[], RuleState::Firing));
        assert!(matches(&rule, &query_context("USAGE cpu")));
        assert!(matches(&rule, &query_context("rule:\"hihg cpu\"")));
        assert!(!matches(&rule, &query_context("memory")));
    }

    #[test]
    fn plugin_rules_are_hidden_on_request() {
        let plugin = Rule::Alerting(alerting(
            "SLO burn",
            &[(ORIGIN_LABEL, "plugin/grafana-slo-app")],
            RuleState::Inactive,
        ));
        let own = Rule::Alerting(alerting("SLO burn", &[], RuleState::Inactive));

        let hide = query_context("plugins:hide");
        assert!(!matches(&plugin, &hide));
        assert!(matches(&own, &hide));
        assert!(matches(&plugin, &query_context("plugins:show")));
    }

    #[test]
    fn contact_point_comes_from_rule_metadata() {
        let mut rule = alerting("HighCPU", &[], RuleState::Firing);
        let context = query_context("contactPoint:oncall");
        assert!(!matches(&Rule::Alerting(rule.clone()), &context));

        let mut meta = grafana_meta("rule-1", &[]);
        meta.contact_point = Some("oncall".to_string());
        rule.grafana = Some(meta);
        assert!(matches(&Rule::Alerting(rule), &context));
    }

    #[test]
    fn data_source_filter_requires_overlap_and_fails_closed() {
        let filter = RulesFilter {
            data_source_names: vec!["prom".to_string()],
            ..RulesFilter::default()
        };
        let mut rule = alerting("HighCPU", &[], RuleState::Firing);
        rule.grafana = Some(grafana_meta("rule-1", &["uid-prom", "uid-loki"]));
        let rule = Rule::Alerting(rule);

        let resolved = MatchContext::with_data_source_ids(
            filter.clone(),
            DataSourceIds::Resolved(Arc::new(vec!["uid-prom".to_string()])),
        );
        assert!(matches(&rule, &resolved));

        let other = MatchContext::with_data_source_ids(
            filter.clone(),
            DataSourceIds::Resolved(Arc::new(vec!["uid-mimir".to_string()])),
        );
        assert!(!matches(&rule, &other));

        let failed = MatchContext::with_data_source_ids(filter, DataSourceIds::Failed);
        assert!(failed.has_invalid_data_source_names());
        assert!(!matches(&rule, &failed));

        let without_meta = Rule::Alerting(alerting("HighCPU", &[], RuleState::Firing));
        assert!(!matches(&without_meta, &resolved));
    }

    #[test]
    fn namespace_filter_excludes_group() {
        let production = group(
            "cpu",
            "production/alerts",
            vec![Rule::Alerting(alerting("HighCPU", &[], RuleState::Firing))],
        );
        let groups = PredicateConfig::all_groups();

        assert!(!group_matches(&production, &query_context("namespace:staging"), &groups));
        assert!(group_matches(&production, &query_context("ns:PRODUCTION"), &groups));
        assert!(group_matches(&production, &query_context("g:cpu"), &groups));
        assert!(!group_matches(&production, &query_context("g:memory"), &groups));
    }
}
