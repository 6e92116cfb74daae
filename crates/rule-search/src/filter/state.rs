//! The filter-state aggregate and its normalization.

use serde::{Deserialize, Serialize};

use crate::query::FilterKey;
use crate::types::{RuleHealth, RuleState, RuleType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginsVisibility {
    Show,
    Hide,
}

impl PluginsVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Hide => "hide",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "show" => Some(Self::Show),
            "hide" => Some(Self::Hide),
            _ => None,
        }
    }
}

/// Search filter state, one field per filter dimension.
///
/// List fields are empty rather than absent; scalar fields are `None` rather
/// than empty strings. Every transform returns a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesFilter {
    pub free_form_words: Vec<String>,
    pub data_source_names: Vec<String>,
    pub labels: Vec<String>,
    pub namespace: Option<String>,
    pub group_name: Option<String>,
    pub rule_name: Option<String>,
    pub rule_state: Option<RuleState>,
    pub rule_type: Option<RuleType>,
    pub rule_health: Option<RuleHealth>,
    pub dashboard_uid: Option<String>,
    pub plugins: Option<PluginsVisibility>,
    pub contact_point: Option<String>,
    pub rule_source: Option<String>,
}

impl RulesFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        FilterDimension::ALL
            .iter()
            .all(|dimension| !dimension.is_active(self))
    }

    /// Dimensions with a value set, in canonical evaluation order.
    pub fn active_dimensions(&self) -> Vec<FilterDimension> {
        FilterDimension::ALL
            .into_iter()
            .filter(|dimension| dimension.is_active(self))
            .collect()
    }
}

/// Lower-cases the text fields matched by name so every predicate and the
/// remote title search observe the same case-folded view.
///
/// Labels, enum fields, and data-source names are left untouched: label
/// values are compared case-sensitively against rule labels.
pub fn normalize_filter(filter: &RulesFilter) -> RulesFilter {
    RulesFilter {
        free_form_words: filter
            .free_form_words
            .iter()
            .map(|word| word.to_lowercase())
            .collect(),
        namespace: filter.namespace.as_ref().map(|value| value.to_lowercase()),
        group_name: filter.group_name.as_ref().map(|value| value.to_lowercase()),
        rule_name: filter.rule_name.as_ref().map(|value| value.to_lowercase()),
        ..filter.clone()
    }
}

/// Builds the remote title search term: the rule name followed by the
/// free-form words, single-space separated.
pub fn build_title_search(filter: &RulesFilter) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(rule_name) = filter.rule_name.as_deref() {
        let trimmed = rule_name.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.extend(
        filter
            .free_form_words
            .iter()
            .map(|word| word.trim())
            .filter(|word| !word.is_empty()),
    );

    let title = parts.join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

// ---------------------------------------------------------------------------
// Filter dimensions
// ---------------------------------------------------------------------------

/// A field of [`RulesFilter`], ordered by evaluation cost.
///
/// Cheap equality checks come first; fuzzy name matching, data-source overlap
/// and label matchers (regex) run last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterDimension {
    RuleSource,
    RuleType,
    RuleState,
    RuleHealth,
    Plugins,
    DashboardUid,
    ContactPoint,
    Namespace,
    GroupName,
    RuleName,
    FreeFormWords,
    DataSourceNames,
    Labels,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 13] = [
        FilterDimension::RuleSource,
        FilterDimension::RuleType,
        FilterDimension::RuleState,
        FilterDimension::RuleHealth,
        FilterDimension::Plugins,
        FilterDimension::DashboardUid,
        FilterDimension::ContactPoint,
        FilterDimension::Namespace,
        FilterDimension::GroupName,
        FilterDimension::RuleName,
        FilterDimension::FreeFormWords,
        FilterDimension::DataSourceNames,
        FilterDimension::Labels,
    ];

    pub fn is_active(self, filter: &RulesFilter) -> bool {
        match self {
            Self::RuleSource => filter.rule_source.is_some(),
            Self::RuleType => filter.rule_type.is_some(),
            Self::RuleState => filter.rule_state.is_some(),
            Self::RuleHealth => filter.rule_health.is_some(),
            Self::Plugins => filter.plugins.is_some(),
            Self::DashboardUid => filter.dashboard_uid.is_some(),
            Self::ContactPoint => filter.contact_point.is_some(),
            Self::Namespace => filter.namespace.is_some(),
            Self::GroupName => filter.group_name.is_some(),
            Self::RuleName => filter.rule_name.is_some(),
            Self::FreeFormWords => !filter.free_form_words.is_empty(),
            Self::DataSourceNames => !filter.data_source_names.is_empty(),
            Self::Labels => !filter.labels.is_empty(),
        }
    }
}

impl From<FilterKey> for FilterDimension {
    fn from(key: FilterKey) -> Self {
        match key {
            FilterKey::DataSource => Self::DataSourceNames,
            FilterKey::Namespace => Self::Namespace,
            FilterKey::Label => Self::Labels,
            FilterKey::Group => Self::GroupName,
            FilterKey::Rule => Self::RuleName,
            FilterKey::State => Self::RuleState,
            FilterKey::Type => Self::RuleType,
            FilterKey::Health => Self::RuleHealth,
            FilterKey::Dashboard => Self::DashboardUid,
            FilterKey::Plugins => Self::Plugins,
            FilterKey::ContactPoint => Self::ContactPoint,
            FilterKey::Source => Self::RuleSource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RulesFilter {
        RulesFilter {
            free_form_words: vec!["High".to_string(), " CPU ".to_string()],
            labels: vec!["Team=Ops".to_string()],
            data_source_names: vec!["Prometheus".to_string()],
            namespace: Some("Production".to_string()),
            group_name: Some("Node".to_string()),
            rule_name: Some("DiskFull".to_string()),
            ..RulesFilter::default()
        }
    }

    #[test]
    fn normalize_lowercases_name_fields_only() {
        let normalized = normalize_filter(&sample());
        assert_eq!(normalized.free_form_words, vec!["high", " cpu "]);
        assert_eq!(normalized.namespace.as_deref(), Some("production"));
        assert_eq!(normalized.group_name.as_deref(), Some("node"));
        assert_eq!(normalized.rule_name.as_deref(), Some("diskfull"));
        assert_eq!(normalized.labels, vec!["Team=Ops"]);
        assert_eq!(normalized.data_source_names, vec!["Prometheus"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_filter(&sample());
        let twice = normalize_filter(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn title_search_joins_rule_name_and_words() {
        let filter = normalize_filter(&sample());
        assert_eq!(
            build_title_search(&filter).as_deref(),
            Some("diskfull high cpu")
        );
    }

    #[test]
    fn title_search_is_none_when_blank() {
        let filter = RulesFilter {
            free_form_words: vec!["  ".to_string()],
            rule_name: Some(" ".to_string()),
            ..RulesFilter::default()
        };
        assert_eq!(build_title_search(&filter), None);
    }

    #[test]
    fn empty_filter_has_no_active_dimensions() {
        assert!(RulesFilter::new().is_empty());
        assert!(RulesFilter::new().active_dimensions().is_empty());

        let filter = RulesFilter {
            rule_type: Some(RuleType::Recording),
            labels: vec!["a=b".to_string()],
            ..RulesFilter::default()
        };
        assert_eq!(
            filter.active_dimensions(),
            vec![FilterDimension::RuleType, FilterDimension::Labels]
        );
    }
}
