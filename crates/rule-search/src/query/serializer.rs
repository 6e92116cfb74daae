//! Writes filter state back into a query string.
//!
//! Tokens already present in the base query are rewritten where they stand;
//! tokens whose field was cleared are dropped; new values are appended with
//! scalar filters first, then list filters, then free-form words.

use std::collections::{BTreeMap, VecDeque};

use crate::filter::RulesFilter;

use super::keys::{FilterKey, QueryProfile};
use super::tokenizer::{split_filter_key, tokenize, TokenKind};

/// One `type:value` pair of filter state. Repeated kinds are legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    pub kind: TokenKind,
    pub value: String,
}

impl FilterExpr {
    fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

const SCALAR_KEYS: [FilterKey; 10] = [
    FilterKey::Namespace,
    FilterKey::Group,
    FilterKey::Rule,
    FilterKey::State,
    FilterKey::Type,
    FilterKey::Health,
    FilterKey::Dashboard,
    FilterKey::Plugins,
    FilterKey::ContactPoint,
    FilterKey::Source,
];

/// Flattens filter state into expressions in append order.
pub fn filter_exprs(filter: &RulesFilter) -> Vec<FilterExpr> {
    let mut exprs = Vec::new();

    for key in SCALAR_KEYS {
        if let Some(value) = scalar_value(filter, key) {
            exprs.push(FilterExpr::new(TokenKind::Filter(key), value));
        }
    }
    exprs.extend(
        filter
            .data_source_names
            .iter()
            .map(|name| FilterExpr::new(TokenKind::Filter(FilterKey::DataSource), name.as_str())),
    );
    exprs.extend(
        filter
            .labels
            .iter()
            .map(|label| FilterExpr::new(TokenKind::Filter(FilterKey::Label), label.as_str())),
    );
    exprs.extend(
        filter
            .free_form_words
            .iter()
            .map(|word| FilterExpr::new(TokenKind::FreeForm, word.as_str())),
    );

    exprs.retain(|expr| !expr.value.trim().is_empty());
    exprs
}

fn scalar_value(filter: &RulesFilter, key: FilterKey) -> Option<String> {
    match key {
        FilterKey::Namespace => filter.namespace.clone(),
        FilterKey::Group => filter.group_name.clone(),
        FilterKey::Rule => filter.rule_name.clone(),
        FilterKey::State => filter.rule_state.map(|state| state.as_str().to_string()),
        FilterKey::Type => filter.rule_type.map(|rule_type| rule_type.as_str().to_string()),
        FilterKey::Health => filter.rule_health.map(|health| health.as_str().to_string()),
        FilterKey::Dashboard => filter.dashboard_uid.clone(),
        FilterKey::Plugins => filter.plugins.map(|plugins| plugins.as_str().to_string()),
        FilterKey::ContactPoint => filter.contact_point.clone(),
        FilterKey::Source => filter.rule_source.clone(),
        FilterKey::DataSource | FilterKey::Label => None,
    }
}

/// Rewrites `existing_query` so it expresses `filter`.
pub fn serialize_filter(existing_query: &str, filter: &RulesFilter, profile: &QueryProfile) -> String {
    let exprs = filter_exprs(filter);

    let mut pending: BTreeMap<TokenKind, VecDeque<&str>> = BTreeMap::new();
    for expr in &exprs {
        pending
            .entry(expr.kind)
            .or_default()
            .push_back(expr.value.as_str());
    }

    let mut rendered = Vec::new();
    for token in tokenize(existing_query, profile) {
        let Some(value) = pending
            .get_mut(&token.kind())
            .and_then(|queue| queue.pop_front())
        else {
            continue;
        };
        rendered.push(render_token(token.kind(), token.keyword(), value, profile));
    }

    for expr in &exprs {
        if let Some(value) = pending
            .get_mut(&expr.kind)
            .and_then(|queue| queue.pop_front())
        {
            rendered.push(render_token(expr.kind, None, value, profile));
        }
    }

    rendered.join(" ")
}

fn render_token(
    kind: TokenKind,
    keyword: Option<&str>,
    value: &str,
    profile: &QueryProfile,
) -> String {
    // Quotes cannot be escaped, so they never survive a round trip.
    let value: String = value.chars().filter(|ch| *ch != '"').collect();

    match kind {
        TokenKind::Filter(key) => {
            let keyword = keyword.unwrap_or_else(|| profile.keyword_for(key));
            format!("{keyword}:{}", quote_if_needed(value.as_str()))
        }
        TokenKind::FreeForm => {
            let reads_as_filter = split_filter_key(value.as_str())
                .and_then(|(keyword, _)| profile.lookup(keyword))
                .is_some();
            if reads_as_filter {
                format!("\"{value}\"")
            } else {
                quote_if_needed(value.as_str())
            }
        }
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;
    use crate::types::{RuleState, RuleType};

    fn parse(query: &str) -> RulesFilter {
        parse_query(query, &QueryProfile::default()).unwrap()
    }

    fn serialize(base: &str, filter: &RulesFilter) -> String {
        serialize_filter(base, filter, &QueryProfile::default())
    }

    #[test]
    fn quoted_rule_name_from_empty_base() {
        let filter = parse(r#"rule:"cpu > 80%""#);
        assert_eq!(serialize("", &filter), r#"rule:"cpu > 80%""#);
    }

    #[test]
    fn round_trip_is_stable() {
        let queries = [
            "",
            "cpu",
            "label:team label:region=emea",
            r#"rule:"cpu > 80%" disk ns:prod"#,
            r#"ds:prom datasource:"my loki" state:normal type:alerting"#,
            "health:error dashboard:abc plugins:hide contactPoint:oncall source:grafana",
            r#"g:"node exporter" "high load" folder:x r:latency"#,
            "state:firing state:bogus rule:a rule:b l:x",
            r#""ds:literal" words"#,
        ];

        for query in queries {
            let parsed = parse(query);
            let serialized = serialize(query, &parsed);
            assert_eq!(parse(&serialized), parsed, "query {query:?} -> {serialized:?}");

            let fresh = serialize("", &parsed);
            assert_eq!(parse(&fresh), parsed, "query {query:?} -> {fresh:?}");
        }
    }

    #[test]
    fn updating_one_field_keeps_other_positions() {
        let base = "cpu ns:prod label:team=ops state:firing disk";
        let mut filter = parse(base);
        filter.rule_state = Some(RuleState::Pending);
        assert_eq!(
            serialize(base, &filter),
            "cpu ns:prod label:team=ops state:pending disk"
        );
    }

    #[test]
    fn cleared_fields_are_dropped() {
        let base = "cpu ns:prod label:a label:b";
        let mut filter = parse(base);
        filter.namespace = None;
        filter.labels.truncate(1);
        assert_eq!(serialize(base, &filter), "cpu label:a");
    }

    #[test]
    fn preserves_keyword_spelling_on_rewrite() {
        let base = "ns:prod";
        let mut filter = parse(base);
        filter.namespace = Some("staging".to_string());
        assert_eq!(serialize(base, &filter), "ns:staging");
    }

    #[test]
    fn new_fields_append_scalars_then_lists_then_words() {
        let filter = RulesFilter {
            free_form_words: vec!["disk".to_string()],
            labels: vec!["team=ops".to_string()],
            data_source_names: vec!["prom".to_string()],
            rule_type: Some(RuleType::Alerting),
            namespace: Some("prod".to_string()),
            ..RulesFilter::default()
        };
        assert_eq!(
            serialize("", &filter),
            "namespace:prod type:alerting datasource:prom label:team=ops disk"
        );
    }

    #[test]
    fn extra_list_values_append_after_existing() {
        let base = "label:a cpu";
        let mut filter = parse(base);
        filter.labels.push("b".to_string());
        assert_eq!(serialize(base, &filter), "label:a cpu label:b");
    }

    #[test]
    fn free_form_word_that_looks_like_filter_is_quoted() {
        let filter = RulesFilter {
            free_form_words: vec!["ns:prod".to_string()],
            ..RulesFilter::default()
        };
        let serialized = serialize("", &filter);
        assert_eq!(serialized, r#""ns:prod""#);
        assert_eq!(parse(&serialized), filter);
    }

    #[test]
    fn short_alias_only_profile_writes_aliases() {
        let profile = QueryProfile::new([FilterKey::Rule], [crate::query::Dialect::ShortAlias]);
        let filter = RulesFilter {
            rule_name: Some("cpu".to_string()),
            ..RulesFilter::default()
        };
        assert_eq!(serialize_filter("", &filter, &profile), "r:cpu");
    }
}
