//! Builds a [`RulesFilter`] from query tokens.

use crate::error::Result;
use crate::filter::{PluginsVisibility, RulesFilter};
use crate::types::{RuleHealth, RuleState, RuleType};

use super::keys::{FilterKey, QueryProfile};
use super::tokenizer::{tokenize, QueryToken, TokenKind};

/// Parses a query string into filter state.
///
/// Malformed input never fails: unknown keys become free-form words and
/// unrecognized enum values are ignored. An error means a token reached a
/// term builder of the wrong grammar rule.
pub fn parse_query(query: &str, profile: &QueryProfile) -> Result<RulesFilter> {
    let tokens = tokenize(query, profile);
    filter_from_tokens(&tokens)
}

/// Folds tokens into filter state in encounter order.
pub fn filter_from_tokens(tokens: &[QueryToken]) -> Result<RulesFilter> {
    let mut filter = RulesFilter::default();
    for token in tokens {
        apply_token(&mut filter, token)?;
    }
    Ok(filter)
}

fn apply_token(filter: &mut RulesFilter, token: &QueryToken) -> Result<()> {
    let key = match token.kind() {
        TokenKind::FreeForm => {
            filter
                .free_form_words
                .push(token.free_form_value()?.to_string());
            return Ok(());
        }
        TokenKind::Filter(key) => key,
    };

    match key {
        FilterKey::DataSource => filter
            .data_source_names
            .push(token.filter_value(key)?.to_string()),
        FilterKey::Label => filter.labels.push(token.filter_value(key)?.to_string()),
        FilterKey::Namespace => filter.namespace = Some(token.filter_value(key)?.to_string()),
        FilterKey::Group => filter.group_name = Some(token.filter_value(key)?.to_string()),
        FilterKey::Rule => filter.rule_name = Some(token.filter_value(key)?.to_string()),
        FilterKey::Dashboard => {
            filter.dashboard_uid = Some(token.filter_value(key)?.to_string())
        }
        FilterKey::ContactPoint => {
            filter.contact_point = Some(token.filter_value(key)?.to_string())
        }
        FilterKey::Source => filter.rule_source = Some(token.filter_value(key)?.to_string()),
        FilterKey::State => {
            if let Some(state) = state_term(token)? {
                filter.rule_state = Some(state);
            }
        }
        FilterKey::Type => {
            if let Some(rule_type) = type_term(token)? {
                filter.rule_type = Some(rule_type);
            }
        }
        FilterKey::Health => {
            if let Some(health) = health_term(token)? {
                filter.rule_health = Some(health);
            }
        }
        FilterKey::Plugins => {
            if let Some(plugins) = plugins_term(token)? {
                filter.plugins = Some(plugins);
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Enum term builders
// ---------------------------------------------------------------------------

pub fn state_term(token: &QueryToken) -> Result<Option<RuleState>> {
    let value = token.filter_value(FilterKey::State)?;
    Ok(ignore_unknown(FilterKey::State, value, RuleState::parse(value)))
}

pub fn type_term(token: &QueryToken) -> Result<Option<RuleType>> {
    let value = token.filter_value(FilterKey::Type)?;
    Ok(ignore_unknown(FilterKey::Type, value, RuleType::parse(value)))
}

pub fn health_term(token: &QueryToken) -> Result<Option<RuleHealth>> {
    let value = token.filter_value(FilterKey::Health)?;
    Ok(ignore_unknown(FilterKey::Health, value, RuleHealth::parse(value)))
}

pub fn plugins_term(token: &QueryToken) -> Result<Option<PluginsVisibility>> {
    let value = token.filter_value(FilterKey::Plugins)?;
    Ok(ignore_unknown(
        FilterKey::Plugins,
        value,
        PluginsVisibility::parse(value),
    ))
}

fn ignore_unknown<T>(key: FilterKey, value: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        tracing::debug!(key = key.full_keyword(), value, "ignoring unrecognized filter value");
    }
    parsed
}
