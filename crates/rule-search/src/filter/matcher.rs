//! Label matchers (`name`, operator, `value`) used by the `label:` filter.

use regex::Regex;

use crate::error::{Result, RuleSearchError};
use crate::types::Labels;

/// Operators in match priority: two-character operators are tried before `=`.
const OPERATORS: [(&str, bool, bool); 4] = [
    ("=~", true, true),
    ("!~", true, false),
    ("!=", false, false),
    ("=", false, true),
];

#[derive(Debug, Clone)]
pub struct LabelMatcher {
    pub name: String,
    pub value: String,
    pub is_regex: bool,
    pub is_equal: bool,
    pattern: Option<Regex>,
}

impl PartialEq for LabelMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.value == other.value
            && self.is_regex == other.is_regex
            && self.is_equal == other.is_equal
    }
}

impl LabelMatcher {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        is_regex: bool,
        is_equal: bool,
    ) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        let pattern = if is_regex {
            // Anchored like Prometheus matchers.
            let anchored = format!("^(?:{value})$");
            Some(Regex::new(&anchored).map_err(|error| {
                RuleSearchError::InvalidMatcher(format!("{name}: {error}"))
            })?)
        } else {
            None
        };

        Ok(Self {
            name,
            value,
            is_regex,
            is_equal,
            pattern,
        })
    }

    /// Matches any value of the named label, as long as the label exists.
    pub fn any_value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ".*".to_string(),
            is_regex: true,
            is_equal: true,
            pattern: None,
        }
    }

    pub fn operator(&self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, is_regex, is_equal)| *is_regex == self.is_regex && *is_equal == self.is_equal)
            .map(|(operator, _, _)| *operator)
            .unwrap_or("=")
    }

    /// Tests a single label value; the label name is checked by the caller.
    pub fn matches_value(&self, candidate: &str) -> bool {
        let found = match (&self.pattern, self.is_regex) {
            (Some(pattern), _) => pattern.is_match(candidate),
            (None, true) => true,
            (None, false) => self.value == candidate,
        };
        found == self.is_equal
    }

    /// True when `labels` carries this label with a matching value.
    pub fn matches(&self, labels: &Labels) -> bool {
        labels
            .get(self.name.as_str())
            .is_some_and(|value| self.matches_value(value))
    }
}

/// Parses `name<op>value`, e.g. `team=ops`, `env!~dev|test`, `region="emea"`.
pub fn parse_matcher(raw: &str) -> Result<LabelMatcher> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Err(RuleSearchError::InvalidMatcher(format!(
            "matcher must not be wrapped in braces: {trimmed}"
        )));
    }

    let (position, (operator, is_regex, is_equal)) = find_operator(trimmed).ok_or_else(|| {
        RuleSearchError::InvalidMatcher(format!("no operator found in {trimmed}"))
    })?;

    let name = trimmed[..position].trim();
    if name.is_empty() {
        return Err(RuleSearchError::InvalidMatcher(format!(
            "missing label name in {trimmed}"
        )));
    }
    let value = unquote(trimmed[position + operator.len()..].trim());

    LabelMatcher::new(name, value, is_regex, is_equal)
}

/// Like [`parse_matcher`] but never fails: anything unparseable matches every
/// value of a label named after the whole input.
pub fn parse_matcher_loose(raw: &str) -> LabelMatcher {
    parse_matcher(raw).unwrap_or_else(|error| {
        tracing::trace!(raw, %error, "label filter degraded to match-any");
        LabelMatcher::any_value(raw.trim())
    })
}

/// Every matcher must be satisfied by `labels`.
pub fn labels_match_matchers(labels: &Labels, matchers: &[LabelMatcher]) -> bool {
    matchers.iter().all(|matcher| matcher.matches(labels))
}

fn find_operator(input: &str) -> Option<(usize, (&'static str, bool, bool))> {
    input.char_indices().find_map(|(index, _)| {
        let rest = &input[index..];
        OPERATORS
            .iter()
            .find(|(operator, _, _)| rest.starts_with(operator))
            .map(|found| (index, *found))
    })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn parses_all_operators() {
        let equal = parse_matcher("team=ops").unwrap();
        assert_eq!((equal.is_regex, equal.is_equal), (false, true));
        assert_eq!(equal.operator(), "=");

        let not_equal = parse_matcher("team != ops").unwrap();
        assert_eq!(not_equal.name, "team");
        assert_eq!(not_equal.value, "ops");
        assert_eq!(not_equal.operator(), "!=");

        let regex = parse_matcher("env=~prod|staging").unwrap();
        assert_eq!(regex.operator(), "=~");

        let not_regex = parse_matcher("env!~dev.*").unwrap();
        assert_eq!(not_regex.operator(), "!~");
    }

    #[test]
    fn strips_value_quotes() {
        let matcher = parse_matcher(r#"region="emea""#).unwrap();
        assert_eq!(matcher.value, "emea");
    }

    #[test]
    fn rejects_braces_and_missing_parts() {
        assert!(parse_matcher("{team=ops}").is_err());
        assert!(parse_matcher("team").is_err());
        assert!(parse_matcher("=ops").is_err());
        assert!(parse_matcher("team=~[").is_err());
    }

    #[test]
    fn loose_parse_matches_any_value() {
        let matcher = parse_matcher_loose("team");
        assert!(matcher.matches(&labels(&[("team", "ops")])));
        assert!(matcher.matches(&labels(&[("team", "")])));
        assert!(!matcher.matches(&labels(&[("owner", "ops")])));
    }

    #[test]
    fn regex_is_anchored() {
        let matcher = parse_matcher("env=~prod").unwrap();
        assert!(matcher.matches(&labels(&[("env", "prod")])));
        assert!(!matcher.matches(&labels(&[("env", "preprod")])));
    }

    #[test]
    fn negative_matchers_require_the_label() {
        let matcher = parse_matcher("env!=prod").unwrap();
        assert!(matcher.matches(&labels(&[("env", "dev")])));
        assert!(!matcher.matches(&labels(&[("env", "prod")])));
        assert!(!matcher.matches(&labels(&[("team", "ops")])));
    }

    #[test]
    fn all_matchers_must_hold() {
        let matchers = vec![parse_matcher_loose("team"), parse_matcher_loose("region=emea")];
        assert!(labels_match_matchers(
            &labels(&[("team", "ops"), ("region", "emea")]),
            &matchers
        ));
        assert!(!labels_match_matchers(
            &labels(&[("team", "ops"), ("region", "apac")]),
            &matchers
        ));
    }
}
