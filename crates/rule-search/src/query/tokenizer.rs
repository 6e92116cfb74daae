//! Query tokenizer.
//!
//! A token is either `key:value` or a bare word. Double quotes group
//! whitespace into a single token and are stripped from the value; there is
//! no escape syntax.

use crate::error::{Result, RuleSearchError};

use super::keys::{FilterKey, QueryProfile};

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Filter(FilterKey),
    FreeForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryToken {
    kind: TokenKind,
    /// Keyword exactly as written, kept so rewrites preserve the user's spelling.
    keyword: Option<String>,
    value: String,
}

impl QueryToken {
    pub fn filter(key: FilterKey, keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Filter(key),
            keyword: Some(keyword.into()),
            value: value.into(),
        }
    }

    pub fn free_form(value: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::FreeForm,
            keyword: None,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    /// Returns the value of a `key:value` token of the expected key.
    pub fn filter_value(&self, expected: FilterKey) -> Result<&str> {
        match self.kind {
            TokenKind::Filter(key) if key == expected => Ok(self.value.as_str()),
            other => Err(RuleSearchError::GrammarMismatch(format!(
                "expected a {} filter token, got {other:?}",
                expected.full_keyword()
            ))),
        }
    }

    /// Returns the text of a free-form token.
    pub fn free_form_value(&self) -> Result<&str> {
        match self.kind {
            TokenKind::FreeForm => Ok(self.value.as_str()),
            other => Err(RuleSearchError::GrammarMismatch(format!(
                "expected a free-form token, got {other:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Splits a query into tokens using the keys enabled in `profile`.
///
/// Never fails: unknown keys become free-form words and empty values are
/// dropped.
pub fn tokenize(input: &str, profile: &QueryProfile) -> Vec<QueryToken> {
    let mut tokens = Vec::new();
    let mut cursor = 0usize;

    while let Some(ch) = input[cursor..].chars().next() {
        if ch.is_whitespace() {
            cursor += ch.len_utf8();
            continue;
        }

        let end = scan_token_end(input, cursor);
        let raw = &input[cursor..end];
        match classify_token(raw, profile) {
            Some(token) => tokens.push(token),
            None => tracing::trace!(raw, "dropping empty query token"),
        }
        cursor = end;
    }

    tokens
}

/// Finds the end of the token starting at `start`; whitespace inside quotes
/// does not terminate it. An unterminated quote runs to the end of input.
fn scan_token_end(input: &str, start: usize) -> usize {
    let mut end = start;
    let mut in_quotes = false;

    for ch in input[start..].chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch.is_whitespace() && !in_quotes {
            break;
        }
        end += ch.len_utf8();
    }

    end
}

fn classify_token(raw: &str, profile: &QueryProfile) -> Option<QueryToken> {
    if let Some((keyword, rest)) = split_filter_key(raw) {
        if let Some(key) = profile.lookup(keyword) {
            let value = strip_quotes(rest);
            if value.trim().is_empty() {
                return None;
            }
            return Some(QueryToken::filter(key, keyword, value));
        }
    }

    let value = strip_quotes(raw);
    if value.trim().is_empty() {
        return None;
    }
    Some(QueryToken::free_form(value))
}

/// Splits `key:rest` when the prefix is a plain keyword. A token that opens
/// with a quote is never a filter.
pub(crate) fn split_filter_key(raw: &str) -> Option<(&str, &str)> {
    let colon = raw.find(':')?;
    let keyword = &raw[..colon];
    if keyword.is_empty() || !keyword.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }
    Some((keyword, &raw[colon + 1..]))
}

fn strip_quotes(raw: &str) -> String {
    raw.chars().filter(|ch| *ch != '"').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[QueryToken]) -> Vec<TokenKind> {
        tokens.iter().map(QueryToken::kind).collect()
    }

    #[test]
    fn splits_filters_and_words() {
        let tokens = tokenize("cpu ns:prod label:team=ops", &QueryProfile::default());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::FreeForm,
                TokenKind::Filter(FilterKey::Namespace),
                TokenKind::Filter(FilterKey::Label),
            ]
        );
        assert_eq!(tokens[2].value(), "team=ops");
        assert_eq!(tokens[1].keyword(), Some("ns"));
    }

    #[test]
    fn quoted_value_keeps_whitespace() {
        let tokens = tokenize(r#"rule:"cpu > 80%" extra"#, &QueryProfile::default());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value(), "cpu > 80%");
        assert_eq!(tokens[1].value(), "extra");
    }

    #[test]
    fn embedded_quotes_are_stripped() {
        let tokens = tokenize(r#"rule:a"b c"d"#, &QueryProfile::default());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value(), "ab cd");
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let tokens = tokenize(r#"group:"team a"#, &QueryProfile::default());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value(), "team a");
    }

    #[test]
    fn unknown_key_is_free_form() {
        let tokens = tokenize("folder:prod", &QueryProfile::default());
        assert_eq!(tokens, vec![QueryToken::free_form("folder:prod")]);
    }

    #[test]
    fn quoted_token_is_never_a_filter() {
        let tokens = tokenize(r#""ds:prom""#, &QueryProfile::default());
        assert_eq!(tokens, vec![QueryToken::free_form("ds:prom")]);
    }

    #[test]
    fn empty_values_are_dropped() {
        let tokens = tokenize(r#"rule: state:"" word"#, &QueryProfile::default());
        assert_eq!(tokens, vec![QueryToken::free_form("word")]);
    }

    #[test]
    fn value_builder_rejects_other_kinds() {
        let token = QueryToken::free_form("cpu");
        assert!(matches!(
            token.filter_value(FilterKey::Rule),
            Err(RuleSearchError::GrammarMismatch(_))
        ));
        let token = QueryToken::filter(FilterKey::Rule, "rule", "cpu");
        assert!(token.filter_value(FilterKey::Group).is_err());
        assert!(token.free_form_value().is_err());
        assert_eq!(token.filter_value(FilterKey::Rule).unwrap(), "cpu");
    }
}
