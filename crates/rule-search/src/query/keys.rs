//! Filter keys, keyword dialects, and parsing profiles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A filter dimension addressable from the query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKey {
    DataSource,
    Namespace,
    Label,
    Group,
    Rule,
    State,
    Type,
    Health,
    Dashboard,
    Plugins,
    ContactPoint,
    Source,
}

impl FilterKey {
    pub const ALL: [FilterKey; 12] = [
        FilterKey::DataSource,
        FilterKey::Namespace,
        FilterKey::Label,
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

    pub fn full_keyword(self) -> &'static str {
        match self {
            Self::DataSource => "datasource",
            Self::Namespace => "namespace",
            Self::Label => "label",
            Self::Group => "group",
            Self::Rule => "rule",
            Self::State => "state",
            Self::Type => "type",
            Self::Health => "health",
            Self::Dashboard => "dashboard",
            Self::Plugins => "plugins",
            Self::ContactPoint => "contactPoint",
            Self::Source => "source",
        }
    }

    pub fn short_alias(self) -> Option<&'static str> {
        match self {
            Self::DataSource => Some("ds"),
            Self::Namespace => Some("ns"),
            Self::Label => Some("l"),
            Self::Group => Some("g"),
            Self::Rule => Some("r"),
            Self::State => Some("s"),
            Self::Type => Some("t"),
            _ => None,
        }
    }

    /// List keys accumulate every occurrence; all other keys keep the last value.
    pub fn is_list(self) -> bool {
        matches!(self, Self::DataSource | Self::Label)
    }
}

/// A family of keyword spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dialect {
    FullKeyword,
    ShortAlias,
}

impl Dialect {
    fn keyword(self, key: FilterKey) -> Option<&'static str> {
        match self {
            Self::FullKeyword => Some(key.full_keyword()),
            Self::ShortAlias => key.short_alias(),
        }
    }
}

/// The set of keys and dialects one surface of the product understands.
///
/// A `key:` prefix outside the profile is not an error; the whole token is
/// read as a free-form word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryProfile {
    keys: BTreeSet<FilterKey>,
    dialects: BTreeSet<Dialect>,
}

impl QueryProfile {
    pub fn new(
        keys: impl IntoIterator<Item = FilterKey>,
        dialects: impl IntoIterator<Item = Dialect>,
    ) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            dialects: dialects.into_iter().collect(),
        }
    }

    /// Both spellings for every key except `source`.
    pub fn short_alias() -> Self {
        Self::new(
            FilterKey::ALL
                .into_iter()
                .filter(|key| *key != FilterKey::Source),
            [Dialect::FullKeyword, Dialect::ShortAlias],
        )
    }

    /// Full keywords only, every key.
    pub fn full_keyword() -> Self {
        Self::new(FilterKey::ALL, [Dialect::FullKeyword])
    }

    /// Resolves a keyword (case-insensitive) to the key it names in this profile.
    pub fn lookup(&self, keyword: &str) -> Option<FilterKey> {
        self.keys.iter().copied().find(|key| {
            self.dialects.iter().any(|dialect| {
                dialect
                    .keyword(*key)
                    .is_some_and(|spelling| spelling.eq_ignore_ascii_case(keyword))
            })
        })
    }

    /// Preferred spelling for newly written tokens: full keyword when enabled.
    pub fn keyword_for(&self, key: FilterKey) -> &'static str {
        self.dialects
            .iter()
            .find_map(|dialect| dialect.keyword(key))
            .unwrap_or_else(|| key.full_keyword())
    }
}

impl Default for QueryProfile {
    fn default() -> Self {
        Self::new(FilterKey::ALL, [Dialect::FullKeyword, Dialect::ShortAlias])
    }
}

/// Config-friendly selector for the built-in profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    #[default]
    Default,
    ShortAlias,
    FullKeyword,
}

impl ProfileKind {
    pub fn profile(self) -> QueryProfile {
        match self {
            Self::Default => QueryProfile::default(),
            Self::ShortAlias => QueryProfile::short_alias(),
            Self::FullKeyword => QueryProfile::full_keyword(),
        }
    }
}
