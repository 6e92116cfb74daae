//! Rule, group, and rule source types shared by the filter and pagination layers.
//!
//! The shapes follow the Prometheus-compatible rules API payload, with the
//! extra metadata the built-in rule source attaches to its own rules.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type Labels = BTreeMap<String, String>;

/// Annotation that links an alerting rule to a dashboard.
pub const DASHBOARD_UID_ANNOTATION: &str = "__dashboardUid__";

/// Label carrying the origin of a rule that was provisioned by a plugin.
pub const ORIGIN_LABEL: &str = "__grafana_origin";

const PLUGIN_ORIGIN_PREFIX: &str = "plugin/";

// ---------------------------------------------------------------------------
// Enumerated rule attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleState {
    Firing,
    Pending,
    #[serde(alias = "normal")]
    Inactive,
    Recovering,
    Unknown,
}

impl RuleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Firing => "firing",
            Self::Pending => "pending",
            Self::Inactive => "inactive",
            Self::Recovering => "recovering",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a query value. `normal` is accepted as a synonym of `inactive`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "firing" => Some(Self::Firing),
            "pending" => Some(Self::Pending),
            "inactive" | "normal" => Some(Self::Inactive),
            "recovering" => Some(Self::Recovering),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Alerting,
    Recording,
}

impl RuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alerting => "alerting",
            Self::Recording => "recording",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "alerting" => Some(Self::Alerting),
            "recording" => Some(Self::Recording),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleHealth {
    Ok,
    NoData,
    Error,
    Unknown,
}

impl RuleHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NoData => "nodata",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a query value. Only the three filterable spellings are accepted.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ok" => Some(Self::Ok),
            "nodata" => Some(Self::NoData),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Normalizes the health string reported by a rule source.
    ///
    /// Prometheus reports failures as `err`; the built-in source uses `error`.
    pub fn from_payload(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "ok" => Self::Ok,
            "nodata" => Self::NoData,
            "error" | "err" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Metadata the built-in rule source attaches to its rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaRuleMeta {
    pub uid: String,
    #[serde(default)]
    pub folder_uid: String,
    #[serde(default, rename = "queriedDatasourceUIDs")]
    pub queried_datasource_uids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_point: Option<String>,
    #[serde(default)]
    pub is_paused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInstance {
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertingRule {
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    #[serde(default)]
    pub health: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub state: RuleState,
    #[serde(default)]
    pub alerts: Vec<AlertInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana: Option<GrafanaRuleMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRule {
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub health: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana: Option<GrafanaRuleMeta>,
}

/// A single rule as returned by a rule source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Rule {
    Alerting(AlertingRule),
    Recording(RecordingRule),
}

impl Rule {
    pub fn name(&self) -> &str {
        match self {
            Self::Alerting(rule) => rule.name.as_str(),
            Self::Recording(rule) => rule.name.as_str(),
        }
    }

    pub fn query(&self) -> &str {
        match self {
            Self::Alerting(rule) => rule.query.as_str(),
            Self::Recording(rule) => rule.query.as_str(),
        }
    }

    pub fn labels(&self) -> &Labels {
        match self {
            Self::Alerting(rule) => &rule.labels,
            Self::Recording(rule) => &rule.labels,
        }
    }

    pub fn health(&self) -> RuleHealth {
        match self {
            Self::Alerting(rule) => RuleHealth::from_payload(rule.health.as_str()),
            Self::Recording(rule) => RuleHealth::from_payload(rule.health.as_str()),
        }
    }

    pub fn rule_type(&self) -> RuleType {
        match self {
            Self::Alerting(_) => RuleType::Alerting,
            Self::Recording(_) => RuleType::Recording,
        }
    }

    pub fn as_alerting(&self) -> Option<&AlertingRule> {
        match self {
            Self::Alerting(rule) => Some(rule),
            Self::Recording(_) => None,
        }
    }

    pub fn grafana(&self) -> Option<&GrafanaRuleMeta> {
        match self {
            Self::Alerting(rule) => rule.grafana.as_ref(),
            Self::Recording(rule) => rule.grafana.as_ref(),
        }
    }

    /// Returns true for rules provisioned by a plugin rather than a user.
    pub fn is_plugin_provided(&self) -> bool {
        self.labels()
            .get(ORIGIN_LABEL)
            .is_some_and(|origin| origin.starts_with(PLUGIN_ORIGIN_PREFIX))
    }
}

/// An evaluation group of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroup {
    pub name: String,
    /// Namespace file for datasource-managed sources, folder for the built-in source.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

// ---------------------------------------------------------------------------
// Rule sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSourceKind {
    Grafana,
    DataSource,
}

impl RuleSourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grafana => "grafana",
            Self::DataSource => "datasource",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "grafana" => Some(Self::Grafana),
            "datasource" => Some(Self::DataSource),
            _ => None,
        }
    }
}

/// Identifies a rule source: the single built-in source or a data source by UID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "uid")]
pub enum RuleSourceId {
    Grafana,
    DataSource(String),
}

impl RuleSourceId {
    pub fn kind(&self) -> RuleSourceKind {
        match self {
            Self::Grafana => RuleSourceKind::Grafana,
            Self::DataSource(_) => RuleSourceKind::DataSource,
        }
    }
}

impl fmt::Display for RuleSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grafana => f.write_str("grafana"),
            Self::DataSource(uid) => f.write_str(uid),
        }
    }
}

/// A rule source the search can query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleSource {
    pub id: RuleSourceId,
    pub name: String,
}

impl RuleSource {
    pub fn grafana() -> Self {
        Self {
            id: RuleSourceId::Grafana,
            name: "grafana".to_string(),
        }
    }

    pub fn data_source(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: RuleSourceId::DataSource(uid.into()),
            name: name.into(),
        }
    }

    pub fn kind(&self) -> RuleSourceKind {
        self.id.kind()
    }
}

/// Where a rule group came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroupIdentifier {
    pub source_id: RuleSourceId,
    pub namespace_or_folder: String,
    pub group_name: String,
}

impl RuleGroupIdentifier {
    pub fn new(source_id: RuleSourceId, group: &RuleGroup) -> Self {
        Self {
            source_id,
            namespace_or_folder: group.file.clone(),
            group_name: group.name.clone(),
        }
    }
}

/// One page of groups returned by a rule source.
///
/// A missing continuation token means the source is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
    #[serde(
        default,
        alias = "groupNextToken",
        skip_serializing_if = "Option::is_none"
    )]
    pub continuation_token: Option<String>,
}

impl Page {
    pub fn new(groups: Vec<RuleGroup>, continuation_token: Option<String>) -> Self {
        Self {
            groups,
            continuation_token,
        }
    }

    /// Returns the token for the next page, treating an empty token as absent.
    pub fn next_token(&self) -> Option<&str> {
        self.continuation_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}
