//! Builders and a scripted rule source shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, RuleSearchError};
use crate::pagination::{PageRequest, RuleSourceClient};
use crate::types::{
    AlertInstance, AlertingRule, GrafanaRuleMeta, Labels, Page, RecordingRule, Rule, RuleGroup,
    RuleSourceId, RuleState,
};

pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn alerting(name: &str, rule_labels: &[(&str, &str)], state: RuleState) -> AlertingRule {
    AlertingRule {
        name: name.to_string(),
        query: "up == 0".to_string(),
        labels: labels(rule_labels),
        annotations: Labels::new(),
        health: "ok".to_string(),
        last_error: None,
        state,
        alerts: Vec::new(),
        grafana: None,
    }
}

pub fn recording(name: &str, rule_labels: &[(&str, &str)]) -> RecordingRule {
    RecordingRule {
        name: name.to_string(),
        query: "sum(rate(requests_total[5m]))".to_string(),
        labels: labels(rule_labels),
        health: "ok".to_string(),
        last_error: None,
        grafana: None,
    }
}

pub fn instance(instance_labels: &[(&str, &str)]) -> AlertInstance {
    AlertInstance {
        labels: labels(instance_labels),
        annotations: Labels::new(),
        state: "firing".to_string(),
        value: None,
    }
}

pub fn grafana_meta(uid: &str, datasource_uids: &[&str]) -> GrafanaRuleMeta {
    GrafanaRuleMeta {
        uid: uid.to_string(),
        queried_datasource_uids: datasource_uids.iter().map(|uid| uid.to_string()).collect(),
        ..GrafanaRuleMeta::default()
    }
}

pub fn group(name: &str, file: &str, rules: Vec<Rule>) -> RuleGroup {
    RuleGroup {
        name: name.to_string(),
        file: file.to_string(),
        interval: Some(60.0),
        rules,
    }
}

/// A page whose groups each hold one firing alerting rule named after the group.
pub fn page(group_names: &[&str], token: Option<&str>) -> Page {
    let groups = group_names
        .iter()
        .map(|name| {
            group(
                name,
                "namespace",
                vec![Rule::Alerting(alerting(name, &[], RuleState::Firing))],
            )
        })
        .collect();
    Page::new(groups, token.map(str::to_string))
}

/// Replays scripted responses per source and records every request.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<HashMap<RuleSourceId, VecDeque<std::result::Result<Page, String>>>>,
    delays: Mutex<HashMap<RuleSourceId, Duration>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, source: &RuleSourceId, pages: Vec<std::result::Result<Page, String>>) {
        self.responses
            .lock()
            .entry(source.clone())
            .or_default()
            .extend(pages);
    }

    pub fn delay(&self, source: &RuleSourceId, delay: Duration) {
        self.delays.lock().insert(source.clone(), delay);
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, source: &RuleSourceId) -> Vec<PageRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| &request.source == source)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RuleSourceClient for ScriptedClient {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page> {
        let source = request.source.clone();
        self.requests.lock().push(request);

        let delay = self.delays.lock().get(&source).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .responses
            .lock()
            .get_mut(&source)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(RuleSearchError::Fetch(message)),
            None => Err(RuleSearchError::Fetch(format!("no page scripted for {source}"))),
        }
    }
}
