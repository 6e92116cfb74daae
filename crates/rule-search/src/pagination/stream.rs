//! The search entry point: plans a filter, pages through the selected rule
//! sources and yields matching rules lazily.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::stream::{self, Stream};

use crate::cancel::SearchVersionTracker;
use crate::config::{PageSizes, SearchConfig};
use crate::error::Result;
use crate::filter::{
    group_matches, plan_filter, rule_matches, DataSourceIds, DataSourceNameResolver,
    DataSourceRegistry, FilterPlan, MatchContext, RulesFilter,
};
use crate::query::{parse_query, QueryProfile};
use crate::types::{Page, Rule, RuleGroupIdentifier, RuleSource, RuleSourceId, RuleSourceKind};

use super::merge::{MergedGroupPages, SourcePage};
use super::pager::GroupPager;
use super::source::{PageLimit, RuleSourceClient};

/// A rule that passed the filter, with the group it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: Rule,
    pub group: RuleGroupIdentifier,
}

/// Lazily filtered rules from every queried source.
pub struct FilteredRuleStream {
    pages: MergedGroupPages,
    context: Arc<MatchContext>,
    grafana_plan: Arc<FilterPlan>,
    datasource_plan: Arc<FilterPlan>,
    pending: VecDeque<RuleMatch>,
    groups_seen: usize,
    groups_skipped: usize,
}

impl FilteredRuleStream {
    fn new(
        pages: MergedGroupPages,
        context: Arc<MatchContext>,
        grafana_plan: Arc<FilterPlan>,
        datasource_plan: Arc<FilterPlan>,
    ) -> Self {
        Self {
            pages,
            context,
            grafana_plan,
            datasource_plan,
            pending: VecDeque::new(),
            groups_seen: 0,
            groups_skipped: 0,
        }
    }

    /// Groups received so far.
    pub fn groups_seen(&self) -> usize {
        self.groups_seen
    }

    /// Groups rejected before their rules were looked at.
    pub fn groups_skipped(&self) -> usize {
        self.groups_skipped
    }

    /// Returns the next matching rule, fetching pages as needed.
    pub async fn next(&mut self) -> Option<RuleMatch> {
        loop {
            if let Some(found) = self.pending.pop_front() {
                return Some(found);
            }
            let SourcePage { source, page } = self.pages.next().await?;
            self.expand_page(source, page);
        }
    }

    /// Pulls up to `limit` matches. Fewer means the search is complete.
    pub async fn next_batch(&mut self, limit: usize) -> Vec<RuleMatch> {
        let mut batch = Vec::with_capacity(limit.min(256));
        while batch.len() < limit {
            match self.next().await {
                Some(found) => batch.push(found),
                None => break,
            }
        }
        batch
    }

    pub fn into_stream(self) -> impl Stream<Item = RuleMatch> + Send {
        stream::unfold(self, |mut rules| async move {
            let found = rules.next().await?;
            Some((found, rules))
        })
    }

    fn expand_page(&mut self, source: RuleSourceId, page: Page) {
        let plan = match source.kind() {
            RuleSourceKind::Grafana => Arc::clone(&self.grafana_plan),
            RuleSourceKind::DataSource => Arc::clone(&self.datasource_plan),
        };

        for group in page.groups {
            self.groups_seen += 1;
            let identifier = RuleGroupIdentifier::new(source.clone(), &group);
            if !group_matches(&group, &self.context, &plan.group_config) {
                self.groups_skipped += 1;
                continue;
            }

            for rule in group.rules {
                if rule_matches(&rule, &self.context, &plan.rule_config) {
                    self.pending.push_back(RuleMatch {
                        rule,
                        group: identifier.clone(),
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for FilteredRuleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredRuleStream")
            .field("pages", &self.pages)
            .field("pending", &self.pending.len())
            .field("groups_seen", &self.groups_seen)
            .field("groups_skipped", &self.groups_skipped)
            .finish()
    }
}

/// A started search.
#[derive(Debug)]
pub struct SearchSession {
    pub rules: FilteredRuleStream,
    /// Data-source names were given but none resolved; show a warning.
    pub has_invalid_data_source_names: bool,
    /// Sources being queried, in request order.
    pub sources: Vec<RuleSourceId>,
    /// The normalized filter in effect.
    pub filter: RulesFilter,
}

// ---------------------------------------------------------------------------
// RuleSearch
// ---------------------------------------------------------------------------

pub struct RuleSearch {
    config: SearchConfig,
    client: Arc<dyn RuleSourceClient>,
    resolver: DataSourceNameResolver,
    tracker: SearchVersionTracker,
}

impl RuleSearch {
    pub fn new(
        config: SearchConfig,
        client: Arc<dyn RuleSourceClient>,
        registry: Arc<dyn DataSourceRegistry>,
    ) -> Self {
        let resolver = DataSourceNameResolver::new(registry, config.datasource_cache_capacity);
        Self {
            config,
            client,
            resolver,
            tracker: SearchVersionTracker::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The query profile selected by the config.
    pub fn profile(&self) -> QueryProfile {
        self.config.profile.profile()
    }

    /// Parses `query` with the configured profile and starts a search.
    pub fn start_query(&self, query: &str, sources: &[RuleSource]) -> Result<SearchSession> {
        let filter = parse_query(query, &self.profile())?;
        Ok(self.start(&filter, sources))
    }

    /// Starts a search over `sources`, superseding any earlier search.
    pub fn start(&self, filter: &RulesFilter, sources: &[RuleSource]) -> SearchSession {
        let cancel = self.tracker.begin();
        let context = Arc::new(MatchContext::new(filter, &self.resolver));
        let capabilities = self.config.capabilities;

        let grafana_plan = Arc::new(plan_filter(RuleSourceKind::Grafana, &context, capabilities));
        let datasource_plan = Arc::new(plan_filter(
            RuleSourceKind::DataSource,
            &context,
            capabilities,
        ));

        let selected = select_sources(&context, sources, &grafana_plan, &datasource_plan);
        let pagers = selected
            .iter()
            .map(|source| {
                let plan = match source.kind() {
                    RuleSourceKind::Grafana => &grafana_plan,
                    RuleSourceKind::DataSource => &datasource_plan,
                };
                self.pager_for(source, plan, context.filter())
            })
            .collect();

        tracing::debug!(
            version = cancel.version(),
            sources = ?selected.iter().map(|source| source.id.to_string()).collect::<Vec<_>>(),
            invalid_data_sources = context.has_invalid_data_source_names(),
            "starting rule search"
        );

        SearchSession {
            has_invalid_data_source_names: context.has_invalid_data_source_names(),
            sources: selected.iter().map(|source| source.id.clone()).collect(),
            filter: context.filter().clone(),
            rules: FilteredRuleStream::new(
                MergedGroupPages::new(pagers, cancel),
                context,
                grafana_plan,
                datasource_plan,
            ),
        }
    }

    /// Stops the current search from requesting further pages.
    pub fn cancel(&self) {
        self.tracker.cancel_all();
    }

    fn pager_for(&self, source: &RuleSource, plan: &FilterPlan, filter: &RulesFilter) -> GroupPager {
        let limit = page_limit(source.kind(), plan, filter, &self.config.page_sizes);
        let filters = Some(plan.backend_query_params.clone()).filter(|params| !params.is_empty());
        GroupPager::new(Arc::clone(&self.client), source.id.clone(), limit, filters)
    }
}

impl std::fmt::Debug for RuleSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSearch")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("tracker", &self.tracker)
            .finish()
    }
}

/// Picks the page size for one source kind.
///
/// Local filters discard part of every page, so a larger group page is
/// requested. When the rule source applies every active filter, the limit
/// counts rules instead of groups.
pub fn page_limit(
    kind: RuleSourceKind,
    plan: &FilterPlan,
    filter: &RulesFilter,
    sizes: &PageSizes,
) -> PageLimit {
    if plan.has_client_side_filters(filter) {
        PageLimit::Groups(sizes.filtered_group_limit)
    } else if kind == RuleSourceKind::Grafana && !filter.is_empty() {
        PageLimit::Rules(sizes.backend_rule_limit)
    } else {
        PageLimit::Groups(sizes.default_group_limit)
    }
}

/// Applies the `source:` and `datasource:` filters to the available sources.
///
/// A datasource-managed source is kept for a `datasource:` filter only when
/// its uid is among the ids the context resolved, so selection and
/// [`MatchContext::has_invalid_data_source_names`] always agree.
pub fn select_sources<'a>(
    context: &MatchContext,
    sources: &'a [RuleSource],
    grafana_plan: &FilterPlan,
    datasource_plan: &FilterPlan,
) -> Vec<&'a RuleSource> {
    let filter = context.filter();
    sources
        .iter()
        .filter(|source| {
            let plan = match source.kind() {
                RuleSourceKind::Grafana => grafana_plan,
                RuleSourceKind::DataSource => datasource_plan,
            };
            if plan.excludes_all() {
                return false;
            }
            if let Some(selector) = filter.rule_source.as_deref() {
                if !source_matches_selector(source, selector) {
                    return false;
                }
            }
            match (&source.id, context.data_source_ids()) {
                (RuleSourceId::Grafana, _) => !grafana_plan.has_invalid_data_source_names,
                (RuleSourceId::DataSource(_), DataSourceIds::Unused) => true,
                (RuleSourceId::DataSource(uid), DataSourceIds::Resolved(ids)) => ids.contains(uid),
                (RuleSourceId::DataSource(_), DataSourceIds::Failed) => false,
            }
        })
        .collect()
}

fn source_matches_selector(source: &RuleSource, selector: &str) -> bool {
    match RuleSourceKind::parse(selector) {
        Some(kind) => source.kind() == kind,
        None => {
            source.id.to_string().eq_ignore_ascii_case(selector)
                || source.name.eq_ignore_ascii_case(selector)
        }
    }
}
