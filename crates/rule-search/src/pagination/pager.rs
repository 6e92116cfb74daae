//! Per-source pagination state machine.

use std::sync::Arc;

use crate::filter::BackendQueryParams;
use crate::types::{Page, RuleSourceId};

use super::source::{PageLimit, PageRequest, RuleSourceClient};

/// `Idle → Fetching → {HasToken → Fetching | Exhausted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagerState {
    /// Nothing fetched yet.
    Idle,
    /// A request is in flight.
    Fetching,
    /// The last page carried a continuation token.
    HasToken,
    /// The last page had no token, or a fetch failed.
    Exhausted,
}

/// Pulls pages from one rule source, one request at a time.
pub struct GroupPager {
    client: Arc<dyn RuleSourceClient>,
    source: RuleSourceId,
    limit: PageLimit,
    filters: Option<BackendQueryParams>,
    state: PagerState,
    token: Option<String>,
    pages_fetched: usize,
}

impl GroupPager {
    pub fn new(
        client: Arc<dyn RuleSourceClient>,
        source: RuleSourceId,
        limit: PageLimit,
        filters: Option<BackendQueryParams>,
    ) -> Self {
        Self {
            client,
            source,
            limit,
            filters,
            state: PagerState::Idle,
            token: None,
            pages_fetched: 0,
        }
    }

    pub fn source(&self) -> &RuleSourceId {
        &self.source
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    /// Token for the next request, if the last page carried one.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == PagerState::Exhausted
    }

    /// Fetches the next page, or returns `None` once the source is exhausted.
    ///
    /// A failed fetch is logged and exhausts the source; there is no retry.
    /// If a previous call was dropped mid-request, the same token is requested
    /// again.
    pub async fn next_page(&mut self) -> Option<Page> {
        let continuation_token = match self.state {
            PagerState::Exhausted => return None,
            PagerState::Idle => None,
            PagerState::Fetching | PagerState::HasToken => self.token.clone(),
        };

        self.state = PagerState::Fetching;
        let request = PageRequest {
            source: self.source.clone(),
            limit: self.limit,
            continuation_token,
            filters: self.filters.clone(),
        };

        match self.client.fetch_page(request).await {
            Ok(page) => {
                self.pages_fetched += 1;
                match page.next_token() {
                    Some(token) => {
                        self.token = Some(token.to_string());
                        self.state = PagerState::HasToken;
                    }
                    None => {
                        self.token = None;
                        self.state = PagerState::Exhausted;
                    }
                }
                tracing::debug!(
                    source = %self.source,
                    page = self.pages_fetched,
                    groups = page.groups.len(),
                    exhausted = self.is_exhausted(),
                    "fetched rule page"
                );
                Some(page)
            }
            Err(error) => {
                tracing::warn!(
                    source = %self.source,
                    page = self.pages_fetched + 1,
                    %error,
                    "rule page fetch failed; source exhausted"
                );
                self.token = None;
                self.state = PagerState::Exhausted;
                None
            }
        }
    }
}

impl std::fmt::Debug for GroupPager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupPager")
            .field("source", &self.source)
            .field("limit", &self.limit)
            .field("state", &self.state)
            .field("token", &self.token)
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}
