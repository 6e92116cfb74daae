//! Merges per-source pagers into one pull-based sequence of pages.
//!
//! Pages from one source arrive in fetch order; across sources, whichever
//! request resolves first is yielded first. A pager whose page was just
//! yielded stays parked until the consumer pulls again, so each source has at
//! most one request in flight.

use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};

use crate::cancel::CancellationToken;
use crate::types::{Page, RuleSourceId};

use super::pager::GroupPager;

type PagerFuture = BoxFuture<'static, (GroupPager, Option<Page>)>;

/// A page tagged with the source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePage {
    pub source: RuleSourceId,
    pub page: Page,
}

pub struct MergedGroupPages {
    in_flight: FuturesUnordered<PagerFuture>,
    parked: Vec<GroupPager>,
    cancel: CancellationToken,
    pages_yielded: usize,
}

impl MergedGroupPages {
    pub fn new(pagers: Vec<GroupPager>, cancel: CancellationToken) -> Self {
        Self {
            in_flight: FuturesUnordered::new(),
            parked: pagers,
            cancel,
            pages_yielded: 0,
        }
    }

    /// Number of sources still able to produce pages.
    pub fn active_sources(&self) -> usize {
        self.in_flight.len() + self.parked.len()
    }

    pub fn is_finished(&self) -> bool {
        self.active_sources() == 0
    }

    pub fn pages_yielded(&self) -> usize {
        self.pages_yielded
    }

    /// Waits for the next page from any source.
    ///
    /// Returns `None` once every source is exhausted or the search was
    /// superseded, and keeps returning `None` afterwards.
    pub async fn next(&mut self) -> Option<SourcePage> {
        loop {
            if self.cancel.is_cancelled().is_none() {
                if !self.is_finished() {
                    tracing::debug!(
                        version = self.cancel.version(),
                        pending = self.active_sources(),
                        "rule search superseded; stopping page requests"
                    );
                }
                self.parked.clear();
                self.in_flight.clear();
                return None;
            }

            for pager in self.parked.drain(..) {
                self.in_flight.push(fetch_next(pager));
            }

            let (pager, page) = self.in_flight.next().await?;
            let source = pager.source().clone();
            if !pager.is_exhausted() {
                self.parked.push(pager);
            }

            if let Some(page) = page {
                self.pages_yielded += 1;
                return Some(SourcePage { source, page });
            }
        }
    }
}

fn fetch_next(mut pager: GroupPager) -> PagerFuture {
    async move {
        let page = pager.next_page().await;
        (pager, page)
    }
    .boxed()
}

impl std::fmt::Debug for MergedGroupPages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedGroupPages")
            .field("in_flight", &self.in_flight.len())
            .field("parked", &self.parked)
            .field("pages_yielded", &self.pages_yielded)
            .finish()
    }
}
