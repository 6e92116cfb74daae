//! Paging through rule sources.
//!
//! This module provides:
//! - The page-fetching client contract
//! - A per-source pager state machine
//! - A pull-based merge of many pagers
//! - The filtered rule stream and the [`RuleSearch`] entry point

mod merge;
mod pager;
mod source;
mod stream;

pub use merge::{MergedGroupPages, SourcePage};
pub use pager::{GroupPager, PagerState};
pub use source::{PageLimit, PageRequest, RuleSourceClient};
pub use stream::{
    page_limit, select_sources, FilteredRuleStream, RuleMatch, RuleSearch, SearchSession,
};
