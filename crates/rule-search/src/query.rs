//! The rule search query language.
//!
//! This module provides:
//! - Filter keys, keyword dialects and parsing profiles
//! - A quote-aware tokenizer for `key:value` pairs and free-form words
//! - Parsing tokens into [`RulesFilter`](crate::filter::RulesFilter)
//! - Serializing filter state back into a query, preserving token order

mod keys;
mod parser;
mod serializer;
mod tokenizer;

pub use keys::{Dialect, FilterKey, ProfileKind, QueryProfile};
pub use parser::{filter_from_tokens, health_term, parse_query, plugins_term, state_term, type_term};
pub use serializer::{filter_exprs, serialize_filter, FilterExpr};
pub use tokenizer::{tokenize, QueryToken, TokenKind};
