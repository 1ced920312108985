//! # Search
//!
//! Web Search Adapter and the Pre-Search Manager that merges it with
//! memory recall.

pub mod presearch;
pub mod web;

pub use presearch::{PreSearchManager, SearchContext};
pub use web::{DisabledSearch, SearxngSearch, WebSearch};

use std::sync::Arc;

use crate::config::TeamflowConfig;
use crate::error::TeamflowResult;

/// Build the configured web search adapter
pub fn open_web_search(config: &TeamflowConfig) -> TeamflowResult<Arc<dyn WebSearch>> {
    if config.web_search_enabled {
        Ok(Arc::new(SearxngSearch::from_config(config)?))
    } else {
        Ok(Arc::new(DisabledSearch))
    }
}
