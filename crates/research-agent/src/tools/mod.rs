//! Tools the research model can call.

mod web_search;

pub use web_search::{WebSearchParameters, WebSearchTool};
