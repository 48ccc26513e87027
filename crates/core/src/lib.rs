//! The research graph: model calls, tool execution and the report.
//!
//! A query enters at `call_model`. While the model keeps asking for
//! tools and the search budget lasts, the graph alternates between
//! `web_search` and `call_model`; otherwise it stops at `final_answer`.
//! The resulting [`ResearchState`] renders into a [`ResearchReport`].

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod conversation;
pub mod graph;
mod model_client;
mod report;
mod state;
pub mod tool;

pub use graph::{GraphEvent, Node, ResearchGraph, ResearchGraphBuilder};
pub use model_client::RetryPolicy;
pub use report::ResearchReport;
pub use state::ResearchState;
