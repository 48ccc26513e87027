use research_agent_model::{ModelMessage, ToolCallRequest};

use crate::conversation::Conversation;

const NO_RESULTS: &str = "No results";

/// Everything a research run has accumulated so far.
#[derive(Clone, Debug, Default)]
pub struct ResearchState {
    pub(crate) query: String,
    pub(crate) conversation: Conversation,
    pub(crate) research_steps: Vec<String>,
    pub(crate) sources: Vec<String>,
    pub(crate) search_iterations: u32,
    pub(crate) pending_tool_calls: Vec<ToolCallRequest>,
}

impl ResearchState {
    /// Creates the initial state for `query`.
    pub fn new<S: Into<String>>(query: S) -> Self {
        let query = query.into();
        let mut conversation = Conversation::default();
        conversation.push(ModelMessage::User(query.clone()), query.clone());
        Self {
            query,
            conversation,
            ..Default::default()
        }
    }

    /// Returns the research query.
    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the conversation, starting with the query.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the research steps, in the order they were taken.
    #[inline]
    pub fn research_steps(&self) -> &[String] {
        &self.research_steps
    }

    /// Returns the sources consulted, one entry per search.
    #[inline]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Returns how many times the `web_search` node ran.
    #[inline]
    pub fn search_iterations(&self) -> u32 {
        self.search_iterations
    }

    /// Returns the text of the last conversation item, or `No results`.
    pub fn final_answer(&self) -> &str {
        match self.conversation.last() {
            Some(item) if !item.transcript().is_empty() => item.transcript(),
            _ => NO_RESULTS,
        }
    }

    pub(crate) fn add_step(&mut self, step: String) {
        self.research_steps.push(step);
    }

    pub(crate) fn add_source(&mut self, source: String) {
        self.sources.push(source);
    }
}
