use research_agent_model::ToolCallRequest;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// The preset response for one assistant turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    pub(crate) fn has_tool_call(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCall(_)))
    }
}

/// Text of the first canned turn, before the search.
pub const RESEARCH_PRESET_ACK: &str = "I'll search for that information.";

/// Query of the canned search request.
pub const RESEARCH_PRESET_QUERY: &str = "research agent information";

/// Text of the canned final answer.
pub const RESEARCH_PRESET_ANSWER: &str = "Based on the search results, \
here's what I found: Research agents are AI systems designed to conduct \
in-depth research on topics. They can search the web, analyze information, \
and compile reports. They're particularly useful for academic research, \
market analysis, and gathering information on complex topics.";

/// The two turns of an offline research run: ask for a web search, then
/// answer from its results.
pub fn research_script() -> [PresetResponse; 2] {
    [
        PresetResponse::with_events([
            PresetEvent::MessageDelta(RESEARCH_PRESET_ACK.to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call_abc123".to_owned(),
                name: "web_search".to_owned(),
                arguments: json!({ "query": RESEARCH_PRESET_QUERY }),
            }),
        ]),
        PresetResponse::with_events([PresetEvent::MessageDelta(
            RESEARCH_PRESET_ANSWER.to_owned(),
        )]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_script_from_json() {
        let script = r#"[
            {
                "events": [
                    { "type": "message_delta", "data": "Looking it up." },
                    {
                        "type": "tool_call",
                        "data": {
                            "id": "call_1",
                            "name": "web_search",
                            "arguments": { "query": "borrow checker" }
                        }
                    }
                ],
                "failures": 1
            },
            { "events": [{ "type": "message_delta", "data": "Done." }] }
        ]"#;
        let script: Vec<PresetResponse> = serde_json::from_str(script).unwrap();
        assert_eq!(script.len(), 2);
        assert!(script[0].has_tool_call());
        assert_eq!(script[0].failures, Some(1));
        assert!(!script[1].has_tool_call());
        assert_eq!(script[1].failures, None);
    }

    #[test]
    fn test_research_script_shape() {
        let [search, answer] = research_script();
        assert!(search.has_tool_call());
        assert_eq!(
            answer.events,
            [PresetEvent::MessageDelta(RESEARCH_PRESET_ANSWER.to_owned())]
        );
    }
}
