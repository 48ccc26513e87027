//! Drives a hand-written provider through the protocol the research graph
//! relies on: text deltas, tool calls, then a completion event.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll};

use research_agent_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ModelTool, ToolCallRequest, ToolCallResult,
};
use serde_json::json;

#[derive(Debug)]
struct EchoError(ErrorKind);

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "echo provider failed: {}", self.0)
    }
}

impl Error for EchoError {}

impl ModelProviderError for EchoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct EchoResponse {
    events: VecDeque<ModelResponseEvent>,
}

impl ModelResponse for EchoResponse {
    type Error = EchoError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        _cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        Poll::Ready(Ok(self.get_mut().events.pop_front()))
    }
}

/// Searches once for whatever the user asked, then answers with the
/// search result.
struct EchoProvider;

impl ModelProvider for EchoProvider {
    type Error = EchoError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let mut events = VecDeque::new();
        match req.messages.last() {
            Some(ModelMessage::User(query)) if !req.tools.is_empty() => {
                events.push_back(ModelResponseEvent::ToolCall(
                    ToolCallRequest {
                        id: "call_0".to_owned(),
                        name: req.tools[0].name.clone(),
                        arguments: json!({ "query": query }),
                    },
                ));
                events.push_back(ModelResponseEvent::Completed(
                    ModelFinishReason::ToolCalls,
                ));
            }
            Some(ModelMessage::Tool(result)) => {
                events.push_back(ModelResponseEvent::MessageDelta(
                    format!("Found: {}", result.content),
                ));
                events.push_back(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ));
            }
            _ => return ready(Err(EchoError(ErrorKind::Other))),
        }
        ready(Ok(EchoResponse { events }))
    }
}

async fn drain(
    mut resp: EchoResponse,
) -> (String, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
    let mut text = String::new();
    let mut tool_calls = vec![];
    let mut finish_reason = None;
    while let Some(event) =
        poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::ToolCall(req) => tool_calls.push(req),
            ModelResponseEvent::Completed(reason) => finish_reason = Some(reason),
        }
    }
    (text, tool_calls, finish_reason)
}

#[tokio::test]
async fn test_search_then_answer() {
    let provider = EchoProvider;
    let mut req = ModelRequest {
        messages: vec![ModelMessage::User("rust async".to_owned())],
        tools: vec![ModelTool {
            name: "web_search".to_owned(),
            description: "Search the web for information.".to_owned(),
            parameters: json!({ "type": "object" }),
        }],
    };

    let resp = provider.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = drain(resp).await;
    assert!(text.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::ToolCalls));
    assert_eq!(tool_calls.len(), 1);
    assert_eq!(tool_calls[0].arguments, json!({ "query": "rust async" }));

    req.messages
        .push(ModelMessage::Assistant(String::new()));
    req.messages.push(ModelMessage::Tool(ToolCallResult {
        id: tool_calls[0].id.clone(),
        content: "tokio".to_owned(),
    }));
    let resp = provider.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = drain(resp).await;
    assert_eq!(text, "Found: tokio");
    assert!(tool_calls.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_error_kind() {
    let req = ModelRequest::default();
    let err = EchoProvider.send_request(&req).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(!err.kind().is_transient());
}
