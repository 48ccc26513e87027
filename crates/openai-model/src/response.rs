use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use research_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};
use serde_json::Value;

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, Message, ToolCall};

/// Folds streamed chunks into response events and the final message.
///
/// Text deltas are emitted as they arrive. Tool calls are only emitted
/// once the choice finishes, since their arguments arrive in fragments.
struct Assembler {
    sse: Sse,
    id: Option<String>,
    content: String,
    reasoning_content: Option<String>,
    tool_calls: Vec<ToolCall>,
    queue: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl Assembler {
    fn new(sse: Sse) -> Self {
        Self {
            sse,
            id: None,
            content: String::new(),
            reasoning_content: None,
            tool_calls: Vec::new(),
            queue: VecDeque::new(),
            finished: false,
        }
    }

    async fn next_event(mut self) -> Result<(Option<ModelResponseEvent>, Self), Error> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Ok((Some(event), self));
            }
            if self.finished {
                return Ok((None, self));
            }

            let data = self.sse.next_event().await.map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::MalformedResponse)
            })?;
            trace!("got sse event: {data:?}");
            match data.as_deref() {
                None | Some("[DONE]") => self.finish(None),
                Some(data) => {
                    let chunk = serde_json::from_str::<ChatCompletionChunk>(data)
                        .map_err(|err| {
                            Error::new(
                                format!("undecodable chunk: {err}"),
                                ErrorKind::MalformedResponse,
                            )
                        })?;
                    self.apply(chunk);
                }
            }
        }
    }

    fn apply(&mut self, chunk: ChatCompletionChunk) {
        self.id.get_or_insert(chunk.id);
        // Only one choice is ever requested. The trailing usage chunk has
        // none.
        let Some(choice) = chunk.choices.into_iter().next() else {
            return;
        };

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            self.content.push_str(&content);
            self.queue.push_back(ModelResponseEvent::MessageDelta(content));
        }
        if let Some(reasoning) = choice.delta.reasoning_content {
            self.reasoning_content
                .get_or_insert_default()
                .push_str(&reasoning);
        }
        for fragment in choice.delta.tool_calls.into_iter().flatten() {
            match self
                .tool_calls
                .iter_mut()
                .find(|t| t.index == fragment.index)
            {
                Some(call) => call.merge(fragment),
                None => self.tool_calls.push(fragment),
            }
        }
        if let Some(reason) = choice.finish_reason {
            self.finish(Some(&reason));
        }
    }

    fn finish(&mut self, reason: Option<&str>) {
        if self.finished {
            return;
        }
        self.finished = true;

        for call in &self.tool_calls {
            self.queue
                .push_back(ModelResponseEvent::ToolCall(to_request(call)));
        }
        let reason = match reason {
            Some("tool_calls") => ModelFinishReason::ToolCalls,
            Some(_) => ModelFinishReason::Stop,
            // The stream ended without a finish reason.
            None if self.tool_calls.is_empty() => ModelFinishReason::Stop,
            None => ModelFinishReason::ToolCalls,
        };
        self.queue.push_back(ModelResponseEvent::Completed(reason));
    }

    fn into_message(self) -> Option<(String, Message)> {
        let mut tool_calls = self.tool_calls;
        for call in &mut tool_calls {
            call.index = None;
            call.r#type.get_or_insert_with(|| "function".to_owned());
        }
        Some((
            self.id?,
            Message::Assistant {
                content: Some(self.content),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                reasoning_content: self.reasoning_content,
            },
        ))
    }
}

fn to_request(call: &ToolCall) -> ToolCallRequest {
    let function = call.function.clone().unwrap_or_default();
    let arguments = function
        .arguments
        .as_deref()
        .filter(|args| !args.trim().is_empty())
        .map(|args| {
            serde_json::from_str::<Value>(args).unwrap_or_else(|err| {
                warn!("tool call arguments are not valid JSON: {err}");
                Value::String(args.to_owned())
            })
        })
        .unwrap_or_else(|| Value::Object(Default::default()));
    ToolCallRequest {
        id: call.id.clone().unwrap_or_default(),
        name: function.name.unwrap_or_default(),
        arguments,
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, Assembler), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        full_msg: Option<(String, Message)>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let assembler = Assembler::new(sse);
        Self {
            next_event_fut: Some(Box::pin(assembler.next_event())),
            full_msg: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let result = ready!(next_event_fut.as_mut().poll(cx));
        match result {
            Ok((Some(event), assembler)) => {
                *this.next_event_fut = Some(Box::pin(assembler.next_event()));
                Poll::Ready(Ok(Some(event)))
            }
            Ok((None, assembler)) => {
                *this.next_event_fut = None;
                *this.full_msg = assembler.into_message();
                Poll::Ready(Ok(None))
            }
            Err(err) => {
                *this.next_event_fut = None;
                Poll::Ready(Err(err))
            }
        }
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id, msg.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        chunks: Vec<Bytes>,
    ) -> (Result<Vec<ModelResponseEvent>, Error>, Option<OpaqueMessage>) {
        let sse = Sse::new(Chunks::from_vec_deque(chunks.into()));
        let mut resp = pin!(OpenAIResponse::from_sse(sse));
        let mut events = vec![];
        loop {
            match poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => break,
                Err(err) => return (Err(err), None),
            }
        }
        (Ok(events), resp.make_opaque_message())
    }

    #[tokio::test]
    async fn test_tool_call_stream() {
        let (events, opaque) = collect(vec![Bytes::from_static(include_bytes!(
            "../fixtures/tool_call_response.txt"
        ))])
        .await;
        let events = events.unwrap();

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                ModelResponseEvent::MessageDelta(d) => Some(d.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "I'll search for that information.");

        let calls: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ModelResponseEvent::ToolCall(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].arguments, json!({ "query": "rust ownership" }));
        assert_eq!(calls[1].arguments, json!({ "query": "rust borrowing" }));

        assert_eq!(
            events.last(),
            Some(&ModelResponseEvent::Completed(ModelFinishReason::ToolCalls))
        );

        let opaque = opaque.unwrap();
        assert_eq!(opaque.id(), "chatcmpl-42");
        let Some(Message::Assistant { tool_calls, .. }) = opaque.to_raw::<Message>() else {
            panic!("expected an assistant message");
        };
        let tool_calls = tool_calls.as_ref().unwrap();
        assert!(tool_calls.iter().all(|c| c.index.is_none()));
    }

    #[tokio::test]
    async fn test_text_stream_split_chunks() {
        let (events, opaque) = collect(vec![
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n",
            ),
            Bytes::from_static(
                b"\ndata: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
            ),
            Bytes::from_static(
                b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n",
            ),
        ])
        .await;
        assert_eq!(
            events.unwrap(),
            [
                ModelResponseEvent::MessageDelta("Hel".to_owned()),
                ModelResponseEvent::MessageDelta("lo".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
        assert_eq!(opaque.unwrap().id(), "c1");
    }

    #[tokio::test]
    async fn test_malformed_chunk() {
        let (events, _) =
            collect(vec![Bytes::from_static(b"data: {not json}\n\n")]).await;
        let err = events.unwrap_err();
        assert_eq!(
            research_agent_model::ModelProviderError::kind(&err),
            ErrorKind::MalformedResponse
        );
    }
}
