//! A scripted stand-in for a hosted LLM.
//!
//! Used for offline runs (no API key configured) and for tests: every
//! answer, tool call and failure comes from a script set up beforehand.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use research_agent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

const DEFAULT_DELAY: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "mock model: {} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct MockModelResponse {
    step_idx: usize,
    preset: PresetResponse,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for MockModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let delay = this.delay;
        let timer = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(timer.as_mut().poll(cx));
        this.sleep = None;

        let events = &this.preset.events;
        let event = if let Some(event) = events.get(this.event_idx) {
            match event {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::ToolCall(req) => {
                    ModelResponseEvent::ToolCall(req.clone())
                }
            }
        } else if this.event_idx == events.len() {
            ModelResponseEvent::Completed(if this.preset.has_tool_call() {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            })
        } else {
            return Poll::Ready(Ok(None));
        };
        this.event_idx += 1;
        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        let id = format!("mock:{}", self.step_idx);
        Some(OpaqueMessage::new(id, self.preset.clone()))
    }
}

/// A scripted model provider.
///
/// The script is a list of assistant turns. A request is answered with the
/// turn whose index equals the number of assistant messages already in the
/// request, so every fresh conversation starts from the first turn again.
/// Running past the end of the script is an error.
///
/// Clones share failure counters, which makes
/// [`PresetResponse::with_failures`] work across retries.
#[derive(Clone, Default)]
pub struct MockModelProvider {
    script: Vec<PresetResponse>,
    delay: Option<Duration>,
    attempts: Arc<Mutex<HashMap<usize, u64>>>,
}

impl MockModelProvider {
    /// Creates a provider with the given assistant turns.
    pub fn with_script(script: impl IntoIterator<Item = PresetResponse>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }

    /// The canned offline research conversation: one web search for
    /// [`RESEARCH_PRESET_QUERY`], then [`RESEARCH_PRESET_ANSWER`].
    pub fn research_preset() -> Self {
        Self::with_script(research_script())
    }

    /// Appends a turn to the script.
    #[inline]
    pub fn add_assistant_turn(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Sets the delay before each streamed event.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    fn check_failure(&self, step_idx: usize, preset: &PresetResponse) -> Result<(), Error> {
        let Some(failures) = preset.failures else {
            return Ok(());
        };
        let mut attempts = self
            .attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let attempt = attempts.entry(step_idx).or_default();
        *attempt += 1;
        if failures == 0 || *attempt <= failures {
            return Err(Error {
                message: "injected failure",
                kind: ErrorKind::RateLimitExceeded,
            });
        }
        Ok(())
    }
}

impl ModelProvider for MockModelProvider {
    type Error = crate::Error;
    type Response = MockModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let step_idx = req.assistant_turns();
        let result = 'blk: {
            let Some(preset) = self.script.get(step_idx) else {
                break 'blk Err(Error {
                    message: "no more scripted turns",
                    kind: ErrorKind::Other,
                });
            };
            if let Err(err) = self.check_failure(step_idx, preset) {
                break 'blk Err(err);
            }
            Ok(MockModelResponse {
                step_idx,
                preset: preset.clone(),
                event_idx: 0,
                delay: self.delay.unwrap_or(DEFAULT_DELAY),
                sleep: None,
            })
        };
        ready(result)
    }
}
