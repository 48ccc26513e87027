use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use research_agent_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, OpaqueMessage, ToolCallRequest,
};
use tracing::Instrument;

pub(crate) type TranscriptFn = Arc<dyn Fn(&str) + Send + Sync>;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, RetryPolicy, TranscriptFn)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// How model calls failing with a transient error are retried.
///
/// Only rate limits and network failures are retried, and only while no
/// text of the failed attempt has been streamed out yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the delay between retries.
    pub max_interval: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        initial_interval: Duration::ZERO,
        max_interval: Duration::ZERO,
    };
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}

/// A wrapper around a model provider that erases its type and adds
/// retrying on top of it.
#[derive(Clone)]
pub(crate) struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
}

impl ModelClient {
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let provider = Arc::new(provider);
        let handler_fn: HandlerFn =
            Arc::new(move |req, retry_policy, on_transcript| {
                let provider = Arc::clone(&provider);
                Box::pin(
                    send_with_retry(provider, req, retry_policy, on_transcript)
                        .instrument(trace_span!("model client req")),
                )
            });
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
        }
    }

    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sends a request and waits for the whole response, forwarding
    /// text deltas to `on_transcript` as they arrive.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_transcript: TranscriptFn,
    ) -> SendRequestResult {
        (self.handler_fn)(req, self.retry_policy, on_transcript).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub(crate) struct ModelClientResponse {
    pub transcript: String,
    pub opaque_msg: Option<OpaqueMessage>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

struct AttemptError {
    error: Box<dyn ModelProviderError>,
    streamed: bool,
}

async fn send_with_retry<P: ModelProvider + 'static>(
    provider: Arc<P>,
    req: ModelRequest,
    retry_policy: RetryPolicy,
    on_transcript: TranscriptFn,
) -> SendRequestResult {
    trace!("got a request: {req:?}");

    let mut backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(retry_policy.initial_interval)
        .with_max_interval(retry_policy.max_interval)
        .with_max_elapsed_time(None)
        .build();
    let mut retries = 0;

    loop {
        let resp_or_err = provider.send_request(&req).await;
        let AttemptError { error, streamed } =
            match receive_response::<P>(resp_or_err, &on_transcript).await {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };

        let kind = error.kind();
        if streamed || !kind.is_transient() || retries >= retry_policy.max_retries
        {
            error!("model request failed: {error} ({kind})");
            return Err(error);
        }
        let delay = backoff
            .next_backoff()
            .unwrap_or(retry_policy.max_interval);
        retries += 1;
        warn!(
            "model request failed: {error} ({kind}), retry {retries}/{} in {delay:?}",
            retry_policy.max_retries
        );
        tokio::time::sleep(delay).await;
    }
}

async fn receive_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_transcript: &TranscriptFn,
) -> Result<ModelClientResponse, AttemptError> {
    let resp = resp_or_err.map_err(|err| AttemptError {
        error: Box::new(err),
        streamed: false,
    })?;

    let mut transcript = String::new();
    let opaque_msg;
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = event_or_err.map_err(|err| AttemptError {
            error: Box::new(err),
            streamed: !transcript.is_empty(),
        })?;

        let Some(event) = event else {
            opaque_msg = pinned_resp.make_opaque_message();
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                on_transcript(&msg);
                transcript.push_str(&msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}
