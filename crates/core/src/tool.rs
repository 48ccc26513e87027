//! Tools the model may call during research.

mod error;
mod executor;

use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;

/// The result of a tool call.
pub type ToolResult = Result<ToolOutput, Error>;

/// What a successful tool call produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub content: String,
    /// Where the content came from, listed in the report's sources.
    pub sources: Vec<String>,
}

impl ToolOutput {
    /// Creates an output with content and no sources.
    #[inline]
    pub fn new<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            sources: vec![],
        }
    }

    /// Appends a source.
    #[inline]
    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.sources.push(source.into());
        self
    }
}

/// A tool that can be called by the model.
///
/// Tools hold no per-call state. Anything they need at call time (an
/// HTTP client, a result limit) is set at construction and cloned into
/// the future returned by [`Tool::execute`].
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the JSON schema of [`Tool::Input`].
    fn parameter_schema(&self) -> &Value;

    /// Describes a call as a research step, e.g. `Searched for: rust`.
    fn describe_call(&self, input: &Self::Input) -> String;

    /// Executes the tool with the given input.
    ///
    /// The future must not borrow from `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

pub(crate) type BoxedToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    /// Decodes the arguments, then returns the research step and the call.
    fn prepare(&self, arguments: Value) -> Result<(String, BoxedToolFuture), Error>;
}

pub(crate) struct AnyTool<T: Tool>(pub T);

impl<T: Tool> ToolObject for AnyTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn prepare(&self, arguments: Value) -> Result<(String, BoxedToolFuture), Error> {
        let input: T::Input = serde_json::from_value(arguments)
            .map_err(|err| Error::invalid_input().with_reason(err.to_string()))?;
        let step = self.0.describe_call(&input);
        Ok((step, Box::pin(self.0.execute(input))))
    }
}
