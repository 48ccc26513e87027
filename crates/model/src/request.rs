use serde_json::Value;

use crate::OpaqueMessage;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model. Empty means the model must
    /// answer in text.
    pub tools: Vec<ModelTool>,
}

impl ModelRequest {
    /// Counts the assistant turns already present in the history.
    pub fn assistant_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|msg| {
                matches!(msg, ModelMessage::Assistant(_) | ModelMessage::Opaque(_))
            })
            .count()
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text, i.e. the research query.
    User(String),
    /// An assistant text.
    Assistant(String),
    /// A tool call result.
    Tool(ToolCallResult),
    /// An assistant message in the provider's own shape.
    Opaque(OpaqueMessage),
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The id of the tool call request this answers.
    pub id: String,
    /// The result of the tool call, as text for the model.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// JSON schema of the tool's parameters.
    pub parameters: Value,
}
