//! Conversation-related types.

use research_agent_model::ModelMessage;

/// The messages exchanged during one research run.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    pub(crate) items: Vec<Item>,
}

impl Conversation {
    /// Returns the items, oldest first.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the last item, if any.
    #[inline]
    pub fn last(&self) -> Option<&Item> {
        self.items.last()
    }

    pub(crate) fn push(&mut self, msg: ModelMessage, transcript: String) {
        self.items.push(Item { msg, transcript });
    }

    pub(crate) fn messages(&self) -> impl Iterator<Item = &ModelMessage> {
        self.items.iter().map(|item| &item.msg)
    }
}

/// An item in the conversation.
#[derive(Clone, Debug)]
pub struct Item {
    pub(crate) msg: ModelMessage,
    pub(crate) transcript: String,
}

impl Item {
    /// Returns the transcript of this item.
    ///
    /// The transcript is the human-readable text of the message: the query,
    /// the assistant's words, or a tool's output. It is not enough to
    /// rebuild the message sent to the model.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Returns `true` if the model wrote this item.
    #[inline]
    pub fn is_assistant(&self) -> bool {
        matches!(self.msg, ModelMessage::Assistant(_) | ModelMessage::Opaque(_))
    }

    /// Returns `true` if a tool produced this item.
    #[inline]
    pub fn is_tool_result(&self) -> bool {
        matches!(self.msg, ModelMessage::Tool(_))
    }
}
