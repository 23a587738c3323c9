//! Conversation domain entities

use super::error::ConversationError;
use crate::tool::entities::ToolCall;
use serde::{Deserialize, Serialize};

/// Identifier of a conversation (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Answer to one tool call of the preceding assistant message
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A message in a conversation (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by the model (assistant messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Id of the answered tool call (tool messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// An assistant message requesting tool calls, optionally with preamble text.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// An ordered, append-only exchange between the user, the model and tools.
///
/// [`push`](Self::push) enforces the transcript discipline: each tool-result
/// message answers exactly one call of the latest assistant message, and no
/// other message may be appended while calls remain unanswered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: impl Into<ConversationId>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }

    pub fn with_system_prompt(id: impl Into<ConversationId>, prompt: impl Into<String>) -> Self {
        let mut conversation = Self::new(id);
        conversation.messages.push(Message::system(prompt));
        conversation
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message, rejecting transcript violations.
    pub fn push(&mut self, message: Message) -> Result<(), ConversationError> {
        match message.role {
            Role::Tool => self.check_tool_result(&message)?,
            _ => {
                let open = self.open_tool_call_ids();
                if !open.is_empty() {
                    return Err(ConversationError::UnansweredToolCalls { ids: open });
                }
                if message.role == Role::Assistant {
                    check_unique_call_ids(&message.tool_calls)?;
                }
            }
        }

        self.messages.push(message);
        Ok(())
    }

    /// Drop everything except system messages.
    pub fn clear(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
    }

    /// Ids of calls in the latest assistant message that have no result yet.
    pub fn open_tool_call_ids(&self) -> Vec<String> {
        let Some(anchor) = self.tool_call_anchor() else {
            return Vec::new();
        };

        let answered: Vec<&str> = self.messages[anchor + 1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        self.messages[anchor]
            .tool_calls
            .iter()
            .filter(|c| !answered.contains(&c.id.as_str()))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Index of the assistant message whose calls are currently being answered.
    ///
    /// That is the last assistant message with tool calls, provided only
    /// tool-result messages follow it.
    fn tool_call_anchor(&self) -> Option<usize> {
        let idx = self
            .messages
            .iter()
            .rposition(|m| m.role != Role::Tool)?;
        let candidate = &self.messages[idx];
        (candidate.role == Role::Assistant && candidate.has_tool_calls()).then_some(idx)
    }

    fn check_tool_result(&self, message: &Message) -> Result<(), ConversationError> {
        let id = message
            .tool_call_id
            .as_deref()
            .ok_or(ConversationError::MissingToolCallId)?;

        let anchor = self
            .tool_call_anchor()
            .ok_or_else(|| ConversationError::NoPendingToolCalls { id: id.to_string() })?;

        if !self.messages[anchor].tool_calls.iter().any(|c| c.id == id) {
            return Err(ConversationError::UnmatchedToolResult { id: id.to_string() });
        }

        let already_answered = self.messages[anchor + 1..]
            .iter()
            .any(|m| m.tool_call_id.as_deref() == Some(id));
        if already_answered {
            return Err(ConversationError::DuplicateToolResult { id: id.to_string() });
        }

        Ok(())
    }
}

fn check_unique_call_ids(calls: &[ToolCall]) -> Result<(), ConversationError> {
    for (i, call) in calls.iter().enumerate() {
        if calls[..i].iter().any(|c| c.id == call.id) {
            return Err(ConversationError::DuplicateToolCallId {
                id: call.id.clone(),
            });
        }
    }
    Ok(())
}
