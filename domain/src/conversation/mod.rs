//! Conversation domain module
//!
//! A [`Conversation`] is the causal record of one exchange: user input,
//! model answers, tool calls and their results, in the order they happened.

pub mod entities;
pub mod error;

pub use entities::{Conversation, ConversationId, Message, Role};
pub use error::ConversationError;
