//! Tool domain module
//!
//! Tools are the capabilities the model can invoke between answers. Every
//! tool is described by a [`ToolDescriptor`] (name, description, parameter
//! contract), invoked through a [`ToolCall`] and answered by a [`ToolResult`].
//!
//! ```text
//! ┌────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolDescriptor │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (contract)     │    │ (invocation) │    │ (outcome)    │
//! └────────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! Execution itself happens outside the domain: adapters in the
//! infrastructure layer run local, deployment-backed, or remote tools.
//! This module only holds the shared vocabulary and the pure
//! [`ToolValidator`] that checks arguments before dispatch.

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{ToolCall, ToolDescriptor, ToolParameter};
pub use traits::{SchemaToolValidator, ToolValidator};
pub use value_objects::{Artifact, ToolError, ToolErrorKind, ToolResult};
