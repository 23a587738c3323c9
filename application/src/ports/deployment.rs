//! Deployment port
//!
//! A single request/response call to an external model-serving endpoint
//! (e.g. an image generation deployment).

use async_trait::async_trait;
use conductor_domain::Artifact;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeploymentError {
    #[error("Deployment request failed: {0}")]
    RequestFailed(String),

    #[error("Deployment returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid deployment response: {0}")]
    InvalidResponse(String),

    #[error("Deployment timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRequest {
    /// Primary text input (e.g. the image prompt)
    pub prompt: String,
    /// Remaining arguments, forwarded as deployment configuration
    pub configuration: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentResponse {
    pub content: String,
    pub attachments: Vec<Artifact>,
}

#[async_trait]
pub trait DeploymentPort: Send + Sync {
    /// Deployment name, for logs
    fn name(&self) -> &str;

    async fn invoke(&self, request: DeploymentRequest) -> Result<DeploymentResponse, DeploymentError>;
}
