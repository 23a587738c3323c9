//! Deployment-backed tools
//!
//! A [`DeploymentTool`] forwards one call as a single request to an external
//! model-serving endpoint and maps the reply, attachments included, into a
//! [`ToolResult`]. [`HttpDeploymentClient`] is the chat-completion style
//! endpoint it normally talks to.

use async_trait::async_trait;
use conductor_application::ports::deployment::{
    DeploymentError, DeploymentPort, DeploymentRequest, DeploymentResponse,
};
use conductor_domain::{Artifact, ToolCall, ToolDescriptor, ToolError, ToolResult};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Tool name of the image generation preset
pub const IMAGE_GENERATION: &str = "image_generation";

const IMAGE_GENERATED_MESSAGE: &str =
    "The image has been successfully generated according to request and shown to user!";

pub struct DeploymentTool {
    descriptor: ToolDescriptor,
    deployment: Arc<dyn DeploymentPort>,
    /// Argument forwarded as the request prompt
    prompt_argument: String,
    /// Attachment MIME types surfaced as artifacts; empty accepts all
    artifact_types: Vec<String>,
    /// Output used when the deployment answers with artifacts only
    artifacts_only_message: Option<String>,
}

impl DeploymentTool {
    pub fn new(descriptor: ToolDescriptor, deployment: Arc<dyn DeploymentPort>) -> Self {
        Self {
            descriptor,
            deployment,
            prompt_argument: "prompt".to_string(),
            artifact_types: Vec::new(),
            artifacts_only_message: None,
        }
    }

    /// Image generation preset: PNG and JPEG attachments become artifacts.
    pub fn image_generation(name: &str, deployment: Arc<dyn DeploymentPort>) -> Self {
        Self::new(image_generation_definition(name), deployment)
            .with_artifact_types(["image/png", "image/jpeg"])
            .with_artifacts_only_message(IMAGE_GENERATED_MESSAGE)
    }

    pub fn with_prompt_argument(mut self, name: impl Into<String>) -> Self {
        self.prompt_argument = name.into();
        self
    }

    pub fn with_artifact_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artifact_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_artifacts_only_message(mut self, message: impl Into<String>) -> Self {
        self.artifacts_only_message = Some(message.into());
        self
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let name = self.descriptor.name.as_str();
        let prompt = match call.require_string(&self.prompt_argument) {
            Ok(p) => p.to_string(),
            Err(e) => return ToolResult::failure(&call.id, name, ToolError::invalid_argument(e)),
        };
        let configuration: Map<String, Value> = call
            .arguments
            .iter()
            .filter(|(k, v)| *k != &self.prompt_argument && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        debug!(tool = name, deployment = self.deployment.name(), "Invoking deployment");
        let response = match self
            .deployment
            .invoke(DeploymentRequest {
                prompt,
                configuration,
            })
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(tool = name, deployment = self.deployment.name(), error = %e, "Deployment call failed");
                return ToolResult::failure(&call.id, name, deployment_error(e));
            }
        };

        self.into_result(call, response)
    }

    fn into_result(&self, call: &ToolCall, response: DeploymentResponse) -> ToolResult {
        let artifacts: Vec<Artifact> = response
            .attachments
            .into_iter()
            .filter(|a| {
                self.artifact_types.is_empty() || self.artifact_types.contains(&a.mime_type)
            })
            .collect();

        let content = if response.content.trim().is_empty()
            && !artifacts.is_empty()
            && let Some(message) = &self.artifacts_only_message
        {
            message.clone()
        } else {
            response.content
        };

        artifacts.into_iter().fold(
            ToolResult::success(&call.id, &self.descriptor.name, content),
            ToolResult::with_artifact,
        )
    }
}

fn deployment_error(error: DeploymentError) -> ToolError {
    match error {
        DeploymentError::Timeout => ToolError::timeout("deployment request"),
        DeploymentError::RequestFailed(_) => ToolError::connection(error.to_string()),
        DeploymentError::Status { .. } | DeploymentError::InvalidResponse(_) => {
            ToolError::execution_failed(error.to_string())
        }
    }
}

/// Get the tool definition for image generation
pub fn image_generation_definition(name: &str) -> ToolDescriptor {
    ToolDescriptor::new(
        name,
        "# Image generator\n\
         Generates an image from a description.\n\
         ## Instructions:\n\
         - Use this tool when the user asks for an image or a visualisation of some text.\n\
         - Pick the size closest to what the user asked for.\n\
         - The image is shown to the user directly; describe it briefly in your answer.\n\
         ## Restrictions:\n\
         - Never use this tool for charts of data or numerical information.",
    )
    .with_input_schema(json!({
        "type": "object",
        "properties": {
            "prompt": {
                "type": "string",
                "description": "Extensive description of the image that should be generated."
            },
            "size": {
                "type": "string",
                "description": "The size of the generated image.",
                "enum": ["1024x1024", "1024x1792", "1792x1024"],
                "default": "1024x1024"
            },
            "style": {
                "type": "string",
                "description": "The style of the generated image.",
                "enum": ["natural", "vivid"],
                "default": "natural"
            },
            "quality": {
                "type": "string",
                "description": "The quality of the generated image.",
                "enum": ["standard", "hd"],
                "default": "standard"
            }
        },
        "required": ["prompt"]
    }))
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    custom_content: Option<CustomContent>,
}

#[derive(Deserialize)]
struct CustomContent {
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Deserialize)]
struct Attachment {
    #[serde(rename = "type", default)]
    mime_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Chat-completion style deployment endpoint.
///
/// Sends the prompt as a single user message and the remaining arguments as
/// `custom_fields.configuration`; attachments are read from
/// `choices[0].message.custom_content.attachments`.
pub struct HttpDeploymentClient {
    client: reqwest::Client,
    name: String,
    url: String,
    api_key: Option<String>,
    headers: HashMap<String, String>,
}

impl HttpDeploymentClient {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DeploymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeploymentError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            name: name.into(),
            url: url.into(),
            api_key,
            headers: HashMap::new(),
        })
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

#[async_trait]
impl DeploymentPort for HttpDeploymentClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: DeploymentRequest) -> Result<DeploymentResponse, DeploymentError> {
        let body = json!({
            "messages": [{"role": "user", "content": request.prompt}],
            "custom_fields": {"configuration": request.configuration},
        });

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key).bearer_auth(key);
        }
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DeploymentError::Timeout
            } else {
                DeploymentError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeploymentError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body: CompletionBody = response
            .json()
            .await
            .map_err(|e| DeploymentError::InvalidResponse(e.to_string()))?;
        parse_completion(body)
    }
}

fn parse_completion(body: CompletionBody) -> Result<DeploymentResponse, DeploymentError> {
    let message = body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| DeploymentError::InvalidResponse("No choices in response".to_string()))?;

    let attachments = message
        .custom_content
        .map(|c| c.attachments)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let url = a.url?;
            let mut artifact =
                Artifact::new(url, a.mime_type.unwrap_or_else(|| "application/octet-stream".into()));
            if let Some(title) = a.title {
                artifact = artifact.with_title(title);
            }
            Some(artifact)
        })
        .collect();

    Ok(DeploymentResponse {
        content: message.content.unwrap_or_default(),
        attachments,
    })
}
