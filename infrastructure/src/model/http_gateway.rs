//! OpenAI-compatible chat completions gateway

use async_trait::async_trait;
use conductor_application::ports::model_gateway::{
    GatewayError, ModelGateway, ModelRequest, ModelResponse,
};
use conductor_domain::{Message, Role, ToolCall, ToolDescriptor};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Gateway for any endpoint speaking the chat completions protocol
pub struct HttpModelGateway {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

impl HttpModelGateway {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            url: completions_url(base_url),
            model: model.into(),
            api_key,
            temperature: None,
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body(&self, request: &ModelRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), json!(self.model));
        body.insert(
            "messages".into(),
            Value::Array(request.messages.iter().map(encode_message).collect()),
        );
        if !request.tools.is_empty() {
            body.insert(
                "tools".into(),
                Value::Array(request.tools.iter().map(encode_tool).collect()),
            );
        }
        if let Some(t) = self.temperature {
            body.insert("temperature".into(), json!(t));
        }
        Value::Object(body)
    }
}

fn completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

fn encode_message(message: &Message) -> Value {
    let mut out = Map::new();
    out.insert("role".into(), json!(message.role.as_str()));

    match message.role {
        Role::Tool => {
            out.insert("tool_call_id".into(), json!(message.tool_call_id));
            out.insert("content".into(), json!(message.content_str()));
        }
        Role::Assistant if message.has_tool_calls() => {
            out.insert("content".into(), json!(message.content));
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.tool_name,
                            "arguments": call.arguments_json().to_string(),
                        }
                    })
                })
                .collect();
            out.insert("tool_calls".into(), Value::Array(calls));
        }
        _ => {
            out.insert("content".into(), json!(message.content_str()));
        }
    }

    Value::Object(out)
}

fn encode_tool(descriptor: &ToolDescriptor) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": descriptor.name,
            "description": descriptor.description,
            "parameters": descriptor.parameter_schema(),
        }
    })
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: String,
    function: ResponseFunction,
}

#[derive(Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn decode_response(body: CompletionResponse) -> Result<ModelResponse, GatewayError> {
    let message = body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| GatewayError::InvalidResponse("No choices in response".to_string()))?;

    let tool_calls = message
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = parse_arguments(&call.function.name, &call.function.arguments);
            ToolCall::new(call.id, call.function.name).with_arguments(arguments)
        })
        .collect();

    Ok(ModelResponse {
        content: message.content.filter(|c| !c.is_empty()),
        tool_calls,
    })
}

/// Arguments arrive as a JSON-encoded object. Anything else becomes an
/// empty argument set, which argument validation then reports to the model.
fn parse_arguments(tool: &str, raw: &str) -> HashMap<String, Value> {
    if raw.trim().is_empty() {
        return HashMap::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        Ok(other) => {
            warn!(tool, "Tool arguments are not an object: {}", other);
            HashMap::new()
        }
        Err(e) => {
            warn!(tool, error = %e, "Tool arguments are not valid JSON");
            HashMap::new()
        }
    }
}

#[async_trait]
impl ModelGateway for HttpModelGateway {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, GatewayError> {
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let mut builder = self.client.post(&self.url).json(&self.request_body(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else if e.is_connect() {
                GatewayError::ConnectionError(e.to_string())
            } else {
                GatewayError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::RequestFailed(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        decode_response(body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::ToolParameter;

    fn gateway() -> HttpModelGateway {
        HttpModelGateway::new("http://localhost:8080/v1/", "gpt-4o", None, Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(completions_url("http://h/v1/"), "http://h/v1/chat/completions");
        assert_eq!(
            completions_url("http://h/openai/deployments/x/chat/completions"),
            "http://h/openai/deployments/x/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shapes_messages_and_tools() {
        let call = ToolCall::new("call_1", "execute_code").with_arg("code", "print(2+2)");
        let request = ModelRequest::new(
            vec![
                Message::system("be brief"),
                Message::user("2+2?"),
                Message::assistant_tool_calls(None, vec![call]),
                Message::tool_result("call_1", "4"),
            ],
            vec![ToolDescriptor::new("execute_code", "Run code")
                .with_parameter(ToolParameter::new("code", "Code", true))],
        );

        let body = gateway().with_temperature(Some(0.2)).request_body(&request);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["name"], "execute_code");
        let args: Value = serde_json::from_str(
            body["messages"][2]["tool_calls"][0]["function"]["arguments"]
                .as_str()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(args["code"], "print(2+2)");
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["parameters"]["required"], json!(["code"]));
        assert!(body["temperature"].as_f64().is_some());
    }

    #[test]
    fn test_tools_omitted_when_empty() {
        let body = gateway().request_body(&ModelRequest::new(vec![Message::user("hi")], vec![]));
        assert!(body.get("tools").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_decode_tool_calls() {
        let body: CompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "a", "type": "function", "function": {"name": "search", "arguments": "{\"query\":\"rust\"}"}},
                    {"id": "b", "type": "function", "function": {"name": "execute_code", "arguments": "not json"}}
                ]
            }}]
        }))
        .unwrap();

        let response = decode_response(body).unwrap();

        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].get_string("query"), Some("rust"));
        assert!(response.tool_calls[1].arguments.is_empty());
    }

    #[test]
    fn test_decode_text() {
        let body: CompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}}]
        }))
        .unwrap();

        let response = decode_response(body).unwrap();
        assert_eq!(response.text(), "4");
        assert!(!response.has_tool_calls());
    }

    #[test]
    fn test_decode_without_choices() {
        let body: CompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(decode_response(body), Err(GatewayError::InvalidResponse(_))));
    }
}
