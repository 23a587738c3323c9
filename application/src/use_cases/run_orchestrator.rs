//! Run Orchestrator use case
//!
//! Drives one conversation turn: the model is called with the transcript
//! and the tool descriptors, any tool calls it emits are dispatched
//! concurrently, their results are appended in call order, and the loop
//! repeats until the model answers with content only or a bound is hit.
//!
//! | Step                      | Phase             | Ends the run when              |
//! |---------------------------|-------------------|--------------------------------|
//! | 1. Model round trip       | AwaitingModel     | no tool calls, depth reached   |
//! | 2. Concurrent dispatch    | DispatchingTools  | never (failures become results)|
//! | 3. Append results         | DispatchingTools  | a tool server is exhausted     |

use crate::config::ExecutionParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger, event_type,
};
use crate::ports::model_gateway::{GatewayError, ModelGateway, ModelRequest, ModelResponse};
use crate::ports::progress::{NoProgress, OrchestratorProgress};
use crate::ports::tool_executor::{ToolContext, ToolExecutorPort};
use crate::retrieval::RetrievalCache;
use crate::use_cases::dispatch::ToolDispatcher;
use conductor_domain::prompt::{depth_exceeded_message, server_unavailable_message};
use conductor_domain::{
    Conversation, ConversationError, ConversationId, DomainError, Message, OrchestrationState,
    Step, TerminationReason, ToolCall, ToolError, ToolResult,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Faults that abort a run. Tool failures never show up here.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Transcript violation: {0}")]
    Conversation(#[from] ConversationError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Run cancelled")]
    Cancelled,
}

impl OrchestratorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestratorError::Cancelled)
    }
}

/// Shared handles a run works against.
#[derive(Clone)]
pub struct AgentContext {
    pub tools: Arc<dyn ToolExecutorPort>,
    pub retrieval: Arc<RetrievalCache>,
}

impl AgentContext {
    pub fn new(tools: Arc<dyn ToolExecutorPort>, retrieval: Arc<RetrievalCache>) -> Self {
        Self { tools, retrieval }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Text of the final assistant message
    pub final_message: String,
    pub termination: TerminationReason,
    /// Model round trips made
    pub rounds: usize,
    /// Tool calls dispatched
    pub tool_calls: usize,
}

pub struct Orchestrator {
    gateway: Arc<dyn ModelGateway>,
    context: AgentContext,
    dispatcher: ToolDispatcher,
    params: ExecutionParams,
    progress: Arc<dyn OrchestratorProgress>,
    logger: Arc<dyn ConversationLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, context: AgentContext, params: ExecutionParams) -> Self {
        let dispatcher = ToolDispatcher::new(
            Arc::clone(&context.tools),
            params.tool_timeout,
            params.max_parallel_tools,
        );
        Self {
            gateway,
            context,
            dispatcher,
            params,
            progress: Arc::new(NoProgress),
            logger: Arc::new(NoConversationLogger),
            cancellation_token: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn OrchestratorProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    /// Run the conversation until the model produces a final answer.
    ///
    /// The final assistant message is appended to `conversation` and also
    /// returned in the [`RunOutcome`].
    pub async fn run(&self, conversation: &mut Conversation) -> Result<RunOutcome, OrchestratorError> {
        let tools = self.context.tools.descriptors();
        let ctx = ToolContext::new(conversation.id().clone());
        let mut state = OrchestrationState::new(self.params.max_depth);
        let mut dispatched = 0;

        info!(
            conversation = %conversation.id(),
            model = self.gateway.model_name(),
            tools = tools.len(),
            max_depth = state.max_depth(),
            "Starting run"
        );

        loop {
            self.check_cancelled()?;

            let round = state.rounds() + 1;
            self.progress.on_round_start(round, state.max_depth());

            let request = ModelRequest::new(conversation.messages().to_vec(), tools.clone());
            self.logger.log(ConversationEvent::new(
                event_type::MODEL_REQUEST,
                json!({
                    "conversation": conversation.id().as_str(),
                    "round": round,
                    "messages": request.messages.len(),
                    "tools": request.tools.len(),
                }),
            ));

            let mut response = self.complete(&request).await?;
            normalize_call_ids(&mut response.tool_calls, round);

            self.progress.on_model_response(response.tool_calls.len());
            self.logger.log(ConversationEvent::new(
                event_type::MODEL_RESPONSE,
                json!({
                    "round": round,
                    "content": response.content,
                    "tool_calls": response.tool_calls.iter().map(|c| &c.tool_name).collect::<Vec<_>>(),
                }),
            ));

            if let Step::Finish(reason) = state.on_model_response(response.has_tool_calls())? {
                let text = match &reason {
                    TerminationReason::Completed => response.content.unwrap_or_default(),
                    other => termination_message(other),
                };
                return self.finish(conversation, text, reason, &state, dispatched);
            }

            let calls = response.tool_calls;
            debug!(round, calls = calls.len(), "Dispatching tool calls");
            conversation.push(Message::assistant_tool_calls(response.content, calls.clone()))?;

            for call in &calls {
                self.progress.on_tool_dispatch(call);
                self.logger.log(ConversationEvent::new(
                    event_type::TOOL_CALL,
                    json!({
                        "round": round,
                        "id": call.id,
                        "tool": call.tool_name,
                        "arguments": call.arguments_json(),
                    }),
                ));
            }

            let results = match &self.cancellation_token {
                Some(token) => tokio::select! {
                    results = self.dispatcher.dispatch(&ctx, &calls) => results,
                    _ = token.cancelled() => {
                        close_open_calls(conversation, &calls)?;
                        return Err(OrchestratorError::Cancelled);
                    }
                },
                None => self.dispatcher.dispatch(&ctx, &calls).await,
            };
            dispatched += calls.len();

            let mut terminal = None;
            for (call, result) in calls.iter().zip(&results) {
                self.progress.on_tool_result(call, result);
                self.logger.log(ConversationEvent::new(
                    event_type::TOOL_RESULT,
                    json!({
                        "round": round,
                        "id": call.id,
                        "tool": call.tool_name,
                        "success": result.is_success(),
                        "error_code": result.error().map(|e| e.code()),
                        "duration_ms": result.duration_ms,
                    }),
                ));

                conversation.push(Message::tool_result(&call.id, result.to_message_content()))?;

                if terminal.is_none() && result.is_terminal() {
                    terminal = Some(TerminationReason::ServerUnavailable {
                        tool_name: call.tool_name.clone(),
                        message: result.error().map(|e| e.message.clone()).unwrap_or_default(),
                    });
                }
            }

            if let Step::Finish(reason) = state.on_tools_resolved(terminal)? {
                let text = termination_message(&reason);
                return self.finish(conversation, text, reason, &state, dispatched);
            }
        }
    }

    /// Drop everything cached for a conversation that has ended.
    pub fn close_conversation(&self, conversation_id: &ConversationId) -> bool {
        self.context.retrieval.close(conversation_id)
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, OrchestratorError> {
        match &self.cancellation_token {
            Some(token) => tokio::select! {
                response = self.gateway.complete(request) => Ok(response?),
                _ = token.cancelled() => Err(OrchestratorError::Cancelled),
            },
            None => Ok(self.gateway.complete(request).await?),
        }
    }

    fn finish(
        &self,
        conversation: &mut Conversation,
        text: String,
        reason: TerminationReason,
        state: &OrchestrationState,
        tool_calls: usize,
    ) -> Result<RunOutcome, OrchestratorError> {
        conversation.push(Message::assistant(text.clone()))?;

        match &reason {
            TerminationReason::Completed => {
                info!(rounds = state.rounds(), tool_calls, "Run completed");
            }
            other => {
                warn!(rounds = state.rounds(), reason = ?other, "Run terminated early");
            }
        }
        self.progress.on_terminated(&reason);
        self.logger.log(ConversationEvent::new(
            event_type::RUN_TERMINATED,
            json!({
                "termination": reason,
                "rounds": state.rounds(),
                "tool_calls": tool_calls,
            }),
        ));

        Ok(RunOutcome {
            final_message: text,
            termination: reason,
            rounds: state.rounds(),
            tool_calls,
        })
    }

    fn check_cancelled(&self) -> Result<(), OrchestratorError> {
        if let Some(token) = &self.cancellation_token
            && token.is_cancelled()
        {
            return Err(OrchestratorError::Cancelled);
        }
        Ok(())
    }
}

fn termination_message(reason: &TerminationReason) -> String {
    match reason {
        TerminationReason::Completed => String::new(),
        TerminationReason::DepthExceeded { max_depth } => depth_exceeded_message(*max_depth),
        TerminationReason::ServerUnavailable { tool_name, message } => {
            server_unavailable_message(tool_name, message)
        }
    }
}

/// Give every call of one batch a usable, unique id.
fn normalize_call_ids(calls: &mut [ToolCall], round: usize) {
    let mut seen = HashSet::new();
    for (idx, call) in calls.iter_mut().enumerate() {
        if call.id.trim().is_empty() || !seen.insert(call.id.clone()) {
            let replacement = format!("call_{}_{}", round, idx);
            warn!(tool = %call.tool_name, id = %call.id, replacement = %replacement, "Replacing unusable tool call id");
            call.id = replacement.clone();
            seen.insert(replacement);
        }
    }
}

/// Answer every outstanding call so the transcript stays well-formed.
fn close_open_calls(conversation: &mut Conversation, calls: &[ToolCall]) -> Result<(), ConversationError> {
    for call in calls {
        let result = ToolResult::failure(
            &call.id,
            &call.tool_name,
            ToolError::execution_failed("Cancelled before completion"),
        );
        conversation.push(Message::tool_result(&call.id, result.to_message_content()))?;
    }
    Ok(())
}
