//! Assistant session
//!
//! Drives one model conversation through the tool-call round-trip:
//! send the user's text, run every requested tool in order, return the
//! batch of results, and repeat until the model answers in plain text.
//! Failures never escape `send`; they become the fixed fallback reply.

use crate::error::SupportError;
use crate::gemini::{ChatBackend, ChatSession, ModelInput, ModelResponse};
use crate::models::{Account, AssistantReply, FunctionResponse, ToolResult};
use crate::tools::ToolRegistry;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const FALLBACK_TEXT: &str = "I'm sorry, I encountered a technical issue while processing your request. Please try again or reach out to our customer support for immediate assistance.";

/// Limits applied to a single `send`
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_tool_rounds: usize,
    pub turn_timeout: Duration,
}

pub struct AssistantSession {
    id: Uuid,
    chat: Box<dyn ChatSession>,
    tools: Arc<ToolRegistry>,
    limits: SessionLimits,
}

impl AssistantSession {
    pub fn start(
        backend: &dyn ChatBackend,
        tools: Arc<ToolRegistry>,
        limits: SessionLimits,
    ) -> Result<Self> {
        let chat = backend.start_session()?;
        let id = Uuid::new_v4();

        info!(session_id = %id, "Assistant session started");

        Ok(Self {
            id,
            chat,
            tools,
            limits,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Send the user's text and return the final answer, or the fallback
    /// text if anything in the round-trip fails.
    ///
    /// A failed turn is rolled back as a whole, so the next turn starts from
    /// the last completed exchange and never after an unanswered function call.
    pub async fn send(&mut self, user_text: &str) -> AssistantReply {
        let checkpoint = self.chat.checkpoint();
        let timeout = self.limits.turn_timeout;
        let outcome = match tokio::time::timeout(timeout, self.round_trip(user_text)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SupportError::Timeout(timeout.as_secs())),
        };

        match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Assistant turn failed, returning fallback");
                self.chat.rollback(checkpoint);
                AssistantReply::text(FALLBACK_TEXT)
            }
        }
    }

    async fn round_trip(&mut self, user_text: &str) -> Result<AssistantReply> {
        let mut response = self
            .chat
            .send(ModelInput::Message(user_text.to_string()))
            .await?;
        let mut accounts: Option<Vec<Account>> = None;
        let mut rounds = 0;

        while !response.function_calls.is_empty() {
            if rounds >= self.limits.max_tool_rounds {
                return Err(SupportError::ToolRoundsExceeded(self.limits.max_tool_rounds));
            }
            rounds += 1;

            let responses = run_tools(&self.tools, &response, &mut accounts).await;
            response = self.chat.send(ModelInput::ToolResponses(responses)).await?;
        }

        debug!(session_id = %self.id, rounds, "Assistant produced final answer");

        Ok(AssistantReply {
            text: response.text,
            accounts,
        })
    }
}

/// Run one round of calls sequentially, in the order the model emitted them.
async fn run_tools(
    tools: &ToolRegistry,
    response: &ModelResponse,
    accounts: &mut Option<Vec<Account>>,
) -> Vec<FunctionResponse> {
    let mut responses = Vec::with_capacity(response.function_calls.len());

    for call in &response.function_calls {
        let executed = tools.dispatch(call).await;

        if let ToolResult::Accounts(fetched) = &executed.result {
            // last balance lookup of the turn wins
            *accounts = Some(fetched.clone());
        }

        responses.push(executed);
    }

    responses
}
