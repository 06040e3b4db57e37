//! Turn controller
//!
//! Entry point for every user utterance:
//!
//! IDLE → RESOLVING_FAQ → (AWAITING_MODEL) → APPENDING → IDLE
//!
//! The controller owns the transcript and the live assistant session. Both are
//! replaced together by `clear_chat`, and each chat gets a fresh id so a reply
//! that arrives after a clear is dropped instead of landing in the new chat.

use crate::assistant::{AssistantSession, SessionLimits};
use crate::config::SupportConfig;
use crate::error::SupportError;
use crate::faq::{FaqResolver, FileFaqSource};
use crate::gemini::{ChatBackend, GeminiClient};
use crate::models::{Turn, TurnState};
use crate::tools::{create_default_registry, ToolRegistry};
use crate::Result;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const GREETING_TEXT: &str =
    "Hello! I'm your virtual assistant from Starlight Bank. How can I help you today?";

pub const UNEXPECTED_ERROR_TEXT: &str = "I'm sorry, an unexpected error occurred. Please try again.";

/// Ordered, append-only list of turns for the current chat.
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn with_greeting() -> Self {
        Self {
            turns: vec![Turn::assistant(GREETING_TEXT)],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub limits: SessionLimits,
    /// Pause before showing an FAQ answer
    pub faq_reply_delay: Duration,
}

impl ControllerOptions {
    pub fn from_config(config: &SupportConfig) -> Self {
        Self {
            limits: SessionLimits {
                max_tool_rounds: config.max_tool_rounds,
                turn_timeout: config.turn_timeout,
            },
            faq_reply_delay: config.faq_reply_delay,
        }
    }
}

type SessionHandle = Arc<tokio::sync::Mutex<AssistantSession>>;

struct ControllerState {
    chat_id: Uuid,
    transcript: Transcript,
    session: Option<SessionHandle>,
    turn_state: TurnState,
}

pub struct TurnController {
    faq: Arc<FaqResolver>,
    backend: Option<Arc<dyn ChatBackend>>,
    tools: Arc<ToolRegistry>,
    options: ControllerOptions,
    state: Mutex<ControllerState>,
}

impl TurnController {
    /// Create a controller and start the first chat. Without a backend the
    /// FAQ path still works; model-bound questions get an error turn.
    pub fn new(
        faq: Arc<FaqResolver>,
        backend: Option<Arc<dyn ChatBackend>>,
        tools: Arc<ToolRegistry>,
        options: ControllerOptions,
    ) -> Self {
        let mut controller = Self {
            faq,
            backend,
            tools,
            options,
            state: Mutex::new(ControllerState {
                chat_id: Uuid::nil(),
                transcript: Transcript::with_greeting(),
                session: None,
                turn_state: TurnState::Idle,
            }),
        };

        let (chat_id, session) = controller.start_session();
        let state = controller.state.get_mut().unwrap_or_else(|p| p.into_inner());
        state.chat_id = chat_id;
        state.session = session;

        controller
    }

    /// Wire the FAQ file, the account tools and the Gemini client from config.
    pub fn from_config(config: &SupportConfig) -> Self {
        let faq = Arc::new(FaqResolver::new(Arc::new(FileFaqSource::new(
            config.faq_path.clone(),
        ))));
        let tools = Arc::new(create_default_registry(config.tool_latency));

        let backend: Option<Arc<dyn ChatBackend>> =
            match GeminiClient::new(config, tools.declarations()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Assistant unavailable, only FAQ answers will work: {}", e);
                    None
                }
            };

        Self::new(faq, backend, tools, ControllerOptions::from_config(config))
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn start_session(&self) -> (Uuid, Option<SessionHandle>) {
        let Some(backend) = self.backend.as_deref() else {
            return (Uuid::new_v4(), None);
        };

        match AssistantSession::start(backend, Arc::clone(&self.tools), self.options.limits) {
            Ok(session) => (
                session.id(),
                Some(Arc::new(tokio::sync::Mutex::new(session))),
            ),
            Err(e) => {
                error!("Failed to start assistant session: {}", e);
                (Uuid::new_v4(), None)
            }
        }
    }

    /// Record the utterance, resolve it, and append the assistant's turn.
    ///
    /// Rejects blank input and input that arrives while another utterance
    /// is still being resolved.
    pub async fn handle_utterance(&self, user_text: &str) -> Result<()> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(SupportError::EmptyMessage);
        }

        let chat_id = {
            let mut state = self.lock_state();
            if state.turn_state.is_working() {
                return Err(SupportError::Busy);
            }
            state.transcript.push(Turn::user(text));
            state.turn_state = TurnState::ResolvingFaq;
            state.chat_id
        };

        let _working = WorkingGuard {
            controller: self,
            chat_id,
        };

        let Some(turn) = self.resolve(text, chat_id).await else {
            return Ok(());
        };

        let mut state = self.lock_state();
        if state.chat_id != chat_id {
            debug!(%chat_id, "Chat was cleared, discarding stale reply");
            return Ok(());
        }
        state.turn_state = TurnState::Appending;
        state.transcript.push(turn);

        Ok(())
    }

    /// `None` when the chat was cleared before the model was reached.
    async fn resolve(&self, text: &str, chat_id: Uuid) -> Option<Turn> {
        if let Some(hit) = self.faq.resolve(text).await {
            info!(%chat_id, "Answered from FAQ");
            if !self.options.faq_reply_delay.is_zero() {
                tokio::time::sleep(self.options.faq_reply_delay).await;
            }
            return Some(Turn::assistant(hit.answer).with_suggestions(hit.related_questions));
        }

        let session = {
            let mut state = self.lock_state();
            if state.chat_id != chat_id {
                return None;
            }
            state.turn_state = TurnState::AwaitingModel;
            state.session.clone()
        };

        info!(%chat_id, "No FAQ match, delegating to assistant");

        match session.ok_or(SupportError::SessionNotInitialized) {
            Ok(session) => {
                let reply = session.lock().await.send(text).await;
                Some(Turn::assistant(reply.text).with_accounts(reply.accounts))
            }
            Err(e) => {
                error!(%chat_id, "{}", e);
                Some(Turn::assistant(UNEXPECTED_ERROR_TEXT))
            }
        }
    }

    /// Drop the transcript and session and start over with the greeting.
    /// A reply still in flight for the old chat is discarded when it lands.
    pub fn clear_chat(&self) {
        let (chat_id, session) = self.start_session();

        let mut state = self.lock_state();
        let previous = state.chat_id;
        state.chat_id = chat_id;
        state.session = session;
        state.transcript = Transcript::with_greeting();
        state.turn_state = TurnState::Idle;

        info!(%previous, %chat_id, "Chat cleared");
    }

    pub fn transcript(&self) -> Vec<Turn> {
        self.lock_state().transcript.turns().to_vec()
    }

    pub fn turn_state(&self) -> TurnState {
        self.lock_state().turn_state
    }

    pub fn is_working(&self) -> bool {
        self.turn_state().is_working()
    }

    pub fn has_session(&self) -> bool {
        self.lock_state().session.is_some()
    }

    pub fn chat_id(&self) -> Uuid {
        self.lock_state().chat_id
    }

    /// Suggestions to show: only those of the newest turn, only when it is
    /// an assistant turn, and only while idle.
    pub fn visible_suggestions(&self) -> Option<Vec<String>> {
        let state = self.lock_state();
        if state.turn_state.is_working() {
            return None;
        }
        state
            .transcript
            .last()
            .filter(|turn| turn.is_assistant())
            .and_then(|turn| turn.suggestions.clone())
            .filter(|s| !s.is_empty())
    }
}

/// Returns the controller to idle however `handle_utterance` ends,
/// unless the chat it belongs to has been cleared meanwhile.
struct WorkingGuard<'a> {
    controller: &'a TurnController,
    chat_id: Uuid,
}

impl Drop for WorkingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock_state();
        if state.chat_id == self.chat_id {
            state.turn_state = TurnState::Idle;
        }
    }
}
