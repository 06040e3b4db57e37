//! Remote model client
//!
//! [`ChatBackend`] starts conversations and [`ChatSession`] carries one of
//! them. The Gemini implementation keeps the conversation history locally and
//! replays it on every `generateContent` call, with the banking tools declared
//! as functions. Uses a long-lived reqwest::Client for connection pooling.

use crate::config::SupportConfig;
use crate::error::SupportError;
use crate::models::{FunctionCall, FunctionResponse};
use crate::tools::ToolDeclaration;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub const SYSTEM_INSTRUCTION: &str = r#"You are the virtual support assistant of Starlight Bank. Help customers with banking questions quickly, clearly and safely.

Tone:
- Be empathetic, patient and clear. Acknowledge the customer's situation before answering.
- Keep answers concise, friendly and free of jargon.

Scope:
- Accounts: balances, statements, recent transactions, deposits.
- Cards: blocking lost or stolen cards, PIN generation or reset, replacing damaged cards, activation and deactivation.
- Payments and transfers, loans and EMIs, KYC and profile updates, online and mobile banking, complaints, branch and ATM information.

Tools:
- Use getAccountBalance when the customer asks for their balance.
- Use blockCard, generateOrResetPin, replaceCard and activateDeactivateCard for card requests. Ask which card (debit or credit) if it is unclear.

Safety:
- Never ask for full card numbers, passwords, PINs, CVV or OTPs.
- For sensitive changes, direct the customer to the official mobile app or a branch.
- Never invent policies, rates or numbers. If you are unsure, ask a short clarifying question.

Format: acknowledgement, clear steps, a useful tip if relevant, and an offer of further help."#;

/// What the caller sends on one leg of the conversation
#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    Message(String),
    ToolResponses(Vec<FunctionResponse>),
}

/// Model output for one leg: text and any requested function calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            function_calls: Vec::new(),
        }
    }

    pub fn calls(function_calls: Vec<FunctionCall>) -> Self {
        Self {
            text: String::new(),
            function_calls,
        }
    }
}

/// One live, stateful conversation with the model
#[async_trait]
pub trait ChatSession: Send {
    async fn send(&mut self, input: ModelInput) -> Result<ModelResponse>;

    /// Marker for the current end of the conversation history.
    fn checkpoint(&self) -> usize;

    /// Forget everything exchanged after `checkpoint`.
    fn rollback(&mut self, checkpoint: usize);
}

/// Factory for conversations sharing one configuration
pub trait ChatBackend: Send + Sync {
    fn start_session(&self) -> Result<Box<dyn ChatSession>>;
}

struct GeminiInner {
    client: Client,
    api_key: String,
    endpoint: String,
    system_instruction: Content,
    tools: Vec<ToolSet>,
}

/// Reusable Gemini client (connection-pooled)
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiInner>,
}

impl GeminiClient {
    pub fn new(config: &SupportConfig, declarations: Vec<ToolDeclaration>) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or(SupportError::MissingApiKey)?;

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.request_timeout)
            .build()?;

        info!(model = %config.model, tools = declarations.len(), "Gemini client ready");

        Ok(Self {
            inner: Arc::new(GeminiInner {
                client,
                api_key,
                endpoint: format!("{}/models/{}:generateContent", config.base_url, config.model),
                system_instruction: Content::text(None, SYSTEM_INSTRUCTION),
                tools: vec![ToolSet {
                    function_declarations: declarations,
                }],
            }),
        })
    }
}

impl ChatBackend for GeminiClient {
    fn start_session(&self) -> Result<Box<dyn ChatSession>> {
        Ok(Box::new(GeminiChatSession {
            inner: Arc::clone(&self.inner),
            history: Vec::new(),
        }))
    }
}

pub struct GeminiChatSession {
    inner: Arc<GeminiInner>,
    history: Vec<Content>,
}

impl GeminiChatSession {
    async fn generate(&self) -> Result<GenerateContentResponse> {
        let request = GenerateContentRequest {
            contents: &self.history,
            system_instruction: &self.inner.system_instruction,
            tools: &self.inner.tools,
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
        };

        debug!(turns = self.history.len(), "Calling Gemini API");

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("x-goog-api-key", &self.inner.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                SupportError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response ({}): {}", status, error_text);
            return Err(SupportError::LlmError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            SupportError::LlmError(format!("Gemini parse error: {}", e))
        })
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send(&mut self, input: ModelInput) -> Result<ModelResponse> {
        let rollback_len = self.history.len();
        self.history.push(Content::from_input(input));

        let outcome = match self.generate().await {
            Ok(raw) => split_candidate(raw),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((content, response)) => {
                self.history.push(content);
                Ok(response)
            }
            Err(e) => {
                self.history.truncate(rollback_len);
                Err(e)
            }
        }
    }

    fn checkpoint(&self) -> usize {
        self.history.len()
    }

    fn rollback(&mut self, checkpoint: usize) {
        if checkpoint < self.history.len() {
            debug!(
                dropped = self.history.len() - checkpoint,
                "Rolling back unfinished turn"
            );
            self.history.truncate(checkpoint);
        }
    }
}

/// Pull the first candidate out of a response, returning the model content
/// for the history alongside the parsed text and calls.
fn split_candidate(response: GenerateContentResponse) -> Result<(Content, ModelResponse)> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| SupportError::LlmError("No response from Gemini API".to_string()))?;

    let content = candidate.content.ok_or_else(|| {
        SupportError::LlmError(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    let mut parsed = ModelResponse::default();
    for part in &content.parts {
        if let Some(text) = &part.text {
            parsed.text.push_str(text);
        }
        if let Some(call) = &part.function_call {
            parsed.function_calls.push(call.clone());
        }
    }

    if parsed.text.trim().is_empty() && parsed.function_calls.is_empty() {
        return Err(SupportError::LlmError("Empty response from Gemini".to_string()));
    }

    let content = Content {
        role: Some("model".to_string()),
        parts: content.parts,
    };

    Ok((content, parsed))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    system_instruction: &'a Content,
    tools: &'a [ToolSet],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSet {
    function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
                ..Part::default()
            }],
        }
    }

    fn from_input(input: ModelInput) -> Self {
        match input {
            ModelInput::Message(text) => Self::text(Some("user"), &text),
            ModelInput::ToolResponses(responses) => Self {
                role: Some("user".to_string()),
                parts: responses
                    .into_iter()
                    .map(|r| Part {
                        function_response: Some(FunctionResponsePart {
                            id: r.id,
                            response: r.result.to_payload(),
                            name: r.name,
                        }),
                        ..Part::default()
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponsePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponsePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolLatency;
    use crate::models::ToolResult;
    use crate::tools::create_default_registry;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let declarations = create_default_registry(ToolLatency::zero()).declarations();
        let tools = vec![ToolSet {
            function_declarations: declarations,
        }];
        let history = vec![Content::text(Some("user"), "What is my balance?")];
        let system = Content::text(None, SYSTEM_INSTRUCTION);
        let request = GenerateContentRequest {
            contents: &history,
            system_instruction: &system,
            tools: &tools,
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "What is my balance?");
        assert!(json["systemInstruction"]["parts"][0]["text"].is_string());
        assert_eq!(json["tools"][0]["functionDeclarations"][1]["name"], "blockCard");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_tool_responses_become_function_response_parts() {
        let content = Content::from_input(ModelInput::ToolResponses(vec![FunctionResponse {
            id: Some("call-1".to_string()),
            name: "blockCard".to_string(),
            result: ToolResult::Text("blocked".to_string()),
        }]));

        let json = serde_json::to_value(&content).unwrap();
        let part = &json["parts"][0]["functionResponse"];
        assert_eq!(part["id"], "call-1");
        assert_eq!(part["name"], "blockCard");
        assert_eq!(part["response"]["result"], "blocked");
    }

    #[test]
    fn test_parse_function_call_response() {
        let raw: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "id": "abc",
                            "name": "blockCard",
                            "args": { "cardType": "debit card" }
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let (content, response) = split_candidate(raw).unwrap();
        assert_eq!(content.role.as_deref(), Some("model"));
        assert_eq!(response.function_calls.len(), 1);
        assert_eq!(response.function_calls[0].id.as_deref(), Some("abc"));
        assert_eq!(response.function_calls[0].str_arg("cardType"), Some("debit card"));
    }

    #[test]
    fn test_parse_text_parts_are_joined() {
        let raw: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello, " }, { "text": "how can I help?" }] }
            }]
        }))
        .unwrap();

        let (_, response) = split_candidate(raw).unwrap();
        assert_eq!(response.text, "Hello, how can I help?");
        assert!(response.function_calls.is_empty());
    }

    #[test]
    fn test_empty_candidates_is_error() {
        let raw: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(split_candidate(raw), Err(SupportError::LlmError(_))));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = split_candidate(blocked).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_rollback_trims_history_to_checkpoint() {
        let config = SupportConfig {
            api_key: Some("test-key".to_string()),
            ..SupportConfig::default()
        };
        let client = GeminiClient::new(&config, vec![]).unwrap();
        let mut session = GeminiChatSession {
            inner: Arc::clone(&client.inner),
            history: vec![Content::text(Some("user"), "hi")],
        };

        let mark = session.checkpoint();
        session.history.push(Content {
            role: Some("model".to_string()),
            parts: vec![Part {
                function_call: Some(FunctionCall::new("getAccountBalance", json!({}))),
                ..Part::default()
            }],
        });
        session.history.push(Content::text(Some("user"), "again"));

        session.rollback(mark);
        assert_eq!(session.history.len(), 1);

        session.rollback(10);
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_missing_api_key() {
        let config = SupportConfig::default();
        let result = GeminiClient::new(&config, vec![]);
        assert!(matches!(result, Err(SupportError::MissingApiKey)));
    }
}
