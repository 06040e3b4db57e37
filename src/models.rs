//! Core data models for the support assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

//
// ================= Transcript =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// A single entry of the chat transcript. Never mutated after it is appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<Account>>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            suggestions: None,
            accounts: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            suggestions: None,
            accounts: None,
            created_at: Utc::now(),
        }
    }

    /// FAQ answers carry their related questions as suggestions.
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }

    /// Model answers may carry the balance snapshot fetched during the turn.
    pub fn with_accounts(mut self, accounts: Option<Vec<Account>>) -> Self {
        self.accounts = accounts.filter(|a| !a.is_empty());
        self
    }

    pub fn is_assistant(&self) -> bool {
        self.speaker == Speaker::Assistant
    }
}

/// Explicit phases of a single `handle_utterance` call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    ResolvingFaq,
    AwaitingModel,
    Appending,
}

impl TurnState {
    pub fn is_working(self) -> bool {
        self != TurnState::Idle
    }
}

//
// ================= Accounts =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountKind {
    Checking,
    Savings,
}

/// Read-only balance snapshot produced by the balance tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    #[serde(rename = "type")]
    pub kind: AccountKind,
    #[serde(rename = "number")]
    pub masked_number: String,
    pub balance: f64,
}

/// Format an amount as US dollars, e.g. `$12,345.67`.
///
/// Balances are display-only `f64` snapshots. The amount is rounded half away
/// from zero to whole cents before formatting.
pub fn format_usd(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

//
// ================= FAQ =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_questions: Option<Vec<String>>,
}

/// Document shape of the static FAQ resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqDocument {
    pub faqs: Vec<FaqEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqMatch {
    pub answer: String,
    pub related_questions: Vec<String>,
}

//
// ================= Tool I/O =================
//

/// The closed set of operations the model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetAccountBalance,
    BlockCard,
    GenerateOrResetPin,
    ReplaceCard,
    ActivateDeactivateCard,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::GetAccountBalance,
        ToolName::BlockCard,
        ToolName::GenerateOrResetPin,
        ToolName::ReplaceCard,
        ToolName::ActivateDeactivateCard,
    ];

    /// Wire name used in function declarations and calls
    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::GetAccountBalance => "getAccountBalance",
            ToolName::BlockCard => "blockCard",
            ToolName::GenerateOrResetPin => "generateOrResetPin",
            ToolName::ReplaceCard => "replaceCard",
            ToolName::ActivateDeactivateCard => "activateDeactivateCard",
        }
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardAction {
    Activate,
    Deactivate,
}

impl FromStr for CardAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "activate" => Ok(CardAction::Activate),
            "deactivate" => Ok(CardAction::Deactivate),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for CardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CardAction::Activate => "activate",
            CardAction::Deactivate => "deactivate",
        };
        write!(f, "{}", s)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            args,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Read a required string argument
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Text(String),
    Accounts(Vec<Account>),
    Failed(String),
    Unknown { name: String },
}

impl ToolResult {
    /// Payload placed under `functionResponse.response`
    pub fn to_payload(&self) -> Value {
        match self {
            ToolResult::Text(text) => json!({ "result": text }),
            ToolResult::Accounts(accounts) => json!({ "result": accounts }),
            ToolResult::Failed(message) => json!({ "error": message }),
            ToolResult::Unknown { name } => {
                json!({ "result": format!("Unknown function: {}", name) })
            }
        }
    }
}

/// A tool result keyed by the originating call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub id: Option<String>,
    pub name: String,
    pub result: ToolResult,
}

//
// ================= Assistant Reply =================
//

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub text: String,
    pub accounts: Option<Vec<Account>>,
}

impl AssistantReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            accounts: None,
        }
    }
}
