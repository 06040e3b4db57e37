//! Account tool adapter
//!
//! The five banking operations the assistant may call. Each one simulates a
//! backend round-trip with a fixed delay and never touches real accounts.
//! Dispatch goes through the closed [`ToolName`] enum; names outside it
//! resolve to [`ToolResult::Unknown`].

use crate::config::ToolLatency;
use crate::error::SupportError;
use crate::models::{
    Account, AccountKind, CardAction, FunctionCall, FunctionResponse, ToolName, ToolResult,
};
use crate::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for a single account operation
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;
    fn description(&self) -> &'static str;
    /// JSON schema of the call arguments
    fn parameters(&self) -> Value;
    async fn execute(&self, call: &FunctionCall) -> Result<ToolResult>;
}

/// Function declaration advertised to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: ToolName) -> Option<Arc<dyn Tool>> {
        self.tools.get(&name).cloned()
    }

    /// Registered tools in declaration order
    pub fn list(&self) -> Vec<ToolName> {
        ToolName::ALL
            .into_iter()
            .filter(|name| self.tools.contains_key(name))
            .collect()
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.list()
            .into_iter()
            .filter_map(|name| self.get(name))
            .map(|tool| ToolDeclaration {
                name: tool.name().as_str(),
                description: tool.description(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Run one model-requested call. Never fails: unknown names and tool
    /// errors become result variants that are reported back to the model.
    pub async fn dispatch(&self, call: &FunctionCall) -> FunctionResponse {
        let result = match call.name.parse::<ToolName>().ok().and_then(|n| self.get(n)) {
            Some(tool) => {
                debug!(tool = %call.name, args = %call.args, "Dispatching tool call");
                match tool.execute(call).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool execution failed");
                        ToolResult::Failed(e.to_string())
                    }
                }
            }
            None => {
                warn!(tool = %call.name, "Unknown function call");
                ToolResult::Unknown {
                    name: call.name.clone(),
                }
            }
        };

        FunctionResponse {
            id: call.id.clone(),
            name: call.name.clone(),
            result,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed demo portfolio returned by the balance lookup.
pub fn demo_accounts() -> Vec<Account> {
    vec![
        Account {
            kind: AccountKind::Checking,
            masked_number: "...1234".to_string(),
            balance: 5432.10,
        },
        Account {
            kind: AccountKind::Savings,
            masked_number: "...5678".to_string(),
            balance: 12345.67,
        },
    ]
}

async fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn require_card_type(call: &FunctionCall) -> Result<&str> {
    call.str_arg("cardType")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            SupportError::InvalidToolInput(format!("Expected 'cardType' for {}", call.name))
        })
}

fn card_type_schema(description: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "cardType": {
                "type": "STRING",
                "description": description,
            }
        },
        "required": ["cardType"],
    })
}

pub struct AccountBalanceTool {
    delay: Duration,
}

impl AccountBalanceTool {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl Tool for AccountBalanceTool {
    fn name(&self) -> ToolName {
        ToolName::GetAccountBalance
    }

    fn description(&self) -> &'static str {
        "Gets the current balance for all of the user's bank accounts, such as checking and savings."
    }

    fn parameters(&self) -> Value {
        json!({ "type": "OBJECT", "properties": {}, "required": [] })
    }

    async fn execute(&self, _call: &FunctionCall) -> Result<ToolResult> {
        simulate_latency(self.delay).await;
        Ok(ToolResult::Accounts(demo_accounts()))
    }
}

pub struct BlockCardTool {
    delay: Duration,
}

impl BlockCardTool {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl Tool for BlockCardTool {
    fn name(&self) -> ToolName {
        ToolName::BlockCard
    }

    fn description(&self) -> &'static str {
        "Blocks a user's lost or stolen debit or credit card immediately."
    }

    fn parameters(&self) -> Value {
        card_type_schema("The type of card to block (e.g., \"debit card\", \"credit card\").")
    }

    async fn execute(&self, call: &FunctionCall) -> Result<ToolResult> {
        let card_type = require_card_type(call)?;
        simulate_latency(self.delay).await;

        Ok(ToolResult::Text(format!(
            "I'm sorry to hear that your {card} card is lost or stolen. I have initiated the process \
             to block your {card} card immediately. A confirmation message will be sent to your \
             registered mobile number shortly.",
            card = card_type
        )))
    }
}

pub struct PinResetTool {
    delay: Duration,
}

impl PinResetTool {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl Tool for PinResetTool {
    fn name(&self) -> ToolName {
        ToolName::GenerateOrResetPin
    }

    fn description(&self) -> &'static str {
        "Guides the user on how to generate a new PIN or reset an existing PIN for their debit or credit card securely."
    }

    fn parameters(&self) -> Value {
        card_type_schema("The type of card (e.g., \"debit card\", \"credit card\").")
    }

    async fn execute(&self, call: &FunctionCall) -> Result<ToolResult> {
        let card_type = require_card_type(call)?;
        simulate_latency(self.delay).await;

        Ok(ToolResult::Text(format!(
            "I understand you'd like to generate or reset your PIN for your {} card. For your \
             security, please use our official mobile banking app or visit the nearest branch to \
             complete this process. I can guide you through the steps on the app if you'd like.",
            card_type
        )))
    }
}

pub struct ReplaceCardTool {
    delay: Duration,
}

impl ReplaceCardTool {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl Tool for ReplaceCardTool {
    fn name(&self) -> ToolName {
        ToolName::ReplaceCard
    }

    fn description(&self) -> &'static str {
        "Initiates the process to replace a damaged debit or credit card for the user."
    }

    fn parameters(&self) -> Value {
        card_type_schema("The type of card to replace (e.g., \"debit card\", \"credit card\").")
    }

    async fn execute(&self, call: &FunctionCall) -> Result<ToolResult> {
        let card_type = require_card_type(call)?;
        simulate_latency(self.delay).await;

        Ok(ToolResult::Text(format!(
            "I've initiated a request to replace your damaged {} card. A new card will be \
             dispatched to your registered address within 5-7 business days. You'll receive an \
             SMS with tracking details.",
            card_type
        )))
    }
}

pub struct CardStatusTool {
    delay: Duration,
}

impl CardStatusTool {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl Tool for CardStatusTool {
    fn name(&self) -> ToolName {
        ToolName::ActivateDeactivateCard
    }

    fn description(&self) -> &'static str {
        "Activates or deactivates a user's debit or credit card."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "cardType": {
                    "type": "STRING",
                    "description": "The type of card (e.g., \"debit card\", \"credit card\").",
                },
                "action": {
                    "type": "STRING",
                    "description": "The action to perform: \"activate\" or \"deactivate\".",
                    "enum": ["activate", "deactivate"],
                }
            },
            "required": ["cardType", "action"],
        })
    }

    async fn execute(&self, call: &FunctionCall) -> Result<ToolResult> {
        let card_type = require_card_type(call)?;
        let action = call
            .str_arg("action")
            .ok_or_else(|| {
                SupportError::InvalidToolInput("Expected 'action' (activate or deactivate)".to_string())
            })?
            .parse::<CardAction>()
            .map_err(|other| {
                SupportError::InvalidToolInput(format!(
                    "Unsupported action '{}': expected activate or deactivate",
                    other
                ))
            })?;
        simulate_latency(self.delay).await;

        Ok(ToolResult::Text(format!(
            "I've processed your request to {} your {} card. A confirmation SMS will be sent to \
             your registered mobile number.",
            action, card_type
        )))
    }
}

/// Registry with all five account operations.
pub fn create_default_registry(latency: ToolLatency) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(AccountBalanceTool::new(latency.balance)));
    registry.register(Arc::new(BlockCardTool::new(latency.card)));
    registry.register(Arc::new(PinResetTool::new(latency.card)));
    registry.register(Arc::new(ReplaceCardTool::new(latency.card)));
    registry.register(Arc::new(CardStatusTool::new(latency.card)));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ToolRegistry {
        create_default_registry(ToolLatency::zero())
    }

    #[test]
    fn test_declarations_cover_all_tools_in_order() {
        let names: Vec<&str> = registry().declarations().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "getAccountBalance",
                "blockCard",
                "generateOrResetPin",
                "replaceCard",
                "activateDeactivateCard",
            ]
        );
    }

    #[tokio::test]
    async fn test_balance_returns_demo_portfolio() {
        let response = registry()
            .dispatch(&FunctionCall::new("getAccountBalance", json!({})).with_id("c1"))
            .await;
        assert_eq!(response.id.as_deref(), Some("c1"));
        assert_eq!(response.result, ToolResult::Accounts(demo_accounts()));
    }

    #[tokio::test]
    async fn test_block_card_is_idempotent() {
        let registry = registry();
        let call = FunctionCall::new("blockCard", json!({ "cardType": "debit card" }));
        let first = registry.dispatch(&call).await.result;
        let second = registry.dispatch(&call).await.result;
        assert_eq!(first, second);
        match first {
            ToolResult::Text(text) => assert!(text.contains("block your debit card")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pin_guidance_never_contains_digits() {
        let result = registry()
            .dispatch(&FunctionCall::new("generateOrResetPin", json!({ "cardType": "credit card" })))
            .await
            .result;
        let ToolResult::Text(text) = result else {
            panic!("expected text");
        };
        assert!(!text.chars().any(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_replace_card_mentions_sla() {
        let result = registry()
            .dispatch(&FunctionCall::new("replaceCard", json!({ "cardType": "debit card" })))
            .await
            .result;
        assert!(matches!(result, ToolResult::Text(ref t) if t.contains("5-7 business days")));
    }

    #[tokio::test]
    async fn test_activate_deactivate() {
        let registry = registry();
        let result = registry
            .dispatch(&FunctionCall::new(
                "activateDeactivateCard",
                json!({ "cardType": "credit card", "action": "deactivate" }),
            ))
            .await
            .result;
        assert!(matches!(result, ToolResult::Text(ref t) if t.contains("deactivate your credit card")));

        let rejected = registry
            .dispatch(&FunctionCall::new(
                "activateDeactivateCard",
                json!({ "cardType": "credit card", "action": "freeze" }),
            ))
            .await
            .result;
        assert!(matches!(rejected, ToolResult::Failed(ref m) if m.contains("freeze")));
    }

    #[tokio::test]
    async fn test_missing_card_type_is_failed_result() {
        let result = registry()
            .dispatch(&FunctionCall::new("blockCard", json!({})))
            .await
            .result;
        assert!(matches!(result, ToolResult::Failed(_)));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let response = registry()
            .dispatch(&FunctionCall::new("transferFunds", json!({ "amount": 10 })).with_id("x"))
            .await;
        assert_eq!(response.name, "transferFunds");
        assert_eq!(
            response.result,
            ToolResult::Unknown {
                name: "transferFunds".to_string()
            }
        );
    }
}
