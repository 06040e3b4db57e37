//! Runtime configuration
//!
//! Everything is read from the process environment (after `.env` is loaded by
//! the binary). Latencies default to the demo values of the widget.

use crate::error::SupportError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_FAQ_PATH: &str = "data/faq.json";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

/// Simulated backend latency per account operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolLatency {
    pub balance: Duration,
    pub card: Duration,
}

impl ToolLatency {
    pub const fn zero() -> Self {
        Self {
            balance: Duration::ZERO,
            card: Duration::ZERO,
        }
    }

    pub const fn uniform(delay: Duration) -> Self {
        Self {
            balance: delay,
            card: delay,
        }
    }
}

impl Default for ToolLatency {
    fn default() -> Self {
        Self {
            balance: Duration::from_millis(300),
            card: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupportConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub faq_path: PathBuf,
    pub max_tool_rounds: usize,
    pub request_timeout: Duration,
    pub turn_timeout: Duration,
    pub tool_latency: ToolLatency,
    pub faq_reply_delay: Duration,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            faq_path: PathBuf::from(DEFAULT_FAQ_PATH),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            request_timeout: Duration::from_secs(30),
            turn_timeout: Duration::from_secs(60),
            tool_latency: ToolLatency::default(),
            faq_reply_delay: Duration::from_millis(500),
        }
    }
}

impl SupportConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .or_else(|| get("API_KEY"))
            .filter(|key| key != "your_gemini_api_key_here");

        let tool_latency = match get("TOOL_LATENCY_MS") {
            Some(raw) => ToolLatency::uniform(Duration::from_millis(parse_value(
                "TOOL_LATENCY_MS",
                &raw,
            )?)),
            None => defaults.tool_latency,
        };

        Ok(Self {
            api_key,
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: get("GEMINI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            faq_path: get("FAQ_PATH").map(PathBuf::from).unwrap_or(defaults.faq_path),
            max_tool_rounds: parse_or("MAX_TOOL_ROUNDS", get("MAX_TOOL_ROUNDS"), defaults.max_tool_rounds)?,
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                get("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout.as_secs(),
            )?),
            turn_timeout: Duration::from_secs(parse_or(
                "TURN_TIMEOUT_SECS",
                get("TURN_TIMEOUT_SECS"),
                defaults.turn_timeout.as_secs(),
            )?),
            tool_latency,
            faq_reply_delay: Duration::from_millis(parse_or(
                "FAQ_REPLY_DELAY_MS",
                get("FAQ_REPLY_DELAY_MS"),
                defaults.faq_reply_delay.as_millis() as u64,
            )?),
        })
    }

    /// Zero-latency settings for tests and scripted runs
    pub fn without_delays(mut self) -> Self {
        self.tool_latency = ToolLatency::zero();
        self.faq_reply_delay = Duration::ZERO;
        self
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SupportError::Config(format!("{} has invalid value '{}'", key, raw)))
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
