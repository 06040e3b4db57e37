//! FAQ fast path
//!
//! Exact-match lookup of a normalized utterance against a static
//! question/answer table. The table is loaded once, lazily, on first use.
//! A failed load leaves the table empty so every query falls through to the
//! assistant instead of failing the turn.

use crate::error::SupportError;
use crate::models::{FaqDocument, FaqEntry, FaqMatch};
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Where the FAQ table comes from
#[async_trait]
pub trait FaqSource: Send + Sync {
    async fn load(&self) -> Result<Vec<FaqEntry>>;
}

/// JSON file shaped as `{ "faqs": [...] }`
pub struct FileFaqSource {
    path: PathBuf,
}

impl FileFaqSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FaqSource for FileFaqSource {
    async fn load(&self) -> Result<Vec<FaqEntry>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SupportError::FaqData(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let document: FaqDocument = serde_json::from_str(&raw)?;
        Ok(document.faqs)
    }
}

/// Table held in memory
pub struct StaticFaqSource {
    entries: Vec<FaqEntry>,
}

impl StaticFaqSource {
    pub fn new(entries: Vec<FaqEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl FaqSource for StaticFaqSource {
    async fn load(&self) -> Result<Vec<FaqEntry>> {
        Ok(self.entries.clone())
    }
}

/// Trim, lower-case and drop a single trailing `?`.
pub fn normalize_question(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    match lowered.strip_suffix('?') {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

pub struct FaqResolver {
    source: Arc<dyn FaqSource>,
    entries: OnceCell<Vec<FaqEntry>>,
}

impl FaqResolver {
    pub fn new(source: Arc<dyn FaqSource>) -> Self {
        Self {
            source,
            entries: OnceCell::new(),
        }
    }

    pub fn from_entries(entries: Vec<FaqEntry>) -> Self {
        Self::new(Arc::new(StaticFaqSource::new(entries)))
    }

    async fn entries(&self) -> &[FaqEntry] {
        self.entries
            .get_or_init(|| async {
                match self.source.load().await {
                    Ok(entries) => {
                        info!("Loaded {} FAQ entries", entries.len());
                        entries
                    }
                    Err(e) => {
                        warn!("FAQ load failed, continuing with an empty table: {}", e);
                        Vec::new()
                    }
                }
            })
            .await
    }

    /// First entry whose normalized question equals the normalized utterance.
    pub async fn resolve(&self, utterance: &str) -> Option<FaqMatch> {
        let needle = normalize_question(utterance);

        let found = self
            .entries()
            .await
            .iter()
            .find(|faq| normalize_question(&faq.question) == needle)?;

        debug!(question = %found.question, "FAQ match");

        Some(FaqMatch {
            answer: found.answer.clone(),
            related_questions: found.related_questions.clone().unwrap_or_default(),
        })
    }
}
