//! Speech input seam
//!
//! A recognizer captures one utterance and hands back its transcript, which
//! the shell submits exactly like typed text.

use crate::Result;
use async_trait::async_trait;

pub const DEFAULT_LANGUAGE: &str = "en-US";

#[async_trait]
pub trait SpeechInput: Send + Sync {
    fn is_available(&self) -> bool;

    /// Recognition language tag
    fn language(&self) -> &str {
        DEFAULT_LANGUAGE
    }

    /// Listen for a single utterance. `None` when nothing was recognized.
    async fn listen(&self) -> Result<Option<String>>;
}

/// Used when the platform has no recognizer; text entry keeps working.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSpeech;

#[async_trait]
impl SpeechInput for UnavailableSpeech {
    fn is_available(&self) -> bool {
        false
    }

    async fn listen(&self) -> Result<Option<String>> {
        Ok(None)
    }
}
