// src/chat/mod.rs
pub mod gemini;
pub mod prompt;

use log::{debug, info};
use std::sync::Arc;

use crate::error::{AdvisorError, AdvisorResult};
use crate::history::PredictionHistory;

pub use gemini::{GeminiClient, GeminiSettings, TextGenerator};
pub use prompt::render_prompt;

pub const NO_PREDICTION_REPLY: &str =
    "I don't have any saved financial data yet. Please make a savings prediction first!";

/// Answers a user question using only the most recent prediction record.
pub struct ChatService {
    history: Arc<PredictionHistory>,
    generator: Arc<dyn TextGenerator>,
}

impl ChatService {
    pub fn new(history: Arc<PredictionHistory>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { history, generator }
    }

    pub async fn reply(&self, message: &str) -> AdvisorResult<String> {
        if message.is_empty() {
            return Err(AdvisorError::NoMessage);
        }

        let latest = match self.history.latest().await? {
            Some(record) => record,
            None => {
                info!("Chat request with no stored prediction; sending fallback reply");
                return Ok(NO_PREDICTION_REPLY.to_string());
            }
        };

        let prompt = render_prompt(&latest, message);
        debug!(
            "Sending advisor prompt ({} chars) for record {:?}",
            prompt.len(),
            latest.id
        );
        self.generator.generate(&prompt).await
    }
}
