//! Optional AI rewriting of study text into a denser form for typing.

use std::time::Duration;

use reqwest::{blocking::Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StudyTypeError};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_INPUT_CHARS: usize = 4000;
const MAX_TOKENS: u32 = 1000;

const SYSTEM_PROMPT: &str = "You are a learning optimization assistant. Your task is to extract and reformat text for a typing test that maximizes learning retention.

Guidelines:
- Extract key concepts, definitions, and important facts
- Remove filler words and redundant phrases
- Keep sentences concise but meaningful
- Preserve technical terms and their definitions
- Format as clean, typable text (no bullet points or special formatting)
- Separate distinct concepts with periods
- Aim for 500-1000 characters of optimized content";

/// Text in, text out. Callers treat any error as "keep the original".
pub trait TextOptimizer {
    fn optimize(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI chat-completions client.
pub struct OpenAiOptimizer {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiOptimizer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: CHAT_COMPLETIONS_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl TextOptimizer for OpenAiOptimizer {
    fn optimize(&self, text: &str) -> Result<String> {
        let request = build_request(&self.model, text);
        debug!(model = %self.model, "requesting text optimization");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        match response.status() {
            StatusCode::OK => {
                let body: ChatResponse = response.json()?;
                Ok(content_or(body, text))
            }
            status => {
                let detail = response.text().unwrap_or_default();
                Err(StudyTypeError::Optimizer(format!(
                    "{}: {}",
                    status,
                    detail.trim()
                )))
            }
        }
    }
}

fn build_request(model: &str, text: &str) -> ChatRequest {
    let excerpt: String = text.chars().take(MAX_INPUT_CHARS).collect();

    ChatRequest {
        model: model.to_string(),
        messages: vec![
            Message {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: format!(
                    "Please optimize this study material for a typing test:\n\n{}",
                    excerpt
                ),
            },
        ],
        max_tokens: MAX_TOKENS,
    }
}

/// First choice's content, or the original text when the model said nothing.
fn content_or(response: ChatResponse, original: &str) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| original.to_string())
}
