use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::ResponseCache;
use crate::error::{AppError, AppResult};
use crate::services::{GenerationOptions, LanguageModelService};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiClient {
    http: Client,
    api_key: String,
    cache: Arc<ResponseCache>,
}

impl OpenAiClient {
    pub fn new(api_key: String, cache: Arc<ResponseCache>) -> Self {
        Self {
            http: Client::new(),
            api_key,
            cache,
        }
    }

    /// One chat completion, answered from the cache when the identical
    /// request has been made before.
    async fn complete(&self, request: &ChatRequest) -> AppResult<String> {
        let key = ResponseCache::key(request)?;
        let response = match self.cache.get::<ChatResponse>(&key) {
            Some(cached) => cached,
            None => {
                let fetched = self.fetch(request).await?;
                self.cache.put(&key, &fetched)?;
                fetched
            }
        };

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LanguageModel("completion had no choices".to_string()))?;
        Ok(choice.message.content.trim().to_string())
    }

    async fn fetch(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let response = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| AppError::LanguageModel(format!("failed to call OpenAI: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::LanguageModel(format!(
                "OpenAI responded with {status}: {body}"
            )));
        }

        response.json().await.map_err(|err| {
            AppError::LanguageModel(format!("failed to parse OpenAI response: {err}"))
        })
    }
}

#[async_trait]
impl LanguageModelService for OpenAiClient {
    async fn summarize(&self, payload: &str, options: &GenerationOptions) -> Option<String> {
        let instructions = [
            format!(
                "Provide a list of changes (release notes) in {} based on the information provided to you.",
                options.language
            ),
            "The given changes will include a list of 'commit messages' and 'diff' within a range of commits.".to_string(),
            "As additional context, the application has the following description:".to_string(),
            "\"\"\"".to_string(),
            options.additional_context.clone(),
            "\"\"\"".to_string(),
        ]
        .join("\n");

        let request = ChatRequest::new(options, instructions, payload.to_string());
        match self.complete(&request).await {
            Ok(notes) => Some(notes),
            Err(err) => {
                warn!("bucket summarization failed: {err}");
                None
            }
        }
    }

    async fn merge(&self, notes: &[String], options: &GenerationOptions) -> Option<String> {
        let instructions = [
            "You will be given several release notes from different branches.".to_string(),
            format!(
                "Your goal is to combine them into a single release notes document and organize them in {}.",
                options.language
            ),
            "Remove any duplicate notes.".to_string(),
        ]
        .join("\n");

        let request = ChatRequest::new(options, instructions, notes.join("\n\n"));
        match self.complete(&request).await {
            Ok(merged) => Some(merged),
            Err(err) => {
                warn!("release notes merge failed: {err}");
                None
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
}

impl ChatRequest {
    fn new(options: &GenerationOptions, instructions: String, input: String) -> Self {
        Self {
            model: options.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: instructions,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: input,
                },
            ],
            max_completion_tokens: options.max_completion_tokens,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Serialize, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
