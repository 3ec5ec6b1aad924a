//! Question to SQL translation through an OpenAI-compatible chat endpoint.

use crate::config::LlmConfig;
use crate::error::{QaError, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

pub const SYSTEM_PROMPT: &str = "Convert questions into SQL queries.";

/// Anything that can turn a question into a candidate SQL statement.
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    async fn translate(&self, table: &str, columns: &[String], question: &str) -> Result<String>;
}

pub fn build_sql_prompt(table: &str, columns: &[String], question: &str) -> String {
    format!(
        r#"
You are an expert data analyst.

Table name: {}
Columns: {}

Rules:
- Output ONLY a valid SQL query
- SQL must start with SELECT
- Do NOT explain anything
- Do NOT use DROP, DELETE, UPDATE, INSERT, ALTER
- Assume all string values are lowercase

Question:
{}
"#,
        table,
        columns.join(", "),
        question
    )
}

#[derive(Clone)]
pub struct LlmClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, model: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single chat completion at temperature 0. Returns the raw message content.
    pub async fn call_llm(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| QaError::Llm("GROQ_API_KEY is not set".to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| QaError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(QaError::Llm(format!("LLM API error ({}): {}", status, error_text)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| QaError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions body.
fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(QaError::Llm(format!("LLM API error: {}", error)));
    }

    let choices = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| QaError::Llm("No choices array in LLM response".to_string()))?;

    let first = choices
        .first()
        .ok_or_else(|| QaError::Llm("Empty choices array in LLM response".to_string()))?;

    if first.get("finish_reason").and_then(|r| r.as_str()) == Some("length") {
        warn!("LLM response was truncated due to length limit");
    }

    first["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| QaError::Llm("No content in LLM response".to_string()))
}

#[async_trait]
impl SqlTranslator for LlmClient {
    async fn translate(&self, table: &str, columns: &[String], question: &str) -> Result<String> {
        let prompt = build_sql_prompt(table, columns, question);
        debug!("Translating question with model {}", self.model);
        let response = self.call_llm(&prompt).await?;
        Ok(response.trim().to_string())
    }
}
