//! Request handler for `POST /ask`
//!
//! question -> translator -> admission gate -> executor -> envelope. Every
//! exit produces a JSON object with a single `answer` field.

use crate::error::{QaError, Result};
use crate::llm::SqlTranslator;
use crate::result::Answer;
use crate::safety;
use crate::store::DatasetStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

pub const QUESTION_REQUIRED: &str = "❌ Question is required";
pub const UNSAFE_QUERY: &str = "❌ Unsafe query blocked";

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskResponse {
    pub answer: Answer,
}

/// Status code plus envelope for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AskReply {
    pub status: u16,
    pub body: AskResponse,
}

impl AskReply {
    fn ok(answer: Answer) -> Self {
        Self { status: 200, body: AskResponse { answer } }
    }

    fn message(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            body: AskResponse { answer: Answer::Text(text.into()) },
        }
    }

    fn failure(err: &QaError) -> Self {
        Self::message(500, format!("❌ Error: {}", err))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.body)
            .unwrap_or_else(|_| r#"{"answer":"❌ Error: failed to encode response"}"#.to_string())
    }
}

/// Shared per-process context handed to every request.
#[derive(Clone)]
pub struct AskService {
    store: Arc<DatasetStore>,
    translator: Arc<dyn SqlTranslator>,
}

impl AskService {
    pub fn new(store: Arc<DatasetStore>, translator: Arc<dyn SqlTranslator>) -> Self {
        Self { store, translator }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Entry point for a raw request body. A body that is not a JSON object
    /// with a string `question` is treated as a missing question.
    pub async fn ask_json(&self, body: &str) -> AskReply {
        let request: AskRequest = serde_json::from_str(body).unwrap_or_default();
        self.ask(&request.question).await
    }

    pub async fn ask(&self, question: &str) -> AskReply {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("ask", %request_id);
        self.run(question).instrument(span).await
    }

    async fn run(&self, question: &str) -> AskReply {
        let question = question.trim();
        if question.is_empty() {
            return AskReply::message(400, QUESTION_REQUIRED);
        }
        info!("Question: {}", question);

        let sql = match self
            .translator
            .translate(self.store.table_name(), self.store.columns(), question)
            .await
        {
            Ok(sql) => sql,
            Err(e) => {
                error!("Translation failed: {}", e);
                return AskReply::failure(&e);
            }
        };
        info!("Generated SQL: {}", sql);

        if let Err(rejection) = safety::check_sql(&sql) {
            warn!("Blocked generated SQL: {}", rejection);
            return AskReply::message(400, UNSAFE_QUERY);
        }

        match self.execute(sql).await {
            Ok(answer) => AskReply::ok(answer),
            Err(e) => {
                error!("Query failed: {}", e);
                AskReply::failure(&e)
            }
        }
    }

    async fn execute(&self, sql: String) -> Result<Answer> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let df = store.execute(&sql)?;
            Answer::from_frame(&df)
        })
        .await
        .map_err(|e| QaError::Query(format!("Query task failed: {}", e)))?
    }
}
