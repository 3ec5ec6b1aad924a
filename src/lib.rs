pub mod ask;
pub mod config;
pub mod error;
pub mod llm;
pub mod result;
pub mod safety;
pub mod server;
pub mod store;

pub use ask::{AskReply, AskResponse, AskService};
pub use error::{QaError, Result};
pub use llm::{LlmClient, SqlTranslator};
pub use result::Answer;
pub use store::DatasetStore;
