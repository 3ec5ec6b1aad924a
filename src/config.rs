//! Process configuration
//!
//! Values come from the environment (optionally seeded from a `.env` file by
//! the binary); command line flags override them afterwards.

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_PARQUET_PATH: &str =
    "s3://my-healthcare-analyticsdata/data_parquet/patients/*.parquet";
pub const DEFAULT_TABLE_NAME: &str = "patients";
pub const DEFAULT_AWS_REGION: &str = "eu-north-1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub dataset: DatasetConfig,
    pub bind_addr: String,
}

/// Settings for the chat-completions endpoint used to translate questions.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub table_name: String,
    /// Local glob or `s3://bucket/prefix/*.parquet`
    pub parquet_path: String,
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AwsConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let region = get("AWS_REGION")
            .or_else(|| get("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());

        Self {
            llm: LlmConfig {
                api_key: get("GROQ_API_KEY"),
                model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: get("GROQ_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            },
            dataset: DatasetConfig {
                table_name: get("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
                parquet_path: get("PARQUET_PATH")
                    .unwrap_or_else(|| DEFAULT_PARQUET_PATH.to_string()),
                aws: AwsConfig {
                    access_key_id: get("AWS_ACCESS_KEY_ID"),
                    secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
                    region,
                },
            },
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

impl DatasetConfig {
    pub fn is_remote(&self) -> bool {
        self.parquet_path.starts_with("s3://")
    }

    /// Key/value pairs handed to the object-store builder for S3 locations.
    pub fn storage_options(&self) -> Vec<(&'static str, String)> {
        let mut options = vec![("aws_region", self.aws.region.clone())];
        if let Some(ref key_id) = self.aws.access_key_id {
            options.push(("aws_access_key_id", key_id.clone()));
        }
        if let Some(ref secret) = self.aws.secret_access_key {
            options.push(("aws_secret_access_key", secret.clone()));
        }
        options
    }
}
