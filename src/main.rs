use parquet_qa::config::AppConfig;
use parquet_qa::{AskService, DatasetStore, LlmClient};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parquet-qa")]
#[command(about = "Ask natural-language questions over a Parquet dataset")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the dataset and serve the HTTP API and UI
    Serve {
        /// Address to bind (or set BIND_ADDR)
        #[arg(short, long)]
        bind: Option<String>,

        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Load the dataset, answer one question and print the JSON envelope
    Ask {
        /// The question in natural language
        question: String,

        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Load the dataset and print the discovered columns
    Columns {
        #[command(flatten)]
        dataset: DatasetArgs,
    },
}

#[derive(ClapArgs)]
struct DatasetArgs {
    /// Parquet location, local glob or s3:// URL (or set PARQUET_PATH)
    #[arg(short, long)]
    parquet_path: Option<String>,

    /// Table name used in generated SQL (or set TABLE_NAME)
    #[arg(short, long)]
    table: Option<String>,

    /// Groq API key (or set GROQ_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Model identifier (or set GROQ_MODEL)
    #[arg(long)]
    model: Option<String>,
}

impl DatasetArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(path) = self.parquet_path {
            config.dataset.parquet_path = path;
        }
        if let Some(table) = self.table {
            config.dataset.table_name = table;
        }
        if let Some(key) = self.api_key {
            config.llm.api_key = Some(key);
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();

    match args.command {
        Commands::Serve { bind, dataset } => {
            dataset.apply(&mut config);
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config).await
        }
        Commands::Ask { question, dataset } => {
            dataset.apply(&mut config);
            ask_once(config, &question).await
        }
        Commands::Columns { dataset } => {
            dataset.apply(&mut config);
            let store = load_store(&config).await?;
            for column in store.columns() {
                println!("{}", column);
            }
            Ok(())
        }
    }
}

async fn load_store(config: &AppConfig) -> Result<DatasetStore> {
    let dataset = config.dataset.clone();
    tokio::task::spawn_blocking(move || DatasetStore::load(&dataset))
        .await
        .context("dataset load task panicked")?
        .with_context(|| format!("failed to load dataset from {}", config.dataset.parquet_path))
}

fn build_service(config: &AppConfig, store: DatasetStore) -> AskService {
    if config.llm.api_key.is_some() {
        info!("Groq API key found, using model {}", config.llm.model);
    } else {
        warn!("GROQ_API_KEY not set - every question will fail until it is provided");
    }
    let translator = LlmClient::from_config(&config.llm);
    AskService::new(Arc::new(store), Arc::new(translator))
}

async fn serve(config: AppConfig) -> Result<()> {
    let store = load_store(&config).await?;
    let service = Arc::new(build_service(&config, store));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    parquet_qa::server::serve(listener, service).await?;
    Ok(())
}

async fn ask_once(config: AppConfig, question: &str) -> Result<()> {
    let store = load_store(&config).await?;
    let service = build_service(&config, store);

    let reply = service.ask(question).await;
    println!("{}", serde_json::to_string_pretty(&reply.body)?);

    if reply.status != 200 {
        std::process::exit(1);
    }
    Ok(())
}
