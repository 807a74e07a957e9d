use doclens::cli::{Cli, Commands, ConfigAction};
use doclens::config::Config;
use doclens::embedding::{EmbeddingProvider, FastEmbedProvider};
use doclens::error::{DoclensError, Result};
use doclens::ingest::ingest_document;
use doclens::llm::{HttpLlmClient, LlmClient};
use doclens::pipeline::Pipeline;
use doclens::retrieval::Retriever;
use doclens::store::ChunkStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    // Parse CLI arguments
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Ingest { doc } => {
            cmd_ingest(cli.config, &doc)?;
        }
        Commands::Query {
            question,
            doc,
            top_k,
            json,
        } => {
            cmd_query(cli.config, &question, doc, top_k, json).await?;
        }
        Commands::Ask => {
            cmd_ask(cli.config).await?;
        }
        Commands::Clear => {
            cmd_clear(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("doclens=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_ingest(config_path: Option<PathBuf>, doc: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    let provider = build_provider(&config)?;
    let store = open_store(&config)?;

    run_ingest(&config, provider.as_ref(), &store, doc)?;

    Ok(())
}

async fn cmd_query(
    config_path: Option<PathBuf>,
    question: &str,
    doc: Option<PathBuf>,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    // Resolve the credential before any pipeline work
    let llm = build_llm(&config)?;

    let provider = build_provider(&config)?;
    let store = open_store(&config)?;

    if let Some(doc) = doc {
        run_ingest(&config, provider.as_ref(), &store, &doc)?;
    }

    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let pipeline = Pipeline::new(llm, Retriever::new(provider, store), top_k);

    let response = pipeline.run(question).await?;

    if json {
        let output = serde_json::json!({
            "question": question,
            "response": response,
        });
        let rendered =
            serde_json::to_string_pretty(&output).map_err(|e| DoclensError::Json {
                source: e,
                context: "Failed to serialize response".to_string(),
            })?;
        println!("{}", rendered);
    } else {
        println!("\n{}", response);
    }

    Ok(())
}

async fn cmd_ask(config_path: Option<PathBuf>) -> Result<()> {
    use std::io::{BufRead, Write};

    let config = load_config(config_path)?;

    // Resolve the credential before any pipeline work
    let llm = build_llm(&config)?;

    let provider = build_provider(&config)?;
    let store = open_store(&config)?;
    let pipeline = Pipeline::new(llm, Retriever::new(provider, store), config.retrieval.top_k);

    println!("Enter queries (empty line or 'exit' to quit):");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }

        let query = line.trim();
        if query.is_empty() || query == "exit" || query == "quit" {
            break;
        }

        // One query's failure must not end the loop
        match pipeline.run(query).await {
            Ok(response) => println!("\n{}\n", response),
            Err(e) => eprintln!("Query failed: {}\n", e),
        }
    }

    println!("Goodbye");

    Ok(())
}

fn cmd_clear(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    store.clear()?;
    println!("✓ Vector store cleared");

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| DoclensError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DoclensError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Validate { file } => {
            let path = match file {
                Some(file) => file,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
    }

    Ok(())
}

fn run_ingest(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    store: &ChunkStore,
    doc: &Path,
) -> Result<()> {
    println!("Ingesting {}...", doc.display());

    let chunking = config.chunking_config()?;
    let report = ingest_document(doc, &chunking, provider, store)?;

    println!(
        "✓ Ingested {} pages as {} chunks ({} total in store)",
        report.pages, report.chunks, report.total_indexed
    );

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'doclens config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}

fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider = FastEmbedProvider::new(&config.embedding.model)?;
    Ok(Arc::new(provider))
}

fn open_store(config: &Config) -> Result<Arc<ChunkStore>> {
    let db_path = expand_path(&config.db_path())?;
    let store = ChunkStore::open(&db_path, config.store_config())?;
    Ok(Arc::new(store))
}

/// Build the LLM client, failing fast when the credential is absent
fn build_llm(config: &Config) -> Result<Arc<dyn LlmClient>> {
    let api_key = std::env::var(&config.llm.api_key_env)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| DoclensError::ConfigurationMissing {
            var: config.llm.api_key_env.clone(),
        })?;

    let client = HttpLlmClient::new(config.llm.clone(), api_key)?;
    Ok(Arc::new(client))
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| DoclensError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| DoclensError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
