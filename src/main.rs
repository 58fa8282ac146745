use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::*;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qr_agent::{Router, RouterConfig, ServiceIds, Services};
use qr_cli::{
    CliCommand, display_banner, format_history, format_plan, format_result, format_stats,
    handle_input_with_history, print_help,
};
use qr_core::{Document, Embedder, GenerationProvider, Retriever, VisionProvider};
use qr_ollama::{OllamaClient, OllamaConfig, OllamaEmbedder, OllamaGenerator, OllamaVision};
use qr_rag::{HashingEmbedder, LocalRetriever, LocalVectorStore, builtin_documents, load_markdown_dir};

#[derive(Parser)]
#[command(name = "qrouter")]
#[command(about = "Routes questions and images to the cheapest sufficient model path", long_about = None)]
struct Cli {
    /// Answer a single query and exit
    #[arg(short, long, conflicts_with = "image")]
    command: Option<String>,

    /// Caption an image file and exit
    #[arg(short, long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Conversation to use
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Show the plan for --command or --image without running it
    #[arg(long)]
    explain: bool,

    /// Directory of markdown files added to the knowledge base
    #[arg(long, value_name = "DIR")]
    corpus_dir: Option<PathBuf>,
}

/// Where query and chunk embeddings come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmbeddingBackend {
    Hashing,
    Ollama,
}

impl EmbeddingBackend {
    fn from_env() -> Result<Self> {
        match env::var("EMBEDDING_BACKEND") {
            Err(_) => Ok(EmbeddingBackend::Hashing),
            Ok(raw) => match raw.trim().to_lowercase().as_str() {
                "" | "hashing" => Ok(EmbeddingBackend::Hashing),
                "ollama" => Ok(EmbeddingBackend::Ollama),
                other => bail!("EMBEDDING_BACKEND must be 'hashing' or 'ollama', got '{}'", other),
            },
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_corpus(corpus_dir: Option<&Path>) -> Result<Vec<Document>> {
    let mut documents = builtin_documents();

    if let Some(dir) = corpus_dir {
        let extra = load_markdown_dir(dir)
            .await
            .with_context(|| format!("failed to load corpus from {}", dir.display()))?;
        info!(dir = %dir.display(), documents = extra.len(), "loaded markdown corpus");
        documents.extend(extra);
    }

    Ok(documents)
}

/// Index the corpus with `embedder`, returning the retriever and the embedder id
async fn build_retriever<E: Embedder + 'static>(
    embedder: Arc<E>,
    documents: Vec<Document>,
) -> Result<(Arc<dyn Retriever>, String)> {
    let embedding_id = embedder.model_id().to_string();
    let retriever = LocalRetriever::new(Arc::new(LocalVectorStore::new()), embedder);

    let indexed = retriever.index(documents).await?;
    if indexed.documents_failed > 0 {
        warn!(
            failed = indexed.documents_failed,
            first_error = indexed.errors.first().map(String::as_str).unwrap_or_default(),
            "some documents could not be indexed"
        );
    }
    info!(chunks = indexed.documents_indexed, embedder = %embedding_id, "knowledge base indexed");

    let retriever: Arc<dyn Retriever> = Arc::new(retriever);
    Ok((retriever, embedding_id))
}

async fn build_router(cli: &Cli) -> Result<Router> {
    let client = OllamaClient::new(OllamaConfig::from_env()?)?;
    let documents = load_corpus(cli.corpus_dir.as_deref()).await?;

    let (retriever, embedding_id) = match EmbeddingBackend::from_env()? {
        EmbeddingBackend::Hashing => {
            build_retriever(Arc::new(HashingEmbedder::default()), documents).await?
        }
        EmbeddingBackend::Ollama => {
            build_retriever(Arc::new(OllamaEmbedder::new(client.clone())), documents).await?
        }
    };

    let generator = Arc::new(OllamaGenerator::new(client.clone()));
    let vision = Arc::new(OllamaVision::new(client));

    let config = RouterConfig::from_env(ServiceIds {
        generation: generator.model_id().to_string(),
        vision: vision.model_id().to_string(),
        embedding: embedding_id,
    })?;

    let router = Router::new(
        Services {
            retriever,
            generator,
            vision,
        },
        config,
    )?;
    Ok(router)
}

/// Run one query or image through the router and print the result
async fn answer(router: &Router, text: Option<&str>, image: Option<&[u8]>, user: &str) {
    let needs_model = match text {
        Some(text) => router.explain(text).model_steps() > 0,
        None => true,
    };
    if needs_model {
        println!("{}", "🤖 Thinking...".dimmed());
    }

    match router.process_query(text, image, user).await {
        Ok(result) => println!("{}", format_result(&result)),
        Err(e) => println!("{} {}", "❌".red(), e),
    }
}

async fn run_interactive(router: &Router, user: &str) -> Result<()> {
    display_banner();

    let mut input_history = Vec::new();

    while let Some(line) = handle_input_with_history(&mut input_history).await? {
        match CliCommand::parse(&line) {
            CliCommand::Empty => continue,
            CliCommand::Exit => {
                println!("{}", "👋 Goodbye!".green());
                break;
            }
            CliCommand::Help => print_help(),
            CliCommand::Clear => {
                router.clear_history(user).await;
                println!("{} Conversation cleared", "🗑️".cyan());
            }
            CliCommand::History => println!("{}", format_history(&router.history(user).await)),
            CliCommand::Stats => println!("{}", format_stats(&router.stats().await)),
            CliCommand::Explain(query) => println!("{}", format_plan(&router.explain(&query))),
            CliCommand::Summarize => {
                answer(router, Some("summarize our conversation"), None, user).await
            }
            CliCommand::Image(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => answer(router, None, Some(bytes.as_slice()), user).await,
                Err(e) => println!("{} Could not read {}: {}", "❌".red(), path.display(), e),
            },
            CliCommand::Query(query) => answer(router, Some(query.as_str()), None, user).await,
            CliCommand::Invalid(message) => println!("{} {}", "❌".red(), message),
        }
        println!();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let router = build_router(&cli).await?;

    if cli.explain {
        let plan = match (&cli.command, &cli.image) {
            (Some(query), _) => router.explain(query),
            (None, Some(_)) => router.explain_image(),
            (None, None) => bail!("--explain needs --command or --image"),
        };
        println!("{}", format_plan(&plan));
        return Ok(());
    }

    if let Some(path) = &cli.image {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image {}", path.display()))?;
        let result = router.process_query(None, Some(bytes.as_slice()), &cli.user).await?;
        println!("{}", format_result(&result));
        return Ok(());
    }

    if let Some(query) = &cli.command {
        let result = router.process_query(Some(query.as_str()), None, &cli.user).await?;
        println!("{}", format_result(&result));
        return Ok(());
    }

    run_interactive(&router, &cli.user).await
}
