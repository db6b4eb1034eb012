use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_intel_core::{
    upload_folder_best_effort, CompletionClient, CosmosStore, DocumentStore, Embedder,
    HashingSentenceEmbedder, PipelineError, PipelineOptions, RecommendationPipeline,
};
use doc_intel_core::process_pdf;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-intel", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Document store base URL
    #[arg(long, default_value = "http://localhost:8081")]
    store_url: String,

    /// Document store database name
    #[arg(long, default_value = "docintel")]
    store_database: String,

    /// Document store container name
    #[arg(long, default_value = "documents")]
    store_container: String,

    /// Document store API key
    #[arg(long, env = "DOC_STORE_KEY", default_value = "dev-key")]
    store_key: String,

    /// Chat completion endpoint URL
    #[arg(long, default_value = "http://localhost:8000/v1/complete")]
    completion_url: String,

    /// Chat completion API key
    #[arg(long, env = "COMPLETION_API_KEY")]
    completion_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Extract one PDF and store it for an owner.
    Upload {
        /// Path to the PDF file.
        #[arg(long)]
        file: String,
        /// Owner the document belongs to.
        #[arg(long)]
        owner: String,
    },
    /// Extract and store every PDF under a folder, recursively.
    UploadFolder {
        /// Folder that contains PDFs.
        #[arg(long)]
        folder: String,
        /// Owner the documents belong to.
        #[arg(long)]
        owner: String,
    },
    /// List an owner's stored documents.
    List {
        #[arg(long)]
        owner: String,
    },
    /// Nearest neighbors among an owner's documents.
    Recommend {
        #[arg(long)]
        owner: String,
        /// Neighbors per document.
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Drop each document from its own neighbor list.
        #[arg(long, default_value_t = false)]
        exclude_self: bool,
    },
    /// Ask a question grounded in an owner's documents.
    Chat {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let store = CosmosStore::new(
        &cli.store_url,
        &cli.store_database,
        &cli.store_container,
        &cli.store_key,
    )
    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let embedder = HashingSentenceEmbedder::default();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        embedding_dimensions = embedder.dimensions(),
        "doc-intel boot"
    );

    match cli.command {
        Command::Upload { file, owner } => {
            let record = process_pdf(Path::new(&file), &owner)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            store
                .put_document(&record)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!(
                "stored {} as {} for {} ({} chars of text)",
                record.filename,
                record.document_id,
                record.owner,
                record.text.chars().count()
            );
        }
        Command::UploadFolder { folder, owner } => {
            let report = upload_folder_best_effort(Path::new(&folder), &owner)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if !report.skipped_files.is_empty() {
                warn!(
                    "skipped_files={} for folder={}",
                    report.skipped_files.len(),
                    folder
                );
                for skipped in &report.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
                }
            }

            let mut stored = 0usize;
            for record in &report.records {
                store
                    .put_document(record)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                stored += 1;
            }

            println!(
                "{} document(s) stored for {} at {} ({} skipped)",
                stored,
                owner,
                Utc::now().to_rfc3339(),
                report.skipped_files.len()
            );
        }
        Command::List { owner } => {
            let records = store
                .list_documents(&owner)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if records.is_empty() {
                println!("no documents stored for {owner}");
            }

            for record in records {
                println!(
                    "{}  {}  uploaded_at={}  checksum={}",
                    record.document_id,
                    record.filename,
                    record.uploaded_at.to_rfc3339(),
                    &record.checksum[..record.checksum.len().min(12)]
                );
            }
        }
        Command::Recommend {
            owner,
            top_k,
            exclude_self,
        } => {
            let options = PipelineOptions {
                top_k,
                include_self: !exclude_self,
            };
            let pipeline = RecommendationPipeline::new(store, embedder, options);

            match pipeline.recommend(&owner).await {
                Ok(report) => {
                    for failure in &report.failures {
                        warn!(
                            document_id = %failure.document_id,
                            reason = %failure.reason,
                            "document dropped from similarity run"
                        );
                    }

                    for (document_id, neighbors) in report.neighbors {
                        println!("{document_id}:");
                        for neighbor in neighbors {
                            println!(
                                "  {}  distance={:.4}",
                                neighbor.document_id, neighbor.distance
                            );
                        }
                    }
                }
                Err(PipelineError::NoDocuments) => {
                    println!("no documents stored for {owner}");
                }
                Err(error) => return Err(anyhow::anyhow!(error.to_string())),
            }
        }
        Command::Chat { owner, question } => {
            let context = store
                .fetch_texts(&owner)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if context.is_empty() {
                println!("no documents stored for {owner}; answer will be ungrounded");
            }

            let chat = CompletionClient::new(&cli.completion_url, cli.completion_key.clone());
            let answer = chat
                .ask(&context, &question)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("{answer}");
        }
    }

    Ok(())
}
