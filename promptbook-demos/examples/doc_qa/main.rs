//! Chat with your documents. Loads every text and markdown file of a folder (or a single file), then answers
//! questions until an empty line or end of input.

use std::path::Path;
use anyhow::{bail, Result};
use clap::Parser;
use log::error;
use promptbook::exemplars::doc_qa::DocumentQa;
use promptbook::utils::embedding::OpenAIEmbedding;
use promptbook::utils::history::{HistoryBudget, DEFAULT_RESERVE_TOKENS};
use promptbook::utils::splitter::{load_documents, Document};
use promptbook_demos::{init, read_line, render, ModelArgs};

#[derive(Parser)]
#[command(about = "Chat with Document")]
struct Cli {
    /// A document or a folder of documents
    path: String,

    /// Answer with at least three sectioned paragraphs instead of three sentences
    #[arg(long)]
    detailed: bool,

    /// Print the sources of each answer
    #[arg(long)]
    sources: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let path = Path::new(&cli.path);
    let documents = if path.is_dir() {
        load_documents(path)?
    } else {
        vec![Document::load(path)?]
    };
    if documents.is_empty() {
        bail!("No supported documents found in {}", cli.path);
    }

    let model = cli.model.chat_model(&settings)?;
    let budget = HistoryBudget::for_model(&model.config.model, DEFAULT_RESERVE_TOKENS)?;
    let embedder = OpenAIEmbedding::from_settings(&settings)?;
    let mut qa = DocumentQa::from_documents(model, embedder, &documents)
        .await?
        .concise(!cli.detailed)
        .with_history_budget(budget);

    println!("Chat with Document");
    while let Ok(question) = read_line("Ask your Question") {
        if question.is_empty() {
            break;
        }
        match qa.ask(&question).await {
            Ok(answer) => {
                render(&answer.answer);
                if cli.sources {
                    println!("Sources: {}", answer.sources.join(", "));
                }
            }
            Err(e) => error!("{:#}", e),
        }
    }
    Ok(())
}
