//! Search job listings by meaning rather than keywords.

use anyhow::Result;
use clap::Parser;
use promptbook::utils::embedding::OpenAIEmbedding;
use promptbook::utils::retrievers::Retriever;
use promptbook::utils::splitter::{split_document, Document};
use promptbook::utils::vec_stores::InMemoryVecStore;
use promptbook_demos::{arg_or_prompt, init};

#[derive(Parser)]
#[command(about = "Find matching job listings")]
struct Cli {
    /// Text file with the job listings
    #[arg(long, default_value = "job_listings.txt")]
    listings: String,

    /// What you are looking for
    query: Option<String>,

    #[arg(long, default_value_t = 4)]
    top_k: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let embedder = OpenAIEmbedding::from_settings(&settings)?;
    let document = Document::load(&cli.listings)?;
    let chunks = split_document(&document, 200, 10)?;
    let store = InMemoryVecStore::from_chunks(&embedder, chunks).await?;
    let retriever = Retriever::new(store, embedder).with_top_k(cli.top_k);

    let query = arg_or_prompt(cli.query, "Enter a query")?;
    for scored in retriever.retrieve(&query).await? {
        println!("[{:.3}] {}\n", scored.score, scored.chunk.text);
    }
    Ok(())
}
