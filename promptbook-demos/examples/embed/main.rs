//! Embed texts with the OpenAI embedding model and show the vectors.

use anyhow::Result;
use clap::Parser;
use promptbook::utils::embedding::{AsyncEmbed, GetEmbedDim, OpenAIEmbedding};
use promptbook_demos::{arg_or_prompt, init};

#[derive(Parser)]
#[command(about = "Embed one or more texts")]
struct Cli {
    /// Texts to embed. Asked for when none is given
    texts: Vec<String>,

    /// Print the full vectors instead of their first values
    #[arg(long)]
    full: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let embedder = OpenAIEmbedding::from_settings(&settings)?;
    let texts = if cli.texts.is_empty() {
        vec![arg_or_prompt(None, "Enter a text")?]
    } else {
        cli.texts
    };
    let embeddings = embedder.embed_batch(&texts).await?;
    println!("{} embeddings of dimension {:?}", embeddings.len(), embedder.embedding_dim());
    for (text, embedding) in texts.iter().zip(&embeddings) {
        let shown = if cli.full { embedding.as_slice() } else { &embedding[..embedding.len().min(8)] };
        println!("{:?}: {:?}", text, shown);
    }
    Ok(())
}
