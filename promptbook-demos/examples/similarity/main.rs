use anyhow::Result;
use clap::Parser;
use promptbook::utils::embedding::{dot, AsyncEmbed, OpenAIEmbedding};
use promptbook_demos::{arg_or_prompt, init};

#[derive(Parser)]
#[command(about = "Similarity of two texts by embedding")]
struct Cli {
    text1: Option<String>,
    text2: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let embedder = OpenAIEmbedding::from_settings(&settings)?;
    let text1 = arg_or_prompt(cli.text1, "Enter a text1")?;
    let text2 = arg_or_prompt(cli.text2, "Enter a text2")?;
    let embeddings = embedder.embed_batch(&[text1, text2]).await?;
    let score = dot(&embeddings[0], &embeddings[1]);
    println!("{:.2} %", score * 100.0);
    Ok(())
}
