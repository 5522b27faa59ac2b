//! Turn a video transcript into an SEO article. The transcript is read from a text file.

use std::fs;
use anyhow::{Context, Result};
use clap::Parser;
use promptbook::exemplars::chains::transcript_to_article;
use promptbook_demos::{arg_or_prompt, init, render_section, ModelArgs};

#[derive(Parser)]
#[command(about = "Transcript to comprehensive SEO article converter")]
struct Cli {
    /// Path of the transcript file
    transcript: Option<String>,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let path = arg_or_prompt(cli.transcript, "Transcript file")?;
    let transcript = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path))?;
    let article = transcript_to_article(&model, &transcript, |points| render_section("Extracted Key Points", points)).await?;
    render_section("Generated Article", &article.article);
    Ok(())
}
