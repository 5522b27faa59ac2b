use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::chains::cuisine_guide;
use promptbook_demos::{arg_or_prompt, init, render, ModelArgs};

#[derive(Parser)]
#[command(about = "Cuisine Guru: the traditional cuisine of a country")]
struct Cli {
    #[arg(long)]
    country: Option<String>,

    /// Number of short paragraphs
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=7))]
    paragraphs: u8,

    #[arg(long, default_value = "English")]
    language: String,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let country = arg_or_prompt(cli.country, "Enter a country")?;
    let answer = cuisine_guide(&model, &country, cli.paragraphs, &cli.language).await?;
    render(&answer);
    Ok(())
}
