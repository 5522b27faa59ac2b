use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::chains::{travel_guide, Budget};
use promptbook_demos::{arg_or_prompt, init, render, ModelArgs};

#[derive(Parser)]
#[command(about = "Travel guide for a city and month")]
struct Cli {
    #[arg(long)]
    city: Option<String>,

    #[arg(long)]
    month: Option<String>,

    /// Language of the useful phrases
    #[arg(long)]
    language: Option<String>,

    /// low, medium or high
    #[arg(long, default_value_t = Budget::Medium)]
    budget: Budget,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let city = arg_or_prompt(cli.city, "Enter a city")?;
    let month = arg_or_prompt(cli.month, "Enter a month of travel")?;
    let language = arg_or_prompt(cli.language, "Enter a language")?;
    let guide = travel_guide(&model, &city, &month, &language, cli.budget).await?;
    render(&guide);
    Ok(())
}
