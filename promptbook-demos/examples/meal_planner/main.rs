use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::chains::meal_plan;
use promptbook_demos::{arg_or_prompt, init, render, ModelArgs};

#[derive(Parser)]
#[command(about = "Meal Plan Generator")]
struct Cli {
    /// Number of days
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u8).range(1..=30))]
    days: u8,

    /// Dietary restrictions, e.g. vegetarian, gluten-free
    #[arg(long)]
    restrictions: Option<String>,

    /// Daily caloric requirement in kcal
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(u32).range(1000..=4000))]
    calories: u32,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let restrictions = arg_or_prompt(cli.restrictions, "Dietary restrictions (e.g., vegetarian, gluten-free)")?;
    let plan = meal_plan(&model, cli.days, &restrictions, cli.calories).await?;
    render(&plan);
    Ok(())
}
