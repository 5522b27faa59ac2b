use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::chains::interview_tips;
use promptbook_demos::{arg_or_prompt, init, render, ModelArgs};

#[derive(Parser)]
#[command(about = "Interview Tips Generator")]
struct Cli {
    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    position: Option<String>,

    #[arg(long)]
    strengths: Option<String>,

    #[arg(long)]
    weaknesses: Option<String>,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let company = arg_or_prompt(cli.company, "Company Name")?;
    let position = arg_or_prompt(cli.position, "Position Title")?;
    let strengths = arg_or_prompt(cli.strengths, "Your Strengths")?;
    let weaknesses = arg_or_prompt(cli.weaknesses, "Your Weaknesses")?;
    let tips = interview_tips(&model, &company, &position, &strengths, &weaknesses).await?;
    render(&tips);
    Ok(())
}
