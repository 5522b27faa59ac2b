use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::vision::{load_image, verify_identity};
use promptbook_demos::{arg_or_prompt, init, render, ModelArgs};

#[derive(Parser)]
#[command(about = "KYC Verification Application")]
struct Cli {
    /// Photo of the identification document
    document: String,

    #[arg(long)]
    name: Option<String>,

    /// Date of birth
    #[arg(long)]
    dob: Option<String>,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let image = load_image(&cli.document)?;
    let name = arg_or_prompt(cli.name, "Enter your name")?;
    let dob = arg_or_prompt(cli.dob, "Enter your date of birth")?;
    render(&verify_identity(&model, &name, &dob, image).await?);
    Ok(())
}
