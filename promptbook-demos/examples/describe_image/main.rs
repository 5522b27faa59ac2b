use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::vision::{describe_image, load_image};
use promptbook_demos::{arg_or_prompt, init, render, ModelArgs};

#[derive(Parser)]
#[command(about = "Ask a question about an image")]
struct Cli {
    /// A png or jpeg image
    image: String,

    question: Option<String>,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let image = load_image(&cli.image)?;
    let question = arg_or_prompt(cli.question, "Enter a question")?;
    render(&describe_image(&model, &question, image).await?);
    Ok(())
}
