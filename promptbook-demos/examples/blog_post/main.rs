use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::chains::blog_post;
use promptbook_demos::{arg_or_prompt, init, render_section, ModelArgs};

#[derive(Parser)]
#[command(about = "Blog post outline and introduction")]
struct Cli {
    #[arg(long)]
    topic: Option<String>,

    /// Paragraphs of the introduction
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=10))]
    paragraphs: u8,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let topic = arg_or_prompt(cli.topic, "Enter a topic")?;
    let post = blog_post(&model, &topic, cli.paragraphs, |outline| render_section("Outline", outline)).await?;
    render_section("Introduction", &post.introduction);
    Ok(())
}
