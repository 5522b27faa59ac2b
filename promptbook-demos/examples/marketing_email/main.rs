use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::chains::marketing_email;
use promptbook_demos::{arg_or_prompt, init, render_section, ModelArgs};

#[derive(Parser)]
#[command(about = "Marketing Email Generator")]
struct Cli {
    #[arg(long)]
    product: Option<String>,

    /// Features to highlight
    #[arg(long)]
    features: Option<String>,

    #[arg(long)]
    audience: Option<String>,

    /// Print the email as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let product = arg_or_prompt(cli.product, "Enter a product name")?;
    let features = arg_or_prompt(cli.features, "State features of the product")?;
    let audience = arg_or_prompt(cli.audience, "Enter a target audience")?;
    let email = marketing_email(&model, &product, &features, &audience, |subject| render_section("Subject line", subject)).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&email)?);
    } else {
        render_section(&format!("{} (for {})", email.subject, email.audience), &email.email);
    }
    Ok(())
}
