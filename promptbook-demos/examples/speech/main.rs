//! Speech Generator. With `--language` the title comes from the main model and the speech from a local
//! Ollama model, otherwise both steps use the main model and the speech is returned as JSON.

use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::chains::{speech, speech_in_language};
use promptbook::utils::llm::openai::OpenAIChat;
use promptbook_demos::{arg_or_prompt, init, render, render_section, ModelArgs, OLLAMA_CHAT_MODEL};

#[derive(Parser)]
#[command(about = "Speech Generator")]
struct Cli {
    #[arg(long)]
    topic: Option<String>,

    /// Tone of the speech, e.g. inspiring
    #[arg(long, default_value = "inspiring")]
    emotion: String,

    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=7))]
    paragraphs: u8,

    /// Write the speech in this language with a local Ollama model
    #[arg(long)]
    language: Option<String>,

    /// Ollama model writing the speech when --language is given
    #[arg(long, default_value = OLLAMA_CHAT_MODEL)]
    speech_model: String,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let topic = arg_or_prompt(cli.topic, "Enter a topic")?;
    let on_title = |title: &str| render_section("Title", title);
    match &cli.language {
        Some(language) => {
            let speech_model = OpenAIChat::ollama(&settings, cli.speech_model.as_str());
            let text = speech_in_language(&model, &speech_model, &topic, cli.paragraphs, language, on_title).await?;
            render(&text);
        }
        None => {
            let speech = speech(&model, &topic, &cli.emotion, cli.paragraphs, on_title).await?;
            println!("{}", serde_json::to_string_pretty(&speech)?);
        }
    }
    Ok(())
}
