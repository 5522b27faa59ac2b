//! Essay Research Assistant: outline, research, write, critique and revise.

use anyhow::Result;
use clap::Parser;
use log::info;
use promptbook::exemplars::essay_writer::{EssayState, EssayWriter, DEFAULT_MAX_ITERATIONS, DEFAULT_WORD_COUNT_LIMIT};
use promptbook::utils::llm::ConversationConfig;
use promptbook::utils::llm::openai::OpenAIChat;
use promptbook::utils::search::GoogleSearch;
use promptbook_demos::{arg_or_prompt, init, render_section};

#[derive(Parser)]
#[command(about = "Essay Research Assistant")]
struct Cli {
    /// e.g. The Benefits of Regular Exercise
    topic: Option<String>,

    /// Maximum number of revisions (1-10)
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Maximum number of words in the final essay
    #[arg(long, default_value_t = DEFAULT_WORD_COUNT_LIMIT as u64, value_parser = clap::value_parser!(u64).range(100..=5000))]
    word_count_limit: u64,

    #[arg(long, default_value = "gpt-3.5-turbo")]
    model: String,

    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    // fail early on missing keys, before asking for the topic
    let model = OpenAIChat::from_settings(&settings, ConversationConfig::new(cli.model.as_str()).temperature(cli.temperature))?;
    let search = GoogleSearch::from_settings(&settings)?;
    let topic = arg_or_prompt(cli.topic, "Enter your research topic")?;

    let state = EssayState::new(topic, cli.max_iterations, cli.word_count_limit as usize);
    println!("Generating your essay with at most {} revisions and {} words. This may take a few minutes.",
             state.max_iterations, state.word_count_limit);
    let writer = EssayWriter::new(model, search);
    let report = writer
        .run_with_observer(state, |stage, state| info!("{} done (revision {})", stage, state.iteration))
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    render_section("Outline", &report.outline);
    render_section("Final Essay", &report.final_essay);
    println!("Word count: {}\n", report.word_count);
    render_section("Final Critique", &report.final_critique);
    println!("Number of iterations completed: {}", report.iterations);
    Ok(())
}
