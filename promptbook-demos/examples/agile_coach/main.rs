//! Chat with an agile coach that remembers the conversation. An empty line or end of input quits.

use anyhow::Result;
use clap::Parser;
use log::error;
use promptbook::exemplars::chains::AgileCoach;
use promptbook::utils::history::{HistoryBudget, DEFAULT_RESERVE_TOKENS};
use promptbook_demos::{init, read_line, render, ModelArgs};

#[derive(Parser)]
#[command(about = "Agile Guide")]
struct Cli {
    /// Print the conversation before quitting
    #[arg(long)]
    show_history: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let budget = HistoryBudget::for_model(&model.config.model, DEFAULT_RESERVE_TOKENS)?;
    let mut coach = AgileCoach::new(model).with_history_budget(budget);
    println!("Agile Guide");
    while let Ok(question) = read_line("Enter the question") {
        if question.is_empty() {
            break;
        }
        match coach.ask(&question).await {
            Ok(answer) => render(&answer),
            Err(e) => error!("{:#}", e),
        }
    }
    if cli.show_history {
        println!("\nHISTORY\n{}", coach.history);
    }
    Ok(())
}
