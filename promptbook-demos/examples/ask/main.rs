//! Ask a model anything and watch the answer stream in.

use std::io::{stdout, IsTerminal, Write};
use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use promptbook::utils::llm::{ChatMessage, ChatModel};
use promptbook::utils::printing::IncrementalMarkdownPrinter;
use promptbook_demos::{arg_or_prompt, init, restore_cursor_on_ctrlc, ModelArgs};

#[derive(Parser)]
#[command(about = "What do you want to know?")]
struct Cli {
    /// The question
    question: Option<String>,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let question = arg_or_prompt(cli.question, "Enter a question")?;

    let mut stream = model.chat_stream(&[ChatMessage::user(question)]).await?;
    if stdout().is_terminal() {
        restore_cursor_on_ctrlc()?;
        let mut printer = IncrementalMarkdownPrinter::default();
        printer.activate(true)?;
        while let Some(chunk) = stream.next().await {
            printer.push_and_print(&chunk?)?;
        }
        printer.deactivate()?;
        println!();
    } else {
        while let Some(chunk) = stream.next().await {
            print!("{}", chunk?);
            stdout().flush()?;
        }
        println!();
    }
    Ok(())
}
