//! Assign a task to an agent that can look things up on Wikipedia and DuckDuckGo.

use anyhow::Result;
use clap::Parser;
use promptbook::exemplars::react_agent::{ReactAgent, SearchTool, Tool, DEFAULT_MAX_ITERATIONS};
use promptbook_demos::{arg_or_prompt, init, render, render_section, ModelArgs};

#[derive(Parser)]
#[command(about = "AI Agent")]
struct Cli {
    /// The task, e.g. "Who won the 2022 world cup and where was it held?"
    task: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Print every thought, action and observation
    #[arg(long)]
    verbose: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = init();
    let cli = Cli::parse();
    let model = cli.model.chat_model(&settings)?;
    let tools: Vec<Box<dyn Tool>> = vec![
        Box::new(SearchTool::wikipedia()),
        Box::new(SearchTool::duckduckgo()),
    ];
    let agent = ReactAgent::new(model, tools).with_max_iterations(cli.max_iterations);

    let task = arg_or_prompt(cli.task, "Assign me a task")?;
    let run = agent.run(&task).await?;
    if cli.verbose {
        for (idx, step) in run.steps.iter().enumerate() {
            render_section(&format!("Step {}", idx + 1), &format!("{}\n\nObservation: {}", step.log, step.observation));
        }
    }
    render(&run.output);
    Ok(())
}
