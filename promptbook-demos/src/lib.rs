//! Plumbing shared by the demo programs: settings, model selection, terminal input and output.

use std::io;
use std::io::{stdout, BufRead, IsTerminal, Write};
use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use promptbook::config::Settings;
use promptbook::utils::llm::ConversationConfig;
use promptbook::utils::llm::openai::OpenAIChat;
use promptbook::utils::printing::{print_markdown, print_section};
use termimad::crossterm::{cursor, ExecutableCommand};

pub const DEEPSEEK_CHAT_MODEL: &str = "deepseek-chat";
pub const OLLAMA_CHAT_MODEL: &str = "mistral";

/// Load `.env`, start logging and resolve the settings.
pub fn init() -> Settings {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    Settings::from_env()
}

/// Show the cursor again when the user interrupts a redrawing printer.
pub fn restore_cursor_on_ctrlc() -> Result<()> {
    ctrlc::set_handler(|| {
        let _ = stdout().execute(cursor::Show);
        std::process::exit(130);
    })?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Provider {
    #[default]
    Openai,
    Deepseek,
    Ollama,
}

#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// Service answering the prompts
    #[arg(long, value_enum, default_value_t = Provider::Openai)]
    pub provider: Provider,

    /// Model name. Defaults to PROMPTBOOK_CHAT_MODEL for OpenAI, deepseek-chat and mistral otherwise
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,
}

impl ModelArgs {
    pub fn chat_model(&self, settings: &Settings) -> Result<OpenAIChat> {
        let default_model = match self.provider {
            Provider::Openai => settings.chat_model.as_str(),
            Provider::Deepseek => DEEPSEEK_CHAT_MODEL,
            Provider::Ollama => OLLAMA_CHAT_MODEL,
        };
        let mut config = ConversationConfig::new(self.model.as_deref().unwrap_or(default_model));
        if let Some(temperature) = self.temperature {
            config = config.temperature(temperature);
        }
        match self.provider {
            Provider::Openai => OpenAIChat::from_settings(settings, config),
            Provider::Deepseek => OpenAIChat::deepseek(settings, config),
            Provider::Ollama => Ok(OpenAIChat::with_base_url("ollama", settings.ollama_base_url.as_str(), config)),
        }
    }
}

/// Read one line from stdin after printing `label`. Fails at end of input.
pub fn read_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no input for {:?}", label);
    }
    Ok(line.trim().to_string())
}

/// The argument if given, otherwise ask until a non-empty answer arrives.
pub fn arg_or_prompt(arg: Option<String>, label: &str) -> Result<String> {
    if let Some(value) = arg.map(|arg| arg.trim().to_string()).filter(|arg| !arg.is_empty()) {
        return Ok(value);
    }
    loop {
        let value = read_line(label)?;
        if !value.is_empty() {
            return Ok(value);
        }
        eprintln!("Please enter a value.");
    }
}

/// Markdown on a terminal, plain text when piped.
pub fn render(markdown: &str) {
    if stdout().is_terminal() {
        print_markdown(markdown);
    } else {
        println!("{}", markdown);
    }
}

pub fn render_section(title: &str, body: &str) {
    if stdout().is_terminal() {
        print_section(title, body);
    } else {
        println!("## {}\n\n{}\n", title, body);
    }
}
