//! # ReAct agent
//!
//! A reason-and-act loop. The model is shown the available tools and answers in the
//! `Thought / Action / Action Input` format; each action is executed and its observation appended to a scratchpad
//! until the model produces a `Final Answer`.

use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use anyhow::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::prompt::PromptTemplate;
use crate::utils::llm::ChatModel;
use crate::utils::search::{format_results, DuckDuckGo, WebSearch, Wikipedia};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const FINAL_ANSWER_ACTION: &str = "Final Answer:";
/// Observation fed back when the model's reply cannot be parsed.
pub const INVALID_FORMAT_OBSERVATION: &str = "Invalid or incomplete response";

lazy_static! {
    static ref REACT_TEMPLATE: PromptTemplate = PromptTemplate::new(
        "Answer the following questions as best you can. You have access to the following tools:\n\n\
        {{tools}}\n\n\
        Use the following format:\n\n\
        Question: the input question you must answer\n\
        Thought: you should always think about what to do\n\
        Action: the action to take, should be one of [{{tool_names}}]\n\
        Action Input: the input to the action\n\
        Observation: the result of the action\n\
        ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
        Thought: I now know the final answer\n\
        Final Answer: the final answer to the original input question\n\n\
        Begin!\n\n\
        Question: {{input}}\n\
        Thought:{{agent_scratchpad}}");
    static ref ACTION_RE: Regex = Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)\s*Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)").unwrap();
    static ref ACTION_ONLY_RE: Regex = Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)").unwrap();
}

/// Something the agent can do.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn call(&self, input: &str) -> Result<String>;
}

/// A tool that answers with web search results.
pub struct SearchTool<S: WebSearch> {
    pub name: String,
    pub description: String,
    pub search: S,
    pub num_results: usize,
}

impl SearchTool<Wikipedia> {
    pub fn wikipedia() -> Self {
        Self {
            name: "wikipedia".to_string(),
            description: "A wrapper around Wikipedia. Useful for when you need to answer general questions about \
            people, places, companies, facts, historical events, or other subjects. Input should be a search query."
                .to_string(),
            search: Wikipedia::default(),
            num_results: 3,
        }
    }
}

impl SearchTool<DuckDuckGo> {
    pub fn duckduckgo() -> Self {
        Self {
            name: "duckduckgo_search".to_string(),
            description: "A wrapper around DuckDuckGo Search. Useful for when you need to answer questions about \
            current events. Input should be a search query."
                .to_string(),
            search: DuckDuckGo::default(),
            num_results: 4,
        }
    }
}

#[async_trait]
impl<S: WebSearch> Tool for SearchTool<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, input: &str) -> Result<String> {
        let results = self.search.results(input, self.num_results).await?;
        if results.is_empty() {
            Ok("No good search result found".to_string())
        } else {
            Ok(format_results(&results))
        }
    }
}

/// A parsed model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutput {
    Action {
        tool: String,
        tool_input: String,
        log: String,
    },
    Finish {
        output: String,
        log: String,
    },
}

/// Error when a model reply follows neither the action nor the final answer format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputParseError {
    pub reason: &'static str,
    pub reply: String,
}

impl fmt::Display for OutputParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse LLM output ({}): `{}`", self.reason, self.reply)
    }
}

impl Error for OutputParseError {}

/// Error when the agent runs out of iterations without a final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStepLimit {
    pub max_iterations: usize,
}

impl fmt::Display for AgentStepLimit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Agent stopped due to iteration limit ({} iterations)", self.max_iterations)
    }
}

impl Error for AgentStepLimit {}

/// Parse a reply in the ReAct format.
pub fn parse_output(reply: &str) -> Result<AgentOutput, OutputParseError> {
    let error = |reason| OutputParseError { reason, reply: reply.to_string() };
    let includes_answer = reply.contains(FINAL_ANSWER_ACTION);
    if let Some(captures) = ACTION_RE.captures(reply) {
        if includes_answer {
            return Err(error("both a final answer and a parse-able action"));
        }
        let tool = captures[1].trim().to_string();
        let tool_input = captures[2].trim().trim_matches('"').to_string();
        return Ok(AgentOutput::Action { tool, tool_input, log: reply.to_string() });
    }
    if includes_answer {
        let output = reply
            .rsplit(FINAL_ANSWER_ACTION)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        return Ok(AgentOutput::Finish { output, log: reply.to_string() });
    }
    if !ACTION_ONLY_RE.is_match(reply) {
        Err(error("missing 'Action:' after 'Thought:'"))
    } else {
        Err(error("missing 'Action Input:' after 'Action:'"))
    }
}

/// One executed step: what the model said and what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStep {
    pub tool: String,
    pub tool_input: String,
    pub log: String,
    pub observation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRun {
    pub output: String,
    pub steps: Vec<AgentStep>,
}

pub struct ReactAgent<M: ChatModel> {
    pub model: M,
    pub tools: Vec<Box<dyn Tool>>,
    pub max_iterations: usize,
}

impl<M: ChatModel> ReactAgent<M> {
    pub fn new(model: M, tools: Vec<Box<dyn Tool>>) -> Self {
        Self {
            model,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn tool_names(&self) -> String {
        self.tools.iter().map(|tool| tool.name()).collect::<Vec<_>>().join(", ")
    }

    fn prompt(&self, input: &str, steps: &[AgentStep]) -> Result<String> {
        let tools = self.tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n");
        let scratchpad: String = steps
            .iter()
            .map(|step| format!("{}\nObservation: {}\nThought: ", step.log, step.observation))
            .collect();
        REACT_TEMPLATE.format(&[
            ("tools", &tools),
            ("tool_names", &self.tool_names()),
            ("input", input),
            ("agent_scratchpad", &scratchpad),
        ])
    }

    async fn observe(&self, tool_name: &str, tool_input: &str) -> String {
        match self.tools.iter().find(|tool| tool.name() == tool_name) {
            Some(tool) => match tool.call(tool_input).await {
                Ok(observation) => observation,
                Err(e) => {
                    warn!("tool {} failed: {:#}", tool_name, e);
                    format!("Error: {}", e)
                }
            },
            None => format!("{} is not a valid tool, try one of [{}].", tool_name, self.tool_names()),
        }
    }

    /// Run until a final answer. Fails with [AgentStepLimit] after `max_iterations` steps.
    pub async fn run(&self, input: &str) -> Result<AgentRun> {
        let mut steps: Vec<AgentStep> = Vec::new();
        for iteration in 0..self.max_iterations {
            let prompt = self.prompt(input, &steps)?;
            let reply = self.model.invoke(&prompt).await?;
            // the model may hallucinate an observation, only its own part counts
            let reply = match reply.find("\nObservation:") {
                Some(idx) => reply[..idx].to_string(),
                None => reply,
            };
            debug!("agent iteration {}:\n{}", iteration, reply);
            match parse_output(&reply) {
                Ok(AgentOutput::Finish { output, .. }) => {
                    info!("agent finished after {} steps", steps.len());
                    return Ok(AgentRun { output, steps });
                }
                Ok(AgentOutput::Action { tool, tool_input, log }) => {
                    info!("agent calls {} with {:?}", tool, tool_input);
                    let observation = self.observe(&tool, &tool_input).await;
                    steps.push(AgentStep { tool, tool_input, log, observation });
                }
                Err(e) => {
                    warn!("{}", e);
                    steps.push(AgentStep {
                        tool: "_Exception".to_string(),
                        tool_input: INVALID_FORMAT_OBSERVATION.to_string(),
                        log: reply,
                        observation: INVALID_FORMAT_OBSERVATION.to_string(),
                    });
                }
            }
        }
        Err(AgentStepLimit { max_iterations: self.max_iterations }.into())
    }
}
