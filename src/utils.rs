pub mod llm;
pub mod history;
pub mod embedding;
pub mod splitter;
pub mod vec_stores;
pub mod retrievers;
pub mod search;
pub mod token;
pub mod postprocess;
#[cfg(feature = "terminal_printing")]
pub mod printing;
pub(crate) mod prompt_processing;

use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;
