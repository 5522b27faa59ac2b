use std::collections::HashMap;
use crate::prompt::PartialPrompt;
use anyhow::Result;

pub trait FillPlaceholders {
    fn placeholders_to_fill(&self) -> &Vec<String>;
}

pub trait Fill: FillPlaceholders {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<()>;
}

pub trait FillMut: FillPlaceholders {
    fn fill_mut(&mut self, partial_prompt: &mut PartialPrompt) -> Result<()>;
}

pub trait FillWith<CTX>: FillPlaceholders {
    fn fill_with(&self, partial_prompt: &mut PartialPrompt, context: CTX) -> Result<CTX>;
}

pub trait FillWithMut<CTX>: FillPlaceholders {
    fn fill_with_mut(&mut self, partial_prompt: &mut PartialPrompt, context: CTX) -> Result<CTX>;
}

impl<T: FillWith<()>> Fill for T {
    fn fill(&self, partial_prompt: &mut PartialPrompt) -> Result<()> {
        self.fill_with(partial_prompt, ())
    }
}

impl<T: FillWithMut<()>> FillMut for T {
    fn fill_mut(&mut self, partial_prompt: &mut PartialPrompt) -> Result<()> {
        self.fill_with_mut(partial_prompt, ())
    }
}

/// Fills placeholders from a name to value map.
///
/// Only the placeholders that the partial prompt actually has are filled, so one map can serve
/// several templates.
#[derive(Debug, Clone, Default)]
pub struct MapFiller {
    values: HashMap<String, String>,
    placeholders_to_fill: Vec<String>,
}

impl MapFiller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, placeholder: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let placeholder = placeholder.into();
        if self.values.insert(placeholder.clone(), value.into()).is_none() {
            self.placeholders_to_fill.push(placeholder);
        }
        self
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.values.get(placeholder).map(String::as_str)
    }
}

impl From<HashMap<String, String>> for MapFiller {
    fn from(values: HashMap<String, String>) -> Self {
        let mut placeholders_to_fill: Vec<String> = values.keys().cloned().collect();
        placeholders_to_fill.sort();
        Self {
            values,
            placeholders_to_fill,
        }
    }
}

impl FillPlaceholders for MapFiller {
    fn placeholders_to_fill(&self) -> &Vec<String> {
        &self.placeholders_to_fill
    }
}

impl FillWith<()> for MapFiller {
    fn fill_with(&self, partial_prompt: &mut PartialPrompt, context: ()) -> Result<()> {
        for placeholder in &self.placeholders_to_fill {
            if partial_prompt.template.placeholders.contains(placeholder) {
                partial_prompt.try_fill(placeholder.as_str(), self.values[placeholder].as_str())?;
            }
        }
        Ok(context)
    }
}
