//! Post-processing of raw model replies.

pub mod json;
pub mod lines;
