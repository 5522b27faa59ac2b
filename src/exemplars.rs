//! # Applications
//!
//! * [essay_writer]: outline, research, draft, then a bounded critique and revise loop
//! * [chains]: single-prompt guides and two-step chains
//! * [doc_qa]: conversational question answering over local documents
//! * [react_agent]: a tool-using ReAct agent
//! * [vision]: image description and identity document checks

pub mod essay_writer;
pub mod chains;
pub mod doc_qa;
pub mod react_agent;
pub mod vision;
