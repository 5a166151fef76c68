//! Agent output stream handling.
//!
//! The claude CLI writes newline-delimited JSON to stdout. [`codec`] turns
//! the raw byte stream into complete lines regardless of chunk boundaries,
//! [`classifier`] normalizes each line into an [`classifier::AgentMessage`],
//! and [`preview`] renders one-line summaries for operator logs.

pub mod classifier;
pub mod codec;
pub mod preview;
