//! Timed context search/add commands, the add-then-search recall check, and a memory-backed QnA agent.

pub mod agent;
pub mod cli;
pub mod commands;
pub mod timing;
