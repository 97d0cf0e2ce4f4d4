pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod research;
pub mod search;
pub mod usage;
