pub mod categorize;
pub mod cli;
pub mod config;
pub mod error;
pub mod html;
pub mod jira;
pub mod render;
