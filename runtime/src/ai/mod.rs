pub mod chat;
pub mod prompts;
pub mod runner;
pub mod schemas;
