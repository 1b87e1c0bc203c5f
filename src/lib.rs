//! Support intake: AI-triaged customer support tickets.

pub mod assignment;
pub mod classifier;
pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod notifier;
pub mod recorder;
