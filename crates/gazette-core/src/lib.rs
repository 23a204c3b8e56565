//! Core domain + application logic for the gazette article bot.
//!
//! This crate is intentionally framework-agnostic. The chat platform, the
//! LLM provider and the persistent store live behind ports (traits)
//! implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod llm;
pub mod logging;
pub mod messaging;
pub mod pipeline;
pub mod pricing;
pub mod store;

pub use errors::{Error, Result};
