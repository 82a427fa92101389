//! Core components, types, and utilities for the relevance-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - System prompts and directives for LLM interactions.
//! - Common types and result handling.
//! - Request pacing for rate-limited chat APIs.

pub mod config;
pub mod pacing;
pub mod prompts;
pub mod types;
