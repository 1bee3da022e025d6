//! Agent boundary - tool dispatch for the emissions assistant
//!
//! This crate is the thin layer between the conversational surface and the
//! deterministic core:
//! - Typed tools (`tools`) wrapping the core compare/estimate/resolve
//!   operations and the supplier index
//! - A pluggable LLM client (`llm`) used only to translate a user message
//!   into a structured tool call
//! - The runtime (`runtime`) that assembles the tool prompt, parses the
//!   LLM's tool call, and dispatches it through the registry
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. Every emissions figure, cache
//! decision, and fallback choice is made by the deterministic core; the
//! core never parses free text.

pub mod llm;
pub mod runtime;
pub mod suppliers;
pub mod tools;
