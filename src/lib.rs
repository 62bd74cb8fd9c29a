//! Viral content discovery and synthetic persona generation on top of a
//! hosted generative-AI provider.

pub mod config;
pub mod error;
pub mod filter;
pub mod gemini;
pub mod model;
pub mod pipeline;
pub mod poller;
pub mod store;
pub mod validate;
