//! Agent onboarding — phase resolution and checkpointing for trading agent sessions.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod store;
