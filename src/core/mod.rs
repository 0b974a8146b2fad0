//! # Core Module
//!
//! Configuration types for the reflex engine.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod config;

pub use config::BotConfig;
