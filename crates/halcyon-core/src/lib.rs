//! Shared kernel for the Halcyon assistant.
//!
//! Holds the types every other crate agrees on: timestamps, the top-level
//! error type, domain events, and the application configuration.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::HalcyonConfig;
pub use error::{HalcyonError, Result};
pub use events::DomainEvent;
pub use types::Timestamp;
