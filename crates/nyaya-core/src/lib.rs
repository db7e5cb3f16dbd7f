//! Core types shared across the Nyaya workspace.
//!
//! Defines the conversational data model, the TOML configuration, and the
//! top-level error type that subsystem crates convert into.

pub mod config;
pub mod error;
pub mod types;

pub use config::NyayaConfig;
pub use error::{NyayaError, Result};
pub use types::{Message, Sender};
