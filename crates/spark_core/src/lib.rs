//! Shared types and configuration for the Spark chat client.

pub mod config;
pub mod language;
pub mod message;

pub use config::{Credentials, SparkConfig};
pub use language::LanguageProfile;
pub use message::{Role, Turn};
