//! Error types

use thiserror::Error;

/// Main error type for Greetly
///
/// The dispatch pipeline reports failures as result values rather than
/// errors, so only startup concerns live here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
