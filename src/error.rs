//! Crate-level error type for the front end.

use objectify_core::{ConversionError, RegistryError};
use thiserror::Error;

use crate::schema::ParseError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("schema parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("schema error: {0}")]
    Registry(#[from] RegistryError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("number {0} does not fit in a 64-bit signed integer")]
    NumberOutOfRange(String),
}

pub type Result<T> = std::result::Result<T, Error>;
