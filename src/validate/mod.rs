//! Pure checks over fetched close-approach bodies.
//!
//! Every check is a total function from a body (raw [`serde_json::Value`] or
//! decoded [`crate::domain::CadResponse`]) to `Ok(())` or a
//! [`ValidationError`] naming the check and the offending row or value.

mod body;
mod records;
mod schema;

pub use body::*;
pub use records::*;
pub use schema::*;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{check} failed: {message}")]
pub struct ValidationError {
    pub check: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(check: &'static str, message: impl Into<String>) -> Self {
        Self {
            check,
            message: message.into(),
        }
    }
}
