use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub duration_ms: u64,
    pub size_bytes: usize,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn value(&self) -> Result<Value> {
        self.json()
    }
}
