/// Uniform response envelope returned by every gateway query
use crate::errors::GatewayError;
use serde::{Deserialize, Serialize};

/// `{ success, data }` on success, `{ success: false, message, data }` on
/// failure where `data` is the type's default (or a stale copy)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> GatewayResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    /// Failure that still carries data (stale fallback, current vote count)
    pub fn failure_with(message: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data,
        }
    }
}

impl<T: Default> GatewayResponse<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::failure_with(message, T::default())
    }

    pub fn from_result(result: Result<T, GatewayError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
