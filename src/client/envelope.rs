use serde::{Deserialize, Serialize};

use crate::error::{BelayError, Result};

/// Standard JSON envelope returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Payload of a successful envelope; [`BelayError::Api`] otherwise.
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "request was not successful".to_string());
            return Err(BelayError::Api(reason));
        }
        self.data
            .ok_or_else(|| BelayError::Api("response has no data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        id: u32,
    }

    #[test]
    fn successful_envelope_yields_data() {
        let env: ApiResponse<User> =
            serde_json::from_value(json!({"success": true, "data": {"id": 7}})).unwrap();
        assert_eq!(env.into_data().unwrap(), User { id: 7 });
    }

    #[test]
    fn failed_envelope_prefers_error_over_message() {
        let env: ApiResponse<User> = serde_json::from_value(
            json!({"success": false, "error": "Not found", "message": "ignored"}),
        )
        .unwrap();
        let err = env.into_data().unwrap_err();
        assert!(matches!(err, BelayError::Api(ref msg) if msg == "Not found"));
    }

    #[test]
    fn success_without_data_is_an_error() {
        let env: ApiResponse<User> = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(matches!(env.into_data(), Err(BelayError::Api(_))));
    }
}
