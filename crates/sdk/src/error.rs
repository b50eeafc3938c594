//! SDK Error Types

use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// Server code for an unknown report id
const NOT_FOUND_CODE: i32 = 4001;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("RPC error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<jsonrpsee::core::ClientError> for SdkError {
    fn from(e: jsonrpsee::core::ClientError) -> Self {
        match e {
            jsonrpsee::core::ClientError::Call(call_err) if call_err.code() == NOT_FOUND_CODE => {
                SdkError::NotFound(call_err.message().to_string())
            }
            jsonrpsee::core::ClientError::Call(call_err) => SdkError::Rpc {
                code: call_err.code(),
                message: call_err.message().to_string(),
            },
            jsonrpsee::core::ClientError::Transport(e) => {
                SdkError::Transport(format!("Transport error: {}", e))
            }
            jsonrpsee::core::ClientError::RestartNeeded(_) => {
                SdkError::Connection("Connection restart needed".to_string())
            }
            jsonrpsee::core::ClientError::ParseError(e) => {
                SdkError::Other(format!("Parse error: {}", e))
            }
            jsonrpsee::core::ClientError::RequestTimeout => {
                SdkError::Timeout("RPC request timed out".to_string())
            }
            _ => SdkError::Other(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::types::ErrorObjectOwned;

    #[test]
    fn test_not_found_is_distinct() {
        let err: SdkError = jsonrpsee::core::ClientError::Call(ErrorObjectOwned::owned(
            4001,
            "Report not found: r-9",
            None::<()>,
        ))
        .into();
        assert!(matches!(err, SdkError::NotFound(ref m) if m.contains("r-9")));

        let err: SdkError = jsonrpsee::core::ClientError::Call(ErrorObjectOwned::owned(
            4003,
            "Rate limit exceeded",
            None::<()>,
        ))
        .into();
        assert!(matches!(err, SdkError::Rpc { code: 4003, .. }));
    }
}
