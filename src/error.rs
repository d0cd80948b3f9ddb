//! Error types for mm-importer

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Host API error
    #[error("Host error: {0}")]
    Host(#[from] crate::host::HostError),

    /// API server error
    #[error("API error: {0}")]
    Api(String),
}

/// Result type alias for Core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_converts() {
        fn parse(text: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(text)?)
        }

        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, CoreError::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }

    #[test]
    fn test_host_error_keeps_message() {
        let err: CoreError = crate::host::HostError::new("token expired").into();
        assert_eq!(err.to_string(), "Host error: token expired");
    }
}
