//! Error types for SOAP client configuration.

use thiserror::Error;

/// Errors raised while building or configuring SOAP clients.
#[derive(Error, Debug)]
pub enum SoapClientError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Policy reference not found: {0}")]
    PolicyNotFound(String),

    #[error("Unsupported policy reference scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid policy document: {0}")]
    InvalidPolicy(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("Missing required variable \"{0}\"")]
    MissingVariable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Interceptor error: {0}")]
    Interceptor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SoapClientError {
    /// Build an [`SoapClientError::InvalidUrl`] for the given input.
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }
}

impl From<quick_xml::Error> for SoapClientError {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlParse(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = SoapClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_message() {
        let source = url::Url::parse("not a url").unwrap_err();
        let err = SoapClientError::invalid_url("not a url", source);
        let message = err.to_string();
        assert!(message.starts_with("Invalid URL 'not a url'"));
    }

    #[test]
    fn test_missing_variable_message() {
        let err = SoapClientError::MissingVariable("SECURITY_TOKEN_SERVICE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required variable \"SECURITY_TOKEN_SERVICE_URL\""
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SoapClientError = io.into();
        assert!(matches!(err, SoapClientError::Io(_)));
    }
}
