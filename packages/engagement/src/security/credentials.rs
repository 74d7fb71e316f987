//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate so API tokens never end up in logs, debug output
//! or error messages.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;
use url::Url;

use crate::error::{EngagementError, Result};

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when actually sending the secret (e.g. an auth header).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Base URL and bearer token for the engagement API.
#[derive(Clone)]
pub struct ApiCredentials {
    /// Bearer token (secret)
    pub token: SecretString,

    /// API root; endpoint paths are appended to it
    pub base_url: Url,
}

impl ApiCredentials {
    /// Validate and build credentials.
    pub fn new(base_url: &str, token: impl Into<SecretString>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| EngagementError::Config(format!("invalid API base URL {base_url:?}: {e}")))?;

        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(EngagementError::Config(format!(
                "API base URL must be an http(s) URL, got {base_url}"
            )));
        }

        let token = token.into();
        if token.is_empty() {
            return Err(EngagementError::Config("API token is empty".into()));
        }

        Ok(Self { token, base_url })
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_not_in_debug() {
        let secret = SecretString::new("tok-super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("tok-super"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_secret_not_in_display() {
        let secret = SecretString::new("tok-super-secret");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "tok-super-secret");
    }

    #[test]
    fn test_credentials_debug_hides_token() {
        let creds = ApiCredentials::new("https://api.example.com/v1/", "tok-secret").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("tok-secret"));
        assert!(debug.contains("api.example.com"));
    }

    #[test]
    fn test_credentials_validation() {
        assert!(ApiCredentials::new("not a url", "t").is_err());
        assert!(ApiCredentials::new("ftp://files.example.com", "t").is_err());
        assert!(ApiCredentials::new("mailto:ops@example.com", "t").is_err());
        assert!(ApiCredentials::new("https://api.example.com", "  ").is_err());
    }
}
