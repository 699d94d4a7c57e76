//! Inference API credentials.
//!
//! Tokens are wrapped in `secrecy` so they never reach logs or error
//! messages by accident.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// A token that renders as `[REDACTED]` in `Debug` and `Display`.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the token; only call this when building a request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_blank(&self) -> bool {
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

/// Token plus model for a hosted zero-shot endpoint.
#[derive(Clone)]
pub struct InferenceCredentials {
    pub api_token: SecretString,

    /// Model identifier, e.g. `facebook/bart-large-mnli`
    pub model: String,

    /// Endpoint override (self-hosted inference servers)
    pub base_url: Option<String>,
}

impl InferenceCredentials {
    pub fn new(api_token: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_token: SecretString::new(api_token),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl fmt::Debug for InferenceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceCredentials")
            .field("api_token", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}
