//! Credential selection and masking.
//!
//! Stored configs may carry both an API key and an auth token. Only one is
//! ever projected into the environment, and neither is printed in full.

use super::types::ApiConfig;

/// Which credential a configuration authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Sent as `ANTHROPIC_API_KEY` (`x-api-key` header).
    ApiKey,
    /// Sent as `ANTHROPIC_AUTH_TOKEN` (`Authorization: Bearer`).
    AuthToken,
}

impl AuthMethod {
    pub fn label(&self) -> &'static str {
        match self {
            AuthMethod::ApiKey => "api_key",
            AuthMethod::AuthToken => "auth_token",
        }
    }
}

/// Wrapper for sensitive strings that prevents accidental logging.
///
/// The inner value is never exposed via Debug or Display traits.
/// Use `expose()` to access the actual value when it must be written out.
#[derive(Clone, PartialEq, Eq)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short recognizable form, e.g. `sk-a…wxyz`.
    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(••••••••)")
    }
}

impl std::fmt::Display for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "••••••••")
    }
}

/// Show at most the first 4 and last 4 characters of a secret.
///
/// Values of 12 characters or fewer are fully hidden.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 12 {
        return "••••••••".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

impl ApiConfig {
    /// The credential projected into the environment.
    ///
    /// The API key wins when both are set.
    pub fn credential(&self) -> Option<(AuthMethod, SecureString)> {
        if !self.api_key.is_empty() {
            return Some((AuthMethod::ApiKey, SecureString::new(self.api_key.clone())));
        }
        if !self.auth_token.is_empty() {
            return Some((
                AuthMethod::AuthToken,
                SecureString::new(self.auth_token.clone()),
            ));
        }
        None
    }
}
