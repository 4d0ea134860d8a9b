//! Secure token handling with masking capabilities
//!
//! Registry tokens live in `secrecy::SecretString` from the moment they are
//! resolved; this module is the only place that turns them into text meant
//! for humans, and it never does so unmasked.

use secrecy::{ExposeSecret, SecretString};

/// Masking helper for registry auth tokens
///
/// # Examples
///
/// ```
/// use npm_registry_publisher::security::SecureTokenManager;
///
/// let manager = SecureTokenManager::new();
/// assert_eq!(manager.mask_token("abcdef123456"), "abc...456");
/// assert_eq!(manager.mask_token("short"), "****");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SecureTokenManager;

impl SecureTokenManager {
    pub fn new() -> Self {
        Self
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    pub fn mask_token(&self, token: &str) -> String {
        if token.chars().count() < 10 {
            return "****".to_string();
        }

        let prefix: String = token.chars().take(3).collect();
        let suffix: String = token
            .chars()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Replaces every occurrence of `token` in `text` with its masked form
    ///
    /// An empty token leaves the text unchanged.
    ///
    /// ```
    /// use npm_registry_publisher::security::SecureTokenManager;
    /// use secrecy::SecretString;
    ///
    /// let manager = SecureTokenManager::new();
    /// let token = SecretString::new("glpat-secret-value".to_string().into());
    /// let masked = manager.mask_tokens_in_string("token glpat-secret-value rejected", &token);
    /// assert_eq!(masked, "token glp...lue rejected");
    /// ```
    pub fn mask_tokens_in_string(&self, text: &str, token: &SecretString) -> String {
        let raw = token.expose_secret();
        if raw.is_empty() {
            return text.to_string();
        }

        text.replace(raw, &self.mask_token(raw))
    }

    /// Short description of a token for log lines
    pub fn describe(&self, token: &SecretString) -> String {
        let raw = token.expose_secret();
        if raw.is_empty() {
            "<empty>".to_string()
        } else {
            self.mask_token(raw)
        }
    }

    pub fn is_empty(&self, token: &SecretString) -> bool {
        token.expose_secret().is_empty()
    }
}
