//! Core traits and types for registry access
//!
//! The publisher never talks HTTP itself: it hands a [`PublishRequest`] to an
//! injected [`RegistryClient`], which makes production and test wiring explicit.

use crate::package::PackageMetadata;
use crate::registry::PublishDocument;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// Requests
// ============================================================================

/// One publish submission: `{metadata, auth: {token}, body}`
pub struct PublishRequest<'a> {
    /// Registry base URL (always ends with `/`)
    pub registry_url: &'a Url,

    /// Package metadata exactly as loaded from the descriptor
    pub metadata: &'a PackageMetadata,

    /// Auth token, sent verbatim
    pub token: &'a SecretString,

    /// npm publish document carrying the tarball attachment
    pub document: PublishDocument,
}

// ============================================================================
// Responses
// ============================================================================

/// Raw registry reply; interpreting it is left to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub status: u16,
    pub body: String,
}

impl RegistryResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// Registry Client Trait
// ============================================================================

/// Transport used to submit a publish request to an npm registry
///
/// Implementations return `Ok` whenever the registry answered, whatever the
/// status code, and `Err` only when no answer was obtained.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Client name for logs (e.g., "http")
    fn name(&self) -> &str;

    /// Submit the package document to the registry
    async fn put_package(&self, request: &PublishRequest<'_>) -> anyhow::Result<RegistryResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_response_success_range() {
        let ok = RegistryResponse {
            status: 201,
            body: "{}".to_string(),
        };
        let conflict = RegistryResponse {
            status: 409,
            body: "conflict".to_string(),
        };
        let redirect = RegistryResponse {
            status: 302,
            body: String::new(),
        };

        assert!(ok.is_success());
        assert!(!conflict.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn test_registry_response_serialization() {
        let response = RegistryResponse {
            status: 200,
            body: "{\"ok\":true}".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":200"));

        let deserialized: RegistryResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, response);
    }
}
