//! Configuration structures and types for npm-registry-publisher
//!
//! This module provides type-safe configuration management with serde support.
//! `PublishConfig` mirrors the `.npm-publish.yaml` file; `PublishSettings` is the
//! validated, fully-resolved form consumed by the publisher.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Current configuration schema version
pub const CONFIG_SCHEMA_VERSION: &str = "1.0";

/// Default dist-tag applied to a published version
pub const DEFAULT_DIST_TAG: &str = "latest";

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishConfig {
    /// Schema version (required)
    pub version: String,

    /// Extend from base configuration file (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Target registry (optional in a single layer, required once merged)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,

    /// Package source locations (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageSourceConfig>,

    /// Publish behaviour (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishBehaviorConfig>,

    /// Security settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_SCHEMA_VERSION.to_string(),
            extends: None,
            registry: None,
            package: None,
            publish: None,
            security: None,
        }
    }
}

/// Registry endpoint configuration
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Registry base URL, e.g. `https://gitlab.com/api/v4/projects/1/packages/npm/`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Auth token (supports `${NPM_TOKEN}` expansion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// npm dist-tag (default: "latest")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Package access level (default: unset, registry decides)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<NpmAccess>,

    /// Request timeout in seconds (default: none)
    #[serde(skip_serializing_if = "Option::is_none", rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("tag", &self.tag)
            .field("access", &self.access)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// npm package access level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NpmAccess {
    Public,
    Restricted,
}

impl NpmAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            NpmAccess::Public => "public",
            NpmAccess::Restricted => "restricted",
        }
    }
}

impl std::str::FromStr for NpmAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(NpmAccess::Public),
            "restricted" => Ok(NpmAccess::Restricted),
            other => Err(format!(
                "invalid access level '{}' (expected public or restricted)",
                other
            )),
        }
    }
}

/// Package source locations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageSourceConfig {
    /// Directory to archive (default: project directory)
    #[serde(skip_serializing_if = "Option::is_none", rename = "sourceDir")]
    pub source_dir: Option<PathBuf>,

    /// Metadata descriptor (default: `<sourceDir>/package.json`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PathBuf>,
}

/// Publish behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublishBehaviorConfig {
    /// Build everything but skip the registry request
    #[serde(skip_serializing_if = "Option::is_none", rename = "dryRun")]
    pub dry_run: Option<bool>,

    /// How a completed registry request is judged
    #[serde(skip_serializing_if = "Option::is_none", rename = "responsePolicy")]
    pub response_policy: Option<ResponsePolicy>,
}

/// How the publisher treats the registry's reply once the request completes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePolicy {
    /// Any completed request counts as published; failures are only logged
    #[default]
    Lenient,
    /// Non-2xx replies and transport failures are errors
    Strict,
}

/// Security configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SecurityConfig {
    /// Environment variable expansion settings
    #[serde(skip_serializing_if = "Option::is_none", rename = "envVarExpansion")]
    pub env_var_expansion: Option<EnvVarExpansionConfig>,
}

/// Environment variable expansion settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvVarExpansionConfig {
    /// Enable `${VAR}` expansion (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Only variables starting with one of these prefixes are expanded
    #[serde(skip_serializing_if = "Option::is_none", rename = "allowedPrefixes")]
    pub allowed_prefixes: Option<Vec<String>>,
}

/// Fully resolved settings for one publish run
pub struct PublishSettings {
    pub registry_url: Url,
    pub token: SecretString,
    pub tag: String,
    pub access: Option<NpmAccess>,
    pub timeout: Option<Duration>,
    pub source_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub dry_run: bool,
    pub response_policy: ResponsePolicy,
}

impl fmt::Debug for PublishSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishSettings")
            .field("registry_url", &self.registry_url.as_str())
            .field("token", &"[REDACTED]")
            .field("tag", &self.tag)
            .field("access", &self.access)
            .field("timeout", &self.timeout)
            .field("source_dir", &self.source_dir)
            .field("metadata_path", &self.metadata_path)
            .field("dry_run", &self.dry_run)
            .field("response_policy", &self.response_policy)
            .finish()
    }
}
