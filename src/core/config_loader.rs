//! Configuration file loader for npm-registry-publisher
//!
//! This module provides configuration loading, validation, merging and
//! resolution into [`PublishSettings`].

use super::config::*;
use crate::core::error::PublishError;
use lazy_static::lazy_static;
use regex::Regex;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};
use url::Url;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".npm-publish.yaml";

lazy_static! {
    /// Environment variable pattern (${VAR_NAME})
    static ref ENV_VAR_REGEX: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid");
}

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Explicit config file (replaces the project config lookup)
    pub config_file: Option<PathBuf>,

    /// Home directory holding the global config
    pub home_dir: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublishConfig>,

    /// Directory relative paths in `cli_args` are taken against
    pub working_dir: Option<PathBuf>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options for `project_path` using the current process environment
    pub fn from_env<P: AsRef<Path>>(project_path: P) -> Self {
        let env: HashMap<String, String> = std::env::vars().collect();
        let home_dir = env.get("HOME").map(PathBuf::from);

        Self {
            project_path: project_path.as_ref().to_path_buf(),
            config_file: None,
            home_dir,
            cli_args: None,
            working_dir: std::env::current_dir().ok(),
            env,
        }
    }
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "registry.url")
    pub field: String,

    /// Error message
    pub message: String,

    /// Expected type/value
    pub expected: Option<String>,

    /// Actual type/value
    pub actual: Option<String>,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.npm-publish.yaml or an explicit file)
    /// 4. Global config (~/.npm-publish.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublishConfig, PublishError> {
        let mut configs: Vec<PublishConfig> = Vec::new();

        // 5. Default values (lowest priority)
        configs.push(PublishConfig::default());

        // 4. Global config
        if let Some(home_dir) = &options.home_dir {
            let global_path = home_dir.join(CONFIG_FILENAME);
            if let Some(global_config) = Self::load_config_file(&global_path).await? {
                debug!("loaded global config from {}", global_path.display());
                configs.push(global_config);
            }
        }

        // 3. Project config
        match &options.config_file {
            Some(explicit) => {
                let config = Self::load_config_file(explicit).await?.ok_or_else(|| {
                    PublishError::ConfigError(format!(
                        "Config file not found: {}",
                        explicit.display()
                    ))
                })?;
                configs.push(config);
            }
            None => {
                let project_path = options.project_path.join(CONFIG_FILENAME);
                if let Some(project_config) = Self::load_config_file(&project_path).await? {
                    debug!("loaded project config from {}", project_path.display());
                    configs.push(project_config);
                }
            }
        }

        // 2. Environment variables
        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        // 1. CLI arguments (highest priority)
        if let Some(mut cli_config) = options.cli_args {
            if let Some(working_dir) = &options.working_dir {
                Self::anchor_package_paths(&mut cli_config, working_dir);
            }
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);

        Self::expand_env_vars(merged_config, &options.env)
    }

    /// Make relative package paths absolute against `base`
    ///
    /// Paths typed on the command line are relative to where the command
    /// runs, not to the project directory used for config file paths.
    pub fn anchor_package_paths(config: &mut PublishConfig, base: &Path) {
        let Some(package) = config.package.as_mut() else {
            return;
        };
        for path in [&mut package.source_dir, &mut package.metadata]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(
        file_path: &Path,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Option<PublishConfig>, PublishError>>
                + Send
                + '_,
        >,
    > {
        Box::pin(async move {
            if !file_path.exists() {
                return Ok(None);
            }

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                PublishError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: PublishConfig = serde_yaml::from_str(&content).map_err(|e| {
                PublishError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?;

            // Handle extends if present
            if let Some(extends_path) = &config.extends {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| {
                        PublishError::ConfigError("Invalid config file path".to_string())
                    })?
                    .join(extends_path);

                if let Some(base_config) = Self::load_config_file(&base_path).await? {
                    return Ok(Some(Self::merge_configs(vec![base_config, config])));
                }
            }

            Ok(Some(config))
        })
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PublishConfig> {
        let mut registry = RegistryConfig::default();
        let mut publish = PublishBehaviorConfig::default();

        // NPM_PUBLISH_REGISTRY -> registry.url
        if let Some(url) = env.get("NPM_PUBLISH_REGISTRY") {
            registry.url = Some(url.clone());
        }

        // NPM_TOKEN -> registry.token
        if let Some(token) = env.get("NPM_TOKEN") {
            registry.token = Some(token.clone());
        }

        // NPM_PUBLISH_TAG -> registry.tag
        if let Some(tag) = env.get("NPM_PUBLISH_TAG") {
            registry.tag = Some(tag.clone());
        }

        // NPM_PUBLISH_STRICT -> publish.responsePolicy
        if env.get("NPM_PUBLISH_STRICT").map(|s| s.as_str()) == Some("true") {
            publish.response_policy = Some(ResponsePolicy::Strict);
        }

        // NPM_PUBLISH_DRY_RUN -> publish.dryRun
        if env.get("NPM_PUBLISH_DRY_RUN").map(|s| s.as_str()) == Some("true") {
            publish.dry_run = Some(true);
        }

        let has_registry = registry != RegistryConfig::default();
        let has_publish = publish != PublishBehaviorConfig::default();
        if !has_registry && !has_publish {
            return None;
        }

        Some(PublishConfig {
            registry: has_registry.then_some(registry),
            publish: has_publish.then_some(publish),
            ..Default::default()
        })
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<PublishConfig>) -> PublishConfig {
        let mut result = PublishConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target, field by field
    fn merge_into(target: &mut PublishConfig, source: PublishConfig) {
        if !source.version.is_empty() {
            target.version = source.version;
        }

        if source.extends.is_some() {
            target.extends = source.extends;
        }

        if let Some(source_registry) = source.registry {
            let target_registry = target.registry.get_or_insert_with(Default::default);
            if source_registry.url.is_some() {
                target_registry.url = source_registry.url;
            }
            if source_registry.token.is_some() {
                target_registry.token = source_registry.token;
            }
            if source_registry.tag.is_some() {
                target_registry.tag = source_registry.tag;
            }
            if source_registry.access.is_some() {
                target_registry.access = source_registry.access;
            }
            if source_registry.timeout_secs.is_some() {
                target_registry.timeout_secs = source_registry.timeout_secs;
            }
        }

        if let Some(source_package) = source.package {
            let target_package = target.package.get_or_insert_with(Default::default);
            if source_package.source_dir.is_some() {
                target_package.source_dir = source_package.source_dir;
            }
            if source_package.metadata.is_some() {
                target_package.metadata = source_package.metadata;
            }
        }

        if let Some(source_publish) = source.publish {
            let target_publish = target.publish.get_or_insert_with(Default::default);
            if source_publish.dry_run.is_some() {
                target_publish.dry_run = source_publish.dry_run;
            }
            if source_publish.response_policy.is_some() {
                target_publish.response_policy = source_publish.response_policy;
            }
        }

        if source.security.is_some() {
            target.security = source.security;
        }
    }

    /// Expand `${VAR}` references in the registry section
    ///
    /// Respects `security.envVarExpansion.enabled` and `allowedPrefixes`.
    fn expand_env_vars(
        mut config: PublishConfig,
        env: &HashMap<String, String>,
    ) -> Result<PublishConfig, PublishError> {
        let expansion = config
            .security
            .as_ref()
            .and_then(|s| s.env_var_expansion.clone())
            .unwrap_or_default();

        if !expansion.enabled.unwrap_or(true) {
            return Ok(config);
        }

        let allowed_prefixes = expansion.allowed_prefixes;

        if let Some(registry) = &mut config.registry {
            if let Some(url) = &registry.url {
                registry.url = Some(Self::expand_string(url, env, &allowed_prefixes)?);
            }
            if let Some(token) = &registry.token {
                registry.token = Some(Self::expand_string(token, env, &allowed_prefixes)?);
            }
            if let Some(tag) = &registry.tag {
                registry.tag = Some(Self::expand_string(tag, env, &allowed_prefixes)?);
            }
        }

        Ok(config)
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables expand to the empty string, matching shell behaviour.
    fn expand_string(
        input: &str,
        env: &HashMap<String, String>,
        allowed_prefixes: &Option<Vec<String>>,
    ) -> Result<String, PublishError> {
        let mut result = input.to_string();
        for cap in ENV_VAR_REGEX.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(prefixes) = allowed_prefixes {
                let allowed = prefixes.iter().any(|prefix| var_name.starts_with(prefix));
                if !allowed {
                    return Err(PublishError::ConfigError(format!(
                        "Environment variable {} is not allowed by envVarExpansion.allowedPrefixes",
                        var_name
                    )));
                }
            }

            let value = match env.get(var_name) {
                Some(value) => value.as_str(),
                None => {
                    warn!("environment variable {} not found, expanding to empty", var_name);
                    ""
                }
            };
            result = result.replace(&format!("${{{}}}", var_name), value);
        }

        Ok(result)
    }

    /// Validate a merged configuration
    pub fn validate(config: &PublishConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Check version (required)
        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
                expected: Some(format!("string (e.g., \"{}\")", CONFIG_SCHEMA_VERSION)),
                actual: Some("empty".to_string()),
            });
        } else if config.version != CONFIG_SCHEMA_VERSION {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some(format!(
                    "Currently supported version is \"{}\" only",
                    CONFIG_SCHEMA_VERSION
                )),
            });
        }

        // 2. Validate registry
        match &config.registry {
            Some(registry) => Self::validate_registry(registry, &mut errors, &mut warnings),
            None => errors.push(ConfigValidationError {
                field: "registry.url".to_string(),
                message: "Registry URL is required".to_string(),
                expected: Some("http(s) URL".to_string()),
                actual: Some("missing".to_string()),
            }),
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Validate the registry section
    fn validate_registry(
        registry: &RegistryConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        match registry.url.as_deref() {
            None | Some("") => errors.push(ConfigValidationError {
                field: "registry.url".to_string(),
                message: "Registry URL is required".to_string(),
                expected: Some("http(s) URL".to_string()),
                actual: Some("missing".to_string()),
            }),
            Some(raw) => match Url::parse(raw) {
                Ok(url) if url.scheme() == "https" => {}
                Ok(url) if url.scheme() == "http" => warnings.push(ConfigValidationWarning {
                    field: "registry.url".to_string(),
                    message: "Registry URL uses plain http; the token is sent unencrypted"
                        .to_string(),
                    suggestion: Some("Use an https:// registry URL".to_string()),
                }),
                Ok(url) => errors.push(ConfigValidationError {
                    field: "registry.url".to_string(),
                    message: "Unsupported URL scheme".to_string(),
                    expected: Some("http or https".to_string()),
                    actual: Some(url.scheme().to_string()),
                }),
                Err(e) => errors.push(ConfigValidationError {
                    field: "registry.url".to_string(),
                    message: format!("Invalid URL: {}", e),
                    expected: Some("http(s) URL".to_string()),
                    actual: Some(raw.to_string()),
                }),
            },
        }

        if let Some(tag) = &registry.tag {
            if tag.is_empty() {
                errors.push(ConfigValidationError {
                    field: "registry.tag".to_string(),
                    message: "Tag must not be empty".to_string(),
                    expected: Some("non-empty string".to_string()),
                    actual: Some("empty".to_string()),
                });
            } else if semver::VersionReq::parse(tag).is_ok() {
                // npm rejects dist-tags that look like versions or ranges
                errors.push(ConfigValidationError {
                    field: "registry.tag".to_string(),
                    message: "Tag must not be a valid SemVer range".to_string(),
                    expected: Some("tag name (e.g., \"latest\", \"beta\")".to_string()),
                    actual: Some(tag.clone()),
                });
            }
        }

        if registry.timeout_secs == Some(0) {
            errors.push(ConfigValidationError {
                field: "registry.timeoutSecs".to_string(),
                message: "Timeout must be greater than zero".to_string(),
                expected: Some("positive integer".to_string()),
                actual: Some("0".to_string()),
            });
        }

        if registry.token.as_deref().unwrap_or("").is_empty() {
            warnings.push(ConfigValidationWarning {
                field: "registry.token".to_string(),
                message: "Auth token is empty".to_string(),
                suggestion: Some("Set NPM_TOKEN or registry.token".to_string()),
            });
        }
    }

    /// Validate and resolve a merged configuration into publish settings
    ///
    /// Relative paths are resolved against `project_path`. The token is taken
    /// verbatim; a missing token resolves to the empty string.
    pub fn resolve(
        config: PublishConfig,
        project_path: &Path,
    ) -> Result<PublishSettings, PublishError> {
        let validation = Self::validate(&config);
        for warning in &validation.warnings {
            warn!("config {}: {}", warning.field, warning.message);
        }
        if let Some(error) = validation.errors.first() {
            return Err(PublishError::ConfigError(format!(
                "[{}] {}",
                error.field, error.message
            )));
        }

        let registry = config.registry.unwrap_or_default();
        let raw_url = registry.url.unwrap_or_default();
        let registry_url = Self::normalize_registry_url(&raw_url)?;

        let package = config.package.unwrap_or_default();
        let source_dir = match package.source_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => project_path.join(dir),
            None => project_path.to_path_buf(),
        };
        let metadata_path = match package.metadata {
            Some(path) if path.is_absolute() => path,
            Some(path) => project_path.join(path),
            None => source_dir.join("package.json"),
        };

        let publish = config.publish.unwrap_or_default();

        Ok(PublishSettings {
            registry_url,
            token: SecretString::new(registry.token.unwrap_or_default().into()),
            tag: registry.tag.unwrap_or_else(|| DEFAULT_DIST_TAG.to_string()),
            access: registry.access,
            timeout: registry.timeout_secs.map(Duration::from_secs),
            source_dir,
            metadata_path,
            dry_run: publish.dry_run.unwrap_or(false),
            response_policy: publish.response_policy.unwrap_or_default(),
        })
    }

    /// Parse a registry URL and make sure it ends with a slash so that
    /// package paths are joined beneath it
    pub fn normalize_registry_url(raw: &str) -> Result<Url, PublishError> {
        let with_slash = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{}/", raw)
        };

        let url = Url::parse(&with_slash).map_err(|e| PublishError::InvalidRegistryUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(PublishError::InvalidRegistryUrl {
                url: raw.to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(url)
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    💡 {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}
