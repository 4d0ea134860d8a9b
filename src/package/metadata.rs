//! Package metadata (package.json) loading
//!
//! The descriptor is kept verbatim as a JSON object so that every descriptive
//! field reaches the registry untouched; only `name` and `version` are lifted
//! out and checked.

use crate::core::error::PublishError;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Maximum package name length, scope included
const MAX_NAME_LENGTH: usize = 214;

lazy_static! {
    static ref NAME_CHARS: Regex = Regex::new(r"^[a-z0-9._-]+$").expect("valid regex");
    static ref SCOPED_NAME: Regex = Regex::new(r"^@[^/]+/[^/]+$").expect("valid regex");
}

/// Package metadata read from a package.json-style descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct PackageMetadata {
    name: String,
    version: String,
    fields: Map<String, Value>,
}

impl PackageMetadata {
    /// Load and check the descriptor at `path`
    ///
    /// # Errors
    ///
    /// - [`PublishError::MetadataNotFound`] if the file does not exist
    /// - [`PublishError::MetadataInvalid`] if it cannot be read or is not a JSON object
    /// - [`PublishError::MissingMetadata`], [`PublishError::InvalidVersion`] or
    ///   [`PublishError::InvalidPackageName`] if `name`/`version` are unusable
    pub async fn load(path: &Path) -> Result<Self, PublishError> {
        let content = fs::read_to_string(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => PublishError::MetadataNotFound {
                path: path.to_path_buf(),
            },
            _ => PublishError::MetadataInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        let value: Value =
            serde_json::from_str(&content).map_err(|e| PublishError::MetadataInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let metadata = match value {
            Value::Object(fields) => Self::from_fields(fields)?,
            _ => {
                return Err(PublishError::MetadataInvalid {
                    path: path.to_path_buf(),
                    message: "top-level value must be an object".to_string(),
                });
            }
        };

        debug!(
            "loaded metadata {}@{} from {}",
            metadata.name,
            metadata.version,
            path.display()
        );
        Ok(metadata)
    }

    /// Build metadata from an already parsed descriptor object
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, PublishError> {
        let name = Self::required_string(&fields, "name")?;
        let version = Self::required_string(&fields, "version")?;

        if semver::Version::parse(&version).is_err() {
            return Err(PublishError::InvalidVersion { version });
        }

        let reasons = validate_package_name(&name);
        if !reasons.is_empty() {
            return Err(PublishError::InvalidPackageName { name, reasons });
        }

        Ok(Self {
            name,
            version,
            fields,
        })
    }

    fn required_string(fields: &Map<String, Value>, field: &str) -> Result<String, PublishError> {
        match fields.get(field) {
            Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
            _ => Err(PublishError::MissingMetadata {
                field: field.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `description`, when present as a string
    pub fn description(&self) -> Option<&str> {
        self.fields.get("description").and_then(Value::as_str)
    }

    /// Look up any descriptor field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The full descriptor, in file order
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// `@scope` for scoped packages
    pub fn scope(&self) -> Option<&str> {
        if self.name.starts_with('@') {
            self.name.split('/').next()
        } else {
            None
        }
    }

    /// Name without the scope prefix
    pub fn unscoped_name(&self) -> &str {
        match self.name.split_once('/') {
            Some((scope, rest)) if scope.starts_with('@') => rest,
            _ => &self.name,
        }
    }

    /// File name `npm pack` would use: `@scope/pkg` → `scope-pkg-1.0.0.tgz`
    pub fn pack_file_name(&self) -> String {
        let flat = self.name.trim_start_matches('@').replace('/', "-");
        format!("{}-{}.tgz", flat, self.version)
    }
}

/// Check a package name against npm naming rules
///
/// Returns one message per violated rule; empty means valid.
pub fn validate_package_name(name: &str) -> Vec<String> {
    let mut reasons = Vec::new();

    if name.len() > MAX_NAME_LENGTH {
        reasons.push(format!(
            "パッケージ名は{}文字以内である必要があります",
            MAX_NAME_LENGTH
        ));
    }

    if name.trim() != name {
        reasons.push("パッケージ名の前後に空白を含めることはできません".to_string());
    }

    if name.starts_with('@') && !SCOPED_NAME.is_match(name) {
        reasons.push("スコープ付きパッケージ名は @scope/name の形式である必要があります".to_string());
        return reasons;
    }

    if name.chars().any(|c| c.is_uppercase()) {
        reasons.push("パッケージ名に大文字を含めることはできません".to_string());
    }

    let (scope, bare) = match name.split_once('/') {
        Some((scope, rest)) if scope.starts_with('@') => (Some(&scope[1..]), rest),
        _ => (None, name),
    };

    if let Some(scope) = scope
        && !NAME_CHARS.is_match(&scope.to_lowercase())
    {
        reasons.push("スコープ名はURL安全な文字のみ使用可能です".to_string());
    }

    if bare.starts_with('.') || bare.starts_with('_') {
        reasons.push("パッケージ名はドットまたはアンダースコアで始めることはできません".to_string());
    }

    if !NAME_CHARS.is_match(&bare.to_lowercase()) {
        reasons.push("パッケージ名はURL安全な文字のみ使用可能です".to_string());
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_load_preserves_all_fields_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("package.json");
        tokio::fs::write(
            &path,
            r#"{"name":"pkg","version":"1.0.0","main":"index.js","description":"demo","keywords":["a"]}"#,
        )
        .await
        .unwrap();

        let metadata = PackageMetadata::load(&path).await.unwrap();
        assert_eq!(metadata.name(), "pkg");
        assert_eq!(metadata.version(), "1.0.0");
        assert_eq!(metadata.description(), Some("demo"));
        assert_eq!(metadata.get("main"), Some(&json!("index.js")));

        let keys: Vec<&str> = metadata.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "version", "main", "description", "keywords"]);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("package.json");

        let result = PackageMetadata::load(&path).await;
        assert!(matches!(result, Err(PublishError::MetadataNotFound { .. })));
    }

    #[tokio::test]
    async fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("package.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let result = PackageMetadata::load(&path).await;
        assert!(matches!(result, Err(PublishError::MetadataInvalid { .. })));
    }

    #[tokio::test]
    async fn test_load_non_object() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("package.json");
        tokio::fs::write(&path, "[1, 2]").await.unwrap();

        let result = PackageMetadata::load(&path).await;
        assert!(matches!(result, Err(PublishError::MetadataInvalid { .. })));
    }

    #[test]
    fn test_missing_name_and_version() {
        let result = PackageMetadata::from_fields(fields(json!({"version": "1.0.0"})));
        assert!(matches!(
            result,
            Err(PublishError::MissingMetadata { ref field }) if field == "name"
        ));

        let result = PackageMetadata::from_fields(fields(json!({"name": "pkg", "version": 1})));
        assert!(matches!(
            result,
            Err(PublishError::MissingMetadata { ref field }) if field == "version"
        ));
    }

    #[test]
    fn test_invalid_version() {
        let result = PackageMetadata::from_fields(fields(json!({"name": "pkg", "version": "1.0"})));
        assert!(matches!(result, Err(PublishError::InvalidVersion { .. })));
    }

    #[test]
    fn test_prerelease_version_is_accepted() {
        let metadata =
            PackageMetadata::from_fields(fields(json!({"name": "pkg", "version": "2.0.0-rc.1"})))
                .unwrap();
        assert_eq!(metadata.version(), "2.0.0-rc.1");
    }

    #[test]
    fn test_scoped_names() {
        let metadata = PackageMetadata::from_fields(fields(
            json!({"name": "@couchmate/server", "version": "1.2.3"}),
        ))
        .unwrap();

        assert_eq!(metadata.scope(), Some("@couchmate"));
        assert_eq!(metadata.unscoped_name(), "server");
        assert_eq!(metadata.pack_file_name(), "couchmate-server-1.2.3.tgz");
    }

    #[test]
    fn test_unscoped_names() {
        let metadata =
            PackageMetadata::from_fields(fields(json!({"name": "pkg", "version": "1.0.0"})))
                .unwrap();

        assert_eq!(metadata.scope(), None);
        assert_eq!(metadata.unscoped_name(), "pkg");
        assert_eq!(metadata.pack_file_name(), "pkg-1.0.0.tgz");
    }

    #[test]
    fn test_validate_package_name_rules() {
        assert!(validate_package_name("my-package").is_empty());
        assert!(validate_package_name("@scope/my.package_2").is_empty());

        assert!(!validate_package_name("MyPackage").is_empty());
        assert!(!validate_package_name(".hidden").is_empty());
        assert!(!validate_package_name("_private").is_empty());
        assert!(!validate_package_name("has space").is_empty());
        assert!(!validate_package_name("@scope").is_empty());
        assert!(!validate_package_name(&"a".repeat(215)).is_empty());
    }

    #[test]
    fn test_validate_package_name_special_characters() {
        for name in ["pkg~1", "it's", "wow!", "fn(x)", "glob*"] {
            assert!(
                !validate_package_name(name).is_empty(),
                "{} should be rejected",
                name
            );
        }
        assert!(!validate_package_name("@scope/pkg~1").is_empty());
    }

    #[test]
    fn test_validate_scope_characters() {
        assert!(!validate_package_name("@sc ope/x").is_empty());
        assert!(!validate_package_name("@sc~ope/x").is_empty());
        assert!(validate_package_name("@my-org.io/x").is_empty());
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let result =
            PackageMetadata::from_fields(fields(json!({"name": "Bad Name", "version": "1.0.0"})));
        assert!(matches!(result, Err(PublishError::InvalidPackageName { .. })));
    }
}
