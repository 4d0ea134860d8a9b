//! npm publish document
//!
//! The body of `PUT <registry>/<name>`: a packument holding the single version
//! being published, its dist-tag, and the tarball as a base64 attachment.

use crate::core::config::NpmAccess;
use crate::core::error::PublishError;
use crate::package::{PackageMetadata, Tarball};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Tarball attachment inside the publish document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub content_type: String,
    pub data: String,
    pub length: usize,
}

/// Publish request body
#[derive(Debug, Clone, Serialize)]
pub struct PublishDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
    pub versions: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<NpmAccess>,
    #[serde(rename = "_attachments")]
    pub attachments: BTreeMap<String, Attachment>,
}

impl PublishDocument {
    /// Build the document for `metadata`, consuming `tarball`
    ///
    /// The version manifest is the metadata object with `_id` and `dist`
    /// added; every other field is passed through untouched.
    pub fn build(
        metadata: &PackageMetadata,
        tarball: Tarball,
        registry_url: &Url,
        tag: &str,
        access: Option<NpmAccess>,
    ) -> Result<Self, PublishError> {
        let name = metadata.name().to_string();
        let version = metadata.version().to_string();
        let tarball_url = tarball_url(registry_url, metadata)?;

        let mut dist = match metadata.get("dist") {
            Some(Value::Object(existing)) => existing.clone(),
            _ => Map::new(),
        };
        dist.insert(
            "integrity".to_string(),
            Value::String(tarball.integrity().to_string()),
        );
        dist.insert(
            "shasum".to_string(),
            Value::String(tarball.shasum().to_string()),
        );
        dist.insert("tarball".to_string(), Value::String(tarball_url.to_string()));

        let mut manifest = metadata.fields().clone();
        manifest.insert(
            "_id".to_string(),
            Value::String(format!("{}@{}", name, version)),
        );
        manifest.insert("dist".to_string(), Value::Object(dist));

        let data = tarball.into_bytes();
        let attachment = Attachment {
            content_type: ATTACHMENT_CONTENT_TYPE.to_string(),
            data: BASE64.encode(&data),
            length: data.len(),
        };

        Ok(Self {
            id: name.clone(),
            description: metadata.description().map(str::to_string),
            dist_tags: BTreeMap::from([(tag.to_string(), version.clone())]),
            versions: BTreeMap::from([(version.clone(), Value::Object(manifest))]),
            access,
            attachments: BTreeMap::from([(format!("{}-{}.tgz", name, version), attachment)]),
            name,
        })
    }

    /// Decoded tarball bytes of the (single) attachment
    pub fn tarball_bytes(&self) -> Option<Vec<u8>> {
        self.attachments
            .values()
            .next()
            .and_then(|a| BASE64.decode(&a.data).ok())
    }
}

/// Registry path segment for a package: `@scope/name` → `@scope%2fname`
pub fn escape_package_name(name: &str) -> String {
    name.replace('/', "%2f")
}

/// URL the publish request is sent to
pub fn package_url(registry_url: &Url, name: &str) -> Result<Url, PublishError> {
    registry_url
        .join(&escape_package_name(name))
        .map_err(|e| PublishError::InvalidRegistryUrl {
            url: registry_url.to_string(),
            message: e.to_string(),
        })
}

/// Download URL recorded in `dist.tarball`
pub fn tarball_url(registry_url: &Url, metadata: &PackageMetadata) -> Result<Url, PublishError> {
    let path = format!(
        "{}/-/{}-{}.tgz",
        metadata.name(),
        metadata.unscoped_name(),
        metadata.version()
    );
    registry_url
        .join(&path)
        .map_err(|e| PublishError::InvalidRegistryUrl {
            url: registry_url.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::pack_directory;
    use serde_json::json;
    use tempfile::TempDir;

    const REGISTRY: &str = "https://gitlab.com/api/v4/projects/1/packages/npm/";

    fn metadata(value: Value) -> PackageMetadata {
        match value {
            Value::Object(map) => PackageMetadata::from_fields(map).unwrap(),
            _ => panic!("expected object"),
        }
    }

    async fn tarball_with_index() -> (TempDir, Tarball) {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("index.js"), "x").unwrap();
        let tarball = pack_directory(temp_dir.path()).await.unwrap();
        (temp_dir, tarball)
    }

    #[test]
    fn test_escape_package_name() {
        assert_eq!(escape_package_name("pkg"), "pkg");
        assert_eq!(escape_package_name("@scope/pkg"), "@scope%2fpkg");
    }

    #[test]
    fn test_package_url() {
        let registry = Url::parse(REGISTRY).unwrap();

        let url = package_url(&registry, "@couchmate/server").unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.com/api/v4/projects/1/packages/npm/@couchmate%2fserver"
        );
    }

    #[test]
    fn test_tarball_url_scoped() {
        let registry = Url::parse(REGISTRY).unwrap();
        let meta = metadata(json!({"name": "@couchmate/server", "version": "1.0.0"}));

        let url = tarball_url(&registry, &meta).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.com/api/v4/projects/1/packages/npm/@couchmate/server/-/server-1.0.0.tgz"
        );
    }

    #[tokio::test]
    async fn test_build_document_shape() {
        let registry = Url::parse(REGISTRY).unwrap();
        let meta = metadata(json!({
            "name": "pkg",
            "version": "1.0.0",
            "description": "demo",
            "main": "index.js"
        }));
        let (_dir, tarball) = tarball_with_index().await;
        let shasum = tarball.shasum().to_string();
        let size = tarball.bytes().len();

        let document =
            PublishDocument::build(&meta, tarball, &registry, "latest", Some(NpmAccess::Public))
                .unwrap();
        let json = serde_json::to_value(&document).unwrap();

        assert_eq!(json["_id"], "pkg");
        assert_eq!(json["name"], "pkg");
        assert_eq!(json["description"], "demo");
        assert_eq!(json["dist-tags"]["latest"], "1.0.0");
        assert_eq!(json["access"], "public");

        let version = &json["versions"]["1.0.0"];
        assert_eq!(version["_id"], "pkg@1.0.0");
        assert_eq!(version["main"], "index.js");
        assert_eq!(version["dist"]["shasum"], shasum.as_str());
        assert_eq!(
            version["dist"]["tarball"],
            format!("{}pkg/-/pkg-1.0.0.tgz", REGISTRY)
        );

        let attachment = &json["_attachments"]["pkg-1.0.0.tgz"];
        assert_eq!(attachment["content_type"], "application/octet-stream");
        assert_eq!(attachment["length"], size);
        assert_eq!(document.tarball_bytes().unwrap().len(), size);
    }

    #[tokio::test]
    async fn test_build_document_without_access_omits_key() {
        let registry = Url::parse(REGISTRY).unwrap();
        let meta = metadata(json!({"name": "pkg", "version": "1.0.0"}));
        let (_dir, tarball) = tarball_with_index().await;

        let document = PublishDocument::build(&meta, tarball, &registry, "beta", None).unwrap();
        let json = serde_json::to_value(&document).unwrap();

        assert!(json.get("access").is_none());
        assert!(json.get("description").is_none());
        assert_eq!(json["dist-tags"]["beta"], "1.0.0");
    }

    #[tokio::test]
    async fn test_existing_dist_fields_are_kept() {
        let registry = Url::parse(REGISTRY).unwrap();
        let meta = metadata(json!({
            "name": "pkg",
            "version": "1.0.0",
            "dist": {"fileCount": 1, "shasum": "stale"}
        }));
        let (_dir, tarball) = tarball_with_index().await;
        let shasum = tarball.shasum().to_string();

        let document = PublishDocument::build(&meta, tarball, &registry, "latest", None).unwrap();
        let dist = &document.versions["1.0.0"]["dist"];

        assert_eq!(dist["fileCount"], 1);
        assert_eq!(dist["shasum"], shasum.as_str());
    }
}
