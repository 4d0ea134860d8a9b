//! Error handling for npm publishing
//!
//! This module provides the error type returned by every library operation,
//! with stable error codes and recovery guidance, using the thiserror crate.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Metadata errors
    #[error("メタデータファイルが見つかりません: {}", path.display())]
    MetadataNotFound { path: PathBuf },

    #[error("メタデータファイルを読み込めません ({}): {message}", path.display())]
    MetadataInvalid { path: PathBuf, message: String },

    #[error("必須のメタデータが不足しています: {field}")]
    MissingMetadata { field: String },

    #[error("無効なバージョン番号です: {version}")]
    InvalidVersion { version: String },

    #[error("無効なパッケージ名です ({name}): {}", reasons.join(", "))]
    InvalidPackageName { name: String, reasons: Vec<String> },

    // Archive errors
    #[error("ソースディレクトリが見つかりません: {}", path.display())]
    SourceDirNotFound { path: PathBuf },

    #[error("アーカイブの作成に失敗しました: {message}")]
    ArchiveFailed { message: String },

    // Configuration errors
    #[error("設定エラー: {0}")]
    ConfigError(String),

    #[error("無効なレジストリURLです ({url}): {message}")]
    InvalidRegistryUrl { url: String, message: String },

    // Registry errors
    #[error("[{registry}] 認証に失敗しました (HTTP {status})")]
    AuthenticationFailed { registry: String, status: u16 },

    #[error("[{registry}] 同じバージョンが既に公開されています")]
    VersionConflict { registry: String },

    #[error("[{registry}] 公開処理に失敗しました (HTTP {status}): {message}")]
    PublishFailed {
        registry: String,
        status: u16,
        message: String,
    },

    #[error("[{registry}] ネットワークエラーが発生しました: {message}")]
    NetworkError { registry: String, message: String },

    #[error("[{registry}] タイムアウトしました")]
    TimeoutError { registry: String },

    // State errors
    #[error("不正な状態遷移です: {from} → {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl PublishError {
    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::MetadataNotFound { .. } => "METADATA_NOT_FOUND",
            Self::MetadataInvalid { .. } => "METADATA_INVALID",
            Self::MissingMetadata { .. } => "MISSING_METADATA",
            Self::InvalidVersion { .. } => "INVALID_VERSION",
            Self::InvalidPackageName { .. } => "INVALID_PACKAGE_NAME",
            Self::SourceDirNotFound { .. } => "SOURCE_DIR_NOT_FOUND",
            Self::ArchiveFailed { .. } => "ARCHIVE_FAILED",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidRegistryUrl { .. } => "INVALID_REGISTRY_URL",
            Self::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            Self::VersionConflict { .. } => "VERSION_CONFLICT",
            Self::PublishFailed { .. } => "PUBLISH_FAILED",
            Self::NetworkError { .. } => "NETWORK_ERROR",
            Self::TimeoutError { .. } => "TIMEOUT_ERROR",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
        }
    }

    /// Whether the failure happened before anything was sent to the registry
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed { .. }
                | Self::VersionConflict { .. }
                | Self::PublishFailed { .. }
                | Self::NetworkError { .. }
                | Self::TimeoutError { .. }
        )
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::MetadataNotFound { .. } => vec![
                "package.jsonのパスを確認してください",
                "--metadataオプションでパスを指定できます",
            ],
            Self::MetadataInvalid { .. } => vec!["package.jsonが有効なJSONか確認してください"],
            Self::MissingMetadata { .. } => {
                vec!["package.jsonにnameとversionを指定してください"]
            }
            Self::InvalidVersion { .. } => {
                vec!["SemVer形式（例: 1.0.0）で指定してください"]
            }
            Self::InvalidPackageName { .. } => vec![
                "小文字英数字とハイフン、アンダースコア、ドットのみ使用してください",
                "スコープ付きの場合は @scope/name の形式で指定してください",
            ],
            Self::SourceDirNotFound { .. } => vec![
                "ビルド出力ディレクトリが存在するか確認してください",
                "ビルドを先に実行してください",
            ],
            Self::ArchiveFailed { .. } => vec!["ファイルの読み取り権限を確認してください"],
            Self::ConfigError(_) => vec![".npm-publish.yamlの内容を確認してください"],
            Self::InvalidRegistryUrl { .. } => vec![
                "http:// または https:// で始まるURLを指定してください",
                "例: https://gitlab.com/api/v4/projects/<id>/packages/npm/",
            ],
            Self::AuthenticationFailed { .. } => vec![
                "認証トークンを確認してください",
                "NPM_TOKEN環境変数が正しく設定されているか確認してください",
                "トークンの有効期限と権限を確認してください",
            ],
            Self::VersionConflict { .. } => vec![
                "バージョン番号を更新してください",
                "npm version patch/minor/majorを実行してください",
            ],
            Self::PublishFailed { .. } => vec![
                "レジストリからのエラーメッセージを確認してください",
                "レジストリのステータスを確認してください",
            ],
            Self::NetworkError { .. } => vec![
                "インターネット接続を確認してください",
                "レジストリURLを確認してください",
            ],
            Self::TimeoutError { .. } => vec![
                "ネットワーク環境を確認してください",
                "--timeoutオプションで時間を延長できます",
            ],
            Self::InvalidStateTransition { .. } => vec!["不具合として報告してください"],
        }
    }
}
