pub mod core;
pub mod orchestration;
pub mod package;
pub mod registry;
pub mod security;

pub use crate::core::*;
pub use orchestration::{PackOutput, PublishReport, Publisher, SUCCESS_MESSAGE, pack_to_directory};
pub use package::{PackageMetadata, Tarball, TarballSummary};
pub use registry::{HttpRegistryClient, PublishDocument};
pub use security::SecureTokenManager;
