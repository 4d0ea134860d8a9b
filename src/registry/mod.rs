pub mod document;
pub mod npm_client;

pub use document::{Attachment, PublishDocument, escape_package_name, package_url, tarball_url};
pub use npm_client::HttpRegistryClient;
