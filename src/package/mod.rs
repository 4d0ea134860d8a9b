pub mod metadata;
pub mod tarball;

pub use metadata::{PackageMetadata, validate_package_name};
pub use tarball::{PACKAGE_PREFIX, Tarball, TarballSummary, pack_directory};
