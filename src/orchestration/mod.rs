pub mod packer;
pub mod publisher;

pub use packer::{PackOutput, pack_to_directory};
pub use publisher::{PublishReport, Publisher, SUCCESS_MESSAGE};
