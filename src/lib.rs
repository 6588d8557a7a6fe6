pub mod checksum;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod policy;
pub mod scanner;

pub use config::{ReadFailurePolicy, ScanConfig};
pub use error::{ManifestError, Result};
pub use manifest::{FileRecord, Manifest, ManifestWriter};
pub use scanner::ManifestBuilder;
