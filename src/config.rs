use std::path::{Path, PathBuf};

use crate::error::{ManifestError, Result};

pub const DEFAULT_OUTPUT_NAME: &str = "patchinfo.txt";
pub const DEFAULT_VERSION: u32 = 3;

/// What to do when a listed entry cannot be stat'ed or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFailurePolicy {
    /// Fail the whole build; nothing is written.
    #[default]
    Abort,
    /// Log the failure and leave the entry out of the manifest.
    Skip,
}

/// Everything a manifest run needs. Nothing in the builder looks at the
/// process environment; callers fill this in.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub output_name: String,
    pub version: u32,
    pub read_failures: ReadFailurePolicy,
    pub include_hidden: bool,
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            version: DEFAULT_VERSION,
            read_failures: ReadFailurePolicy::Abort,
            include_hidden: false,
            follow_links: true,
        }
    }
}

impl ScanConfig {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// The manifest is always written at the scan root.
    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.output_name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.version == 0 {
            return Err(ManifestError::Config(
                "version must be a positive integer".to_string(),
            ));
        }

        if self.output_name.is_empty() {
            return Err(ManifestError::Config("output name is empty".to_string()));
        }

        if self.output_name.contains(['/', '\\']) {
            return Err(ManifestError::Config(format!(
                "output name '{}' must be a bare file name",
                self.output_name
            )));
        }

        Ok(())
    }
}
