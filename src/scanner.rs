//! Directory walk that turns a tree into manifest records.
//!
//! Entries are visited depth-first, sorted by name within each directory, so
//! the same tree always yields the same manifest.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::checksum;
use crate::config::{ReadFailurePolicy, ScanConfig};
use crate::error::{ManifestError, Result};
use crate::manifest::{FileRecord, Manifest};
use crate::policy;

pub struct ManifestBuilder {
    root: PathBuf,
    version: u32,
    output_name: String,
    read_failures: ReadFailurePolicy,
    include_hidden: bool,
    follow_links: bool,
}

impl ManifestBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::from_config(&ScanConfig::new(root))
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            root: config.root.clone(),
            version: config.version,
            output_name: config.output_name.clone(),
            read_failures: config.read_failures,
            include_hidden: config.include_hidden,
            follow_links: config.follow_links,
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }

    pub fn read_failures(mut self, policy: ReadFailurePolicy) -> Self {
        self.read_failures = policy;
        self
    }

    pub fn include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn build(&self) -> Result<Manifest> {
        if self.version == 0 {
            return Err(ManifestError::Config(
                "version must be a positive integer".to_string(),
            ));
        }

        let include_hidden = self.include_hidden;
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                entry.depth() == 0 || include_hidden || !is_hidden_entry(entry)
            });

        let mut records = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    self.handle_failure(ManifestError::Walk { path, source })?;
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            if !entry.file_type().is_file() {
                debug!(path = %entry.path().display(), "skipping non-regular file");
                continue;
            }

            match self.record_for(&entry) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => self.handle_failure(e)?,
            }
        }

        let manifest = Manifest::new(records);
        info!(
            root = %self.root.display(),
            files = manifest.len(),
            bytes = manifest.total_bytes(),
            "built manifest"
        );

        Ok(manifest)
    }

    /// `None` when the inclusion policy rejects the file.
    fn record_for(&self, entry: &DirEntry) -> Result<Option<FileRecord>> {
        let path = entry.path();
        let relative = path.strip_prefix(&self.root).unwrap_or(path);

        // Exclusion only looks at ASCII fragments, which survive a lossy
        // conversion, so excluded files never need valid names.
        if !policy::should_include(
            &relative.to_string_lossy(),
            &entry.file_name().to_string_lossy(),
            &self.output_name,
        ) {
            debug!(path = %path.display(), "excluded");
            return Ok(None);
        }

        // The client requests files by these exact names; a lossy name would
        // list a file that does not exist.
        let (Some(relative_str), Some(file_name)) = (relative.to_str(), entry.file_name().to_str())
        else {
            return Err(ManifestError::InvalidName {
                path: path.to_path_buf(),
            });
        };

        let digest = checksum::digest_file(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let relative_dir = relative.parent().unwrap_or_else(|| Path::new(""));

        let record = FileRecord {
            base_path: policy::base_path(relative_dir),
            download: !policy::is_zip_extension(relative_str),
            file_name: file_name.to_string(),
            version: self.version,
            length: digest.length,
            hash: digest.hash,
        };

        debug!(
            base_path = %record.base_path,
            file_name = %record.file_name,
            length = record.length,
            "included"
        );

        Ok(Some(record))
    }

    fn handle_failure(&self, error: ManifestError) -> Result<()> {
        match self.read_failures {
            ReadFailurePolicy::Skip if error.is_read_failure() => {
                warn!("skipping unreadable entry: {}", error);
                Ok(())
            }
            _ => Err(error),
        }
    }
}

fn is_hidden_entry(entry: &DirEntry) -> bool {
    policy::is_hidden(&entry.file_name().to_string_lossy())
}
