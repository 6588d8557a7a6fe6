use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::checksum;
use crate::config::ScanConfig;
use crate::error::{ManifestError, Result};
use crate::policy::SEPARATOR;

/// One file as the patch client sees it. Field order and key names are part
/// of the client's format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "Basepath")]
    pub base_path: String,
    #[serde(rename = "Download", with = "download_flag")]
    pub download: bool,
    #[serde(rename = "Filename")]
    pub file_name: String,
    #[serde(rename = "Version")]
    pub version: u32,
    #[serde(rename = "Length")]
    pub length: u64,
    #[serde(rename = "MyHash")]
    pub hash: String,
}

impl FileRecord {
    /// Location relative to the scan root, using host separators.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self
            .base_path
            .split(SEPARATOR)
            .filter(|part| !part.is_empty())
            .collect();
        path.push(&self.file_name);
        path
    }
}

/// The client reads `Download` as the strings "true"/"false".
mod download_flag {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "true" } else { "false" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(D::Error::custom(format!(
                "expected \"true\" or \"false\", found \"{other}\""
            ))),
        }
    }
}

/// Mode for a freshly created manifest, before the umask. Web servers
/// serving the manifest usually run as another user.
#[cfg(unix)]
const DEFAULT_MANIFEST_MODE: u32 = 0o644;

/// Ordered list of records. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    records: Vec<FileRecord>,
}

impl Manifest {
    pub fn new(records: Vec<FileRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.length).sum()
    }

    /// Pretty JSON with four-space indentation, the layout existing
    /// patchinfo.txt files use.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .map_err(ManifestError::Serialize)?;

        // serde_json only emits valid UTF-8
        let json = String::from_utf8(buffer).map_err(|e| {
            ManifestError::Serialize(serde::ser::Error::custom(e.to_string()))
        })?;

        Ok(escape_for_client(&json))
    }
}

/// Existing manifests are pure ASCII: non-ASCII characters are written as
/// `\uXXXX` (surrogate pairs above the BMP) and `/` as `\/`. Both only occur
/// inside JSON strings, so the output stays valid JSON.
fn escape_for_client(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    let mut units = [0u16; 2];

    for c in json.chars() {
        match c {
            '/' => escaped.push_str("\\/"),
            c if c.is_ascii() => escaped.push(c),
            c => {
                for unit in c.encode_utf16(&mut units) {
                    escaped.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }

    escaped
}

/// Outcome of checking a manifest against the tree it describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub checked: usize,
    pub missing: Vec<PathBuf>,
    pub changed: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.changed.is_empty()
    }
}

pub struct ManifestWriter {
    root: PathBuf,
    output_name: String,
}

impl ManifestWriter {
    pub fn new(root: impl AsRef<Path>, output_name: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            output_name: output_name.into(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(&config.root, config.output_name.clone())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.output_name)
    }

    /// Writes the manifest through a temporary file in the same directory and
    /// renames it into place. A failed write leaves any previous manifest
    /// untouched.
    pub fn write_manifest(&self, manifest: &Manifest) -> Result<PathBuf> {
        let manifest_path = self.manifest_path();
        let manifest_json = manifest.to_json_pretty()?;

        let write_err = |source| ManifestError::Write {
            path: manifest_path.clone(),
            source,
        };

        let mut builder = tempfile::Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(DEFAULT_MANIFEST_MODE));
        }

        let mut temp = builder.tempfile_in(&self.root).map_err(write_err)?;

        // A regenerated manifest keeps whatever mode it was given.
        #[cfg(unix)]
        if let Ok(existing) = fs::metadata(&manifest_path) {
            temp.as_file()
                .set_permissions(existing.permissions())
                .map_err(write_err)?;
        }

        temp.write_all(manifest_json.as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(&manifest_path)
            .map_err(|e| write_err(e.error))?;

        info!(
            path = %manifest_path.display(),
            entries = manifest.len(),
            "wrote manifest"
        );

        Ok(manifest_path)
    }

    pub fn read_manifest(&self) -> Result<Manifest> {
        let manifest_path = self.manifest_path();

        let manifest_content = fs::read_to_string(&manifest_path).map_err(|source| {
            ManifestError::Read {
                path: manifest_path.clone(),
                source,
            }
        })?;

        serde_json::from_str(&manifest_content).map_err(|source| ManifestError::Parse {
            path: manifest_path,
            source,
        })
    }

    /// Re-hashes every listed file. Entries pointing outside the root are
    /// reported as missing rather than followed.
    pub fn verify_manifest(&self, manifest: &Manifest) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();

        for record in manifest.records() {
            report.checked += 1;
            let relative = record.relative_path();

            let escapes_root = relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            let file_path = self.root.join(&relative);

            if escapes_root || !file_path.is_file() {
                debug!(path = %relative.display(), "missing");
                report.missing.push(relative);
                continue;
            }

            let digest = checksum::digest_file(&file_path).map_err(|source| {
                ManifestError::Read {
                    path: file_path.clone(),
                    source,
                }
            })?;

            if digest.length != record.length || digest.hash != record.hash {
                debug!(path = %relative.display(), "changed");
                report.changed.push(relative);
            }
        }

        Ok(report)
    }
}
