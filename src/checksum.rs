use md5::{Digest, Md5};
use std::fs::File;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub length: u64,
    /// Upper-case hex MD5.
    pub hash: String,
}

/// Streams the file through MD5 once, so `length` and `hash` always describe
/// the same bytes.
pub fn digest_file(path: &Path) -> io::Result<FileDigest> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let length = io::copy(&mut file, &mut hasher)?;

    Ok(FileDigest {
        length,
        hash: hex::encode_upper(hasher.finalize()),
    })
}

pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode_upper(hasher.finalize())
}
