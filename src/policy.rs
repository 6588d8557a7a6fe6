//! Inclusion rules and path formatting for manifest entries.
//!
//! Every check here is a plain function so the rules can be exercised
//! without touching the filesystem.

use std::path::{Component, Path};

/// Separator the patch client expects in `Basepath`, independent of the host.
pub const SEPARATOR: char = '\\';

/// Names containing any of these are never listed. The manifest itself and
/// the client's own configuration must not be downloaded over themselves.
pub const EXCLUDED_NAME_FRAGMENTS: &[&str] = &["configuration.xml", "patchinfo.txt", "metagen"];

/// Server-side sources and logs are never shipped.
pub const EXCLUDED_EXTENSIONS: &[&str] = &[".php", ".log"];

/// Archives are listed but not fetched automatically.
pub const NO_DOWNLOAD_EXTENSION: &str = ".zip";

/// Last four characters of `path`, lowercased. This is the whole extension
/// check: `.php`, `.log` and `.zip` are all exactly four characters long.
pub fn extension_suffix(path: &str) -> String {
    let chars: Vec<char> = path.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect::<String>().to_lowercase()
}

pub fn is_excluded_name(file_name: &str) -> bool {
    let lowered = file_name.to_lowercase();
    EXCLUDED_NAME_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

pub fn is_excluded_extension(path: &str) -> bool {
    let suffix = extension_suffix(path);
    EXCLUDED_EXTENSIONS.iter().any(|ext| suffix == *ext)
}

pub fn is_zip_extension(path: &str) -> bool {
    extension_suffix(path) == NO_DOWNLOAD_EXTENSION
}

/// Shell-style listings never return dot-prefixed names.
pub fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with('.')
}

/// Full inclusion decision for one file. `output_name` is the manifest being
/// generated, which may differ from the default `patchinfo.txt`.
pub fn should_include(path: &str, file_name: &str, output_name: &str) -> bool {
    if is_excluded_name(file_name) {
        return false;
    }

    if file_name.eq_ignore_ascii_case(output_name) {
        return false;
    }

    !is_excluded_extension(path)
}

/// Formats the directory part of a root-relative path for the patch client:
/// `\` for the root itself, otherwise `\dir\sub\`.
pub fn base_path(relative_dir: &Path) -> String {
    let mut base = String::from(SEPARATOR);

    for component in relative_dir.components() {
        if let Component::Normal(part) = component {
            base.push_str(&part.to_string_lossy());
            base.push(SEPARATOR);
        }
    }

    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_excluded_names() {
        assert!(is_excluded_name("configuration.xml"));
        assert!(is_excluded_name("Configuration.XML"));
        assert!(is_excluded_name("old-configuration.xml.bak"));
        assert!(is_excluded_name("patchinfo.txt"));
        assert!(is_excluded_name("PATCHINFO.TXT"));
        assert!(is_excluded_name("metagen.exe"));
        assert!(is_excluded_name("tools_MetaGen_v2"));

        assert!(!is_excluded_name("config.xml"));
        assert!(!is_excluded_name("readme.txt"));
    }

    #[test]
    fn test_excluded_extensions() {
        assert!(is_excluded_extension("./index.php"));
        assert!(is_excluded_extension("./sub/deep/error.LOG"));
        assert!(is_excluded_extension("x.Php"));

        assert!(!is_excluded_extension("./index.php5"));
        assert!(!is_excluded_extension("./logs/readme.txt"));
        assert!(!is_excluded_extension("./catalog"));
        assert!(!is_excluded_extension("log"));
    }

    #[test]
    fn test_zip_extension() {
        assert!(is_zip_extension("archive.ZIP"));
        assert!(is_zip_extension("./data/pack.zip"));
        assert!(!is_zip_extension("readme.txt"));
        assert!(!is_zip_extension("pack.zipx"));
        assert!(!is_zip_extension("zip"));
    }

    #[test]
    fn test_extension_suffix_handles_short_and_multibyte() {
        assert_eq!(extension_suffix(""), "");
        assert_eq!(extension_suffix("ab"), "ab");
        assert_eq!(extension_suffix("Ärger.LOG"), ".log");
        assert_eq!(extension_suffix("über"), "über");
    }

    #[test]
    fn test_should_include() {
        assert!(should_include("./a.txt", "a.txt", "patchinfo.txt"));
        assert!(!should_include("./configuration.xml", "configuration.xml", "patchinfo.txt"));
        assert!(!should_include("./sub/x.log", "x.log", "patchinfo.txt"));
        assert!(!should_include("./manifest.json", "manifest.json", "manifest.json"));
        assert!(should_include("./manifest.json", "manifest.json", "patchinfo.txt"));
    }

    #[test]
    fn test_hidden() {
        assert!(is_hidden(".git"));
        assert!(is_hidden(".htaccess"));
        assert!(!is_hidden("game.exe"));
    }

    #[test]
    fn test_base_path() {
        assert_eq!(base_path(Path::new("")), "\\");
        assert_eq!(base_path(Path::new("sub")), "\\sub\\");
        assert_eq!(
            base_path(Path::new("assets/textures")),
            "\\assets\\textures\\"
        );

        let mut nested = PathBuf::from("a");
        nested.push("b");
        nested.push("c");
        assert_eq!(base_path(&nested), "\\a\\b\\c\\");
    }

    #[test]
    fn test_base_path_never_uses_forward_slash() {
        let formatted = base_path(Path::new("maps/city/night"));
        assert!(!formatted.contains('/'));
        assert!(formatted.starts_with(SEPARATOR));
        assert!(formatted.ends_with(SEPARATOR));
    }
}
