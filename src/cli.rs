use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::config::{DEFAULT_OUTPUT_NAME, DEFAULT_VERSION, ReadFailurePolicy, ScanConfig};
use crate::logging;
use crate::manifest::{Manifest, ManifestWriter};
use crate::scanner::ManifestBuilder;

#[derive(Parser)]
#[command(name = "patchinfo")]
#[command(about = "Generates a patchinfo.txt manifest describing every file in a directory tree")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the tree and write the manifest at its root
    Generate(ScanArgs),

    /// Scan the tree and print the manifest to stdout without writing it
    Dump(ScanArgs),

    /// Check an existing manifest against the files it lists
    Verify {
        /// Directory the manifest describes
        #[arg(long, env = "PATCHINFO_ROOT", default_value = ".")]
        root: PathBuf,

        /// Manifest file name inside the root
        #[arg(long, env = "PATCHINFO_OUTPUT", default_value = DEFAULT_OUTPUT_NAME)]
        output: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(long, env = "PATCHINFO_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Manifest file name, written inside the root
    #[arg(long, env = "PATCHINFO_OUTPUT", default_value = DEFAULT_OUTPUT_NAME)]
    pub output: String,

    /// Version stamped into every record
    #[arg(
        long = "manifest-version",
        env = "PATCHINFO_VERSION",
        default_value_t = DEFAULT_VERSION,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub manifest_version: u32,

    /// Leave unreadable files out instead of failing the run
    #[arg(long)]
    pub skip_unreadable: bool,

    /// Include dot-prefixed files and directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Do not follow symbolic links
    #[arg(long)]
    pub no_follow_links: bool,
}

impl ScanArgs {
    pub fn to_config(&self) -> ScanConfig {
        ScanConfig {
            root: self.root.clone(),
            output_name: self.output.clone(),
            version: self.manifest_version,
            read_failures: if self.skip_unreadable {
                ReadFailurePolicy::Skip
            } else {
                ReadFailurePolicy::Abort
            },
            include_hidden: self.include_hidden,
            follow_links: !self.no_follow_links,
        }
    }
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    logging::init(logging::level_for(cli.verbose, cli.quiet))
        .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Generate(args) => generate_command(&args.to_config()),
        Commands::Dump(args) => dump_command(&args.to_config()),
        Commands::Verify { root, output } => verify_command(root, output),
    }
}

fn build_manifest(config: &ScanConfig) -> Result<Manifest> {
    config.validate().context("Invalid scan configuration")?;

    ManifestBuilder::from_config(config)
        .build()
        .with_context(|| format!("Failed to scan {}", config.root.display()))
}

/// Builds and persists the manifest. Nothing is written unless the whole
/// scan succeeds.
pub fn generate(config: &ScanConfig) -> Result<PathBuf> {
    let manifest = build_manifest(config)?;

    ManifestWriter::from_config(config)
        .write_manifest(&manifest)
        .context("Failed to write manifest")
}

fn generate_command(config: &ScanConfig) -> Result<()> {
    print!("Creating {}...", config.output_name);
    std::io::stdout().flush().ok();

    match generate(config) {
        Ok(_) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("Failed");
            Err(e)
        }
    }
}

fn dump_command(config: &ScanConfig) -> Result<()> {
    let manifest = build_manifest(config)?;
    let json = manifest
        .to_json_pretty()
        .context("Failed to serialize manifest")?;

    println!("{}", json);

    Ok(())
}

fn verify_command(root: PathBuf, output: String) -> Result<()> {
    let writer = ManifestWriter::new(&root, output);

    let manifest = writer.read_manifest().context("Failed to load manifest")?;
    let report = writer
        .verify_manifest(&manifest)
        .context("Failed to verify manifest")?;

    for path in &report.missing {
        println!("missing: {}", path.display());
    }
    for path in &report.changed {
        println!("changed: {}", path.display());
    }

    if !report.is_clean() {
        return Err(anyhow::anyhow!(
            "{} of {} files out of date",
            report.missing.len() + report.changed.len(),
            report.checked
        ));
    }

    println!("All {} files match {}", report.checked, writer.manifest_path().display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["patchinfo", "generate"]).unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };

        let config = args.to_config();
        assert_eq!(config.version, 3);
        assert_eq!(config.output_name, "patchinfo.txt");
        assert_eq!(config.read_failures, ReadFailurePolicy::Abort);
        assert!(config.follow_links);
    }

    #[test]
    fn test_scan_flags() {
        let cli = Cli::try_parse_from([
            "patchinfo",
            "-vv",
            "dump",
            "--root",
            "/srv/game",
            "--manifest-version",
            "5",
            "--skip-unreadable",
            "--include-hidden",
            "--no-follow-links",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let Commands::Dump(args) = cli.command else {
            panic!("expected dump");
        };
        let config = args.to_config();
        assert_eq!(config.root, PathBuf::from("/srv/game"));
        assert_eq!(config.version, 5);
        assert_eq!(config.read_failures, ReadFailurePolicy::Skip);
        assert!(config.include_hidden);
        assert!(!config.follow_links);
    }

    #[test]
    fn test_zero_version_rejected() {
        assert!(Cli::try_parse_from(["patchinfo", "generate", "--manifest-version", "0"]).is_err());
    }

    #[test]
    fn test_generate_writes_manifest() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"hi").unwrap();
        fs::write(temp_dir.path().join("debug.log"), b"noise").unwrap();

        let config = ScanConfig::new(temp_dir.path());
        let path = generate(&config).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"Filename\": \"a.txt\""));
        assert!(written.contains("\"Download\": \"true\""));
        assert!(!written.contains("debug.log"));

        let writer = ManifestWriter::from_config(&config);
        let manifest = writer.read_manifest().unwrap();
        assert_eq!(manifest.len(), 1);
        assert!(writer.verify_manifest(&manifest).unwrap().is_clean());
    }

    #[test]
    fn test_regenerate_does_not_list_previous_manifest() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"hi").unwrap();

        let config = ScanConfig::new(temp_dir.path());
        generate(&config).unwrap();
        generate(&config).unwrap();

        let manifest = ManifestWriter::from_config(&config).read_manifest().unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_scan_writes_nothing() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"hi").unwrap();
        symlink(temp_dir.path().join("missing"), temp_dir.path().join("broken")).unwrap();

        let config = ScanConfig::new(temp_dir.path());
        assert!(generate(&config).is_err());
        assert!(!config.output_path().exists());
    }
}
