//! CLI argument definitions for unitdefs-reshaper

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "unitdefs-reshaper")]
#[command(version, about = "Reshape Beyond All Reason unitdef exports into a single normalized JSON document", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Location of JSON exported unitdefs (usually "json_export/")
    #[arg(long, env = "UNITDEFS_DIR")]
    pub unitdefs_dir: PathBuf,

    /// Output file for the reshaped document
    #[arg(long, env = "UNITDEFS_OUTPUT", default_value = unitdefs::DEFAULT_OUTPUT)]
    pub output_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["unitdefs-reshaper", "--unitdefs-dir", "json_export"]).unwrap();
        assert_eq!(cli.unitdefs_dir, PathBuf::from("json_export"));
        assert_eq!(cli.output_file, PathBuf::from("unitdefs.json"));
        assert!(!cli.debug);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "unitdefs-reshaper",
            "-d",
            "--unitdefs-dir",
            "in",
            "--output-file",
            "out/units.json",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.output_file, PathBuf::from("out/units.json"));
    }
}
