//! Run settings for a conversion, read from a TOML file and overridden from the
//! command line.

use crate::regenie::TableFormat;
use crate::regenie::convert::default_chromosomes;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Missing required setting '{0}': give it in the configuration file or on the command line.")]
    MissingSetting(&'static str),
}

/// A table on disk together with the format it is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationSource {
    pub path: PathBuf,
    #[serde(default)]
    pub format: TableFormat,
}

/// One partial set of settings. Every field is optional so that a file and the
/// command line can each supply part of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub transcript_map: Option<PathBuf>,
    pub gene_sets: Option<RelationSource>,
    pub chromosomes: Option<Vec<String>>,
    pub parallel: Option<bool>,
}

impl ConfigLayer {
    /// Loads a layer from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let layer = toml::from_str(&toml_string)?;
        Ok(layer)
    }

    /// Fields set in `overrides` replace those of `self`.
    pub fn merge(self, overrides: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            input_dir: overrides.input_dir.or(self.input_dir),
            output_dir: overrides.output_dir.or(self.output_dir),
            prefix: overrides.prefix.or(self.prefix),
            transcript_map: overrides.transcript_map.or(self.transcript_map),
            gene_sets: overrides.gene_sets.or(self.gene_sets),
            chromosomes: overrides.chromosomes.or(self.chromosomes),
            parallel: overrides.parallel.or(self.parallel),
        }
    }

    /// Fills defaults and checks that every required setting is present.
    pub fn finish(self) -> Result<ConversionConfig, ConfigError> {
        Ok(ConversionConfig {
            input_dir: self.input_dir.ok_or(ConfigError::MissingSetting("input_dir"))?,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingSetting("output_dir"))?,
            prefix: self.prefix.ok_or(ConfigError::MissingSetting("prefix"))?,
            transcript_map: self
                .transcript_map
                .ok_or(ConfigError::MissingSetting("transcript_map"))?,
            gene_sets: self.gene_sets.ok_or(ConfigError::MissingSetting("gene_sets"))?,
            chromosomes: self.chromosomes.unwrap_or_else(default_chromosomes),
            parallel: self.parallel.unwrap_or(true),
        })
    }
}

/// A complete conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub transcript_map: PathBuf,
    pub gene_sets: RelationSource,
    pub chromosomes: Vec<String>,
    pub parallel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN_FILE: &str = r#"
input_dir = "data/PTV_test"
output_dir = "data/PTV_genesets"
prefix = "PTV_test"
transcript_map = "data/transcript_gene_map.csv"
chromosomes = ["chr1", "chr2"]

[gene_sets]
path = "data/burden_test_modules.json"
format = "json"
"#;

    #[test]
    fn run_file_fills_a_complete_config() {
        let layer: ConfigLayer = toml::from_str(RUN_FILE).unwrap();
        let config = layer.finish().unwrap();
        assert_eq!(config.prefix, "PTV_test");
        assert_eq!(config.gene_sets.format, TableFormat::Json);
        assert_eq!(config.chromosomes, vec!["chr1", "chr2"]);
        assert!(config.parallel);
    }

    #[test]
    fn command_line_values_win() {
        let file: ConfigLayer = toml::from_str(RUN_FILE).unwrap();
        let cli = ConfigLayer {
            prefix: Some("LoF".to_string()),
            parallel: Some(false),
            ..ConfigLayer::default()
        };
        let config = file.merge(cli).finish().unwrap();
        assert_eq!(config.prefix, "LoF");
        assert!(!config.parallel);
        assert_eq!(config.input_dir, PathBuf::from("data/PTV_test"));
    }

    #[test]
    fn missing_settings_are_named() {
        let layer = ConfigLayer {
            input_dir: Some(PathBuf::from("in")),
            ..ConfigLayer::default()
        };
        assert!(matches!(
            layer.finish(),
            Err(ConfigError::MissingSetting("output_dir"))
        ));
    }

    #[test]
    fn defaults_cover_all_autosomes_and_csv_gene_sets() {
        let layer: ConfigLayer = toml::from_str(
            r#"
input_dir = "in"
output_dir = "out"
prefix = "PTV"
transcript_map = "map.csv"
gene_sets = { path = "sets.csv" }
"#,
        )
        .unwrap();
        let config = layer.finish().unwrap();
        assert_eq!(config.chromosomes.len(), 22);
        assert_eq!(config.gene_sets.format, TableFormat::Csv);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ConfigLayer>("inputdir = \"x\"").is_err());
    }
}
