//! Round and lineup tuning loaded from an optional TOML file.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use pounce_core::DEFAULT_ROUND_SECS;
use pounce_system_roster::Tuning;
use serde::Deserialize;

use crate::CliArgs;

const DEFAULT_SEED: u64 = 0x5eed;
const DEFAULT_FRAME_MS: u64 = 50;
const DEFAULT_CLUMSINESS: f64 = 0.02;

/// Contents of the tuning file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) round_secs: Option<i64>,
    pub(crate) seed: Option<u64>,
    pub(crate) frame_ms: Option<u64>,
    pub(crate) clumsiness: Option<f64>,
    /// Overrides keyed by class tag.
    pub(crate) entities: BTreeMap<String, Tuning>,
}

/// Effective settings after command-line flags override the file.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Settings {
    pub(crate) round_secs: i64,
    pub(crate) seed: u64,
    pub(crate) frame_ms: u64,
    pub(crate) clumsiness: f64,
    pub(crate) realtime: bool,
}

impl FileConfig {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse config toml")?;
        if let Some(round_secs) = config.round_secs {
            if round_secs <= 0 {
                bail!("round_secs must be positive, got {round_secs}");
            }
        }
        if config.frame_ms == Some(0) {
            bail!("frame_ms must be positive");
        }
        if let Some(clumsiness) = config.clumsiness {
            if !clumsiness.is_finite() {
                bail!("clumsiness must be a finite number, got {clumsiness}");
            }
        }
        Ok(config)
    }

    pub(crate) fn merged_with(&self, args: &CliArgs) -> Result<Settings> {
        if let Some(clumsiness) = args.clumsiness {
            if !clumsiness.is_finite() {
                bail!("--clumsiness must be a finite number, got {clumsiness}");
            }
        }
        Ok(Settings {
            round_secs: args
                .round_secs
                .or(self.round_secs)
                .unwrap_or(DEFAULT_ROUND_SECS),
            seed: args.seed.or(self.seed).unwrap_or(DEFAULT_SEED),
            frame_ms: args
                .frame_ms
                .or(self.frame_ms)
                .unwrap_or(DEFAULT_FRAME_MS)
                .max(1),
            clumsiness: args
                .clumsiness
                .or(self.clumsiness)
                .unwrap_or(DEFAULT_CLUMSINESS)
                .clamp(0.0, 1.0),
            realtime: args.realtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_entity_overrides() {
        let config = FileConfig::parse(
            r#"
            round_secs = 30
            seed = 9

            [entities.cat]
            spawn_every_ms = 120

            [entities.dog]
            spawn_mode = "static"
            spawn_probability = 0.5
            "#,
        )
        .expect("valid config");

        assert_eq!(config.round_secs, Some(30));
        assert_eq!(config.entities["cat"].spawn_every_ms, Some(120));
        assert_eq!(config.entities["dog"].spawn_mode.as_deref(), Some("static"));
        assert_eq!(config.entities["dog"].spawn_probability, Some(0.5));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(FileConfig::parse("rounds = 3").is_err());
        assert!(FileConfig::parse("round_secs = 0").is_err());
        assert!(FileConfig::parse("frame_ms = 0").is_err());
        assert!(FileConfig::parse("clumsiness = nan").is_err());
        assert!(FileConfig::parse("clumsiness = inf").is_err());
    }

    #[test]
    fn non_finite_clumsiness_flag_is_an_error() {
        let args = CliArgs::parse_from(["pounce", "--clumsiness", "NaN"]);

        let error = FileConfig::default()
            .merged_with(&args)
            .expect_err("NaN clumsiness");
        assert!(error.to_string().contains("clumsiness"));
    }

    #[test]
    fn round_length_flag_must_be_positive() {
        assert!(CliArgs::try_parse_from(["pounce", "--round-secs", "0"]).is_err());
        assert!(CliArgs::try_parse_from(["pounce", "--round-secs=-5"]).is_err());

        let args = CliArgs::try_parse_from(["pounce", "--round-secs", "20"]).expect("valid");
        assert_eq!(args.round_secs, Some(20));
    }

    #[test]
    fn flags_take_precedence_over_the_file() {
        let config = FileConfig::parse("round_secs = 30\nseed = 9").expect("valid config");
        let args = CliArgs::parse_from(["pounce", "--seed", "4", "--clumsiness", "3"]);

        let settings = config.merged_with(&args).expect("valid flags");

        assert_eq!(
            settings,
            Settings {
                round_secs: 30,
                seed: 4,
                frame_ms: DEFAULT_FRAME_MS,
                clumsiness: 1.0,
                realtime: false,
            }
        );
    }
}
