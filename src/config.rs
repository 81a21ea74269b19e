use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{GeneSetLibrary, default_libraries};
use crate::enrichr::DEFAULT_ENRICHR_URL;
use crate::error::KiraError;
use crate::invoker::DEFAULT_RETRIES;

pub const DEFAULT_CONFIG_FILE: &str = "kira-g2t.json";
pub const DEFAULT_CUTOFF: f64 = 0.05;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub cutoff: Option<f64>,
    #[serde(default)]
    pub genesets: Option<GeneSetsEntry>,
    #[serde(default)]
    pub tmpdir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    #[serde(default)]
    pub enrichr_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GeneSetsEntry {
    Delimited(String),
    List(Vec<String>),
}

/// Values given on the command line; each one beats the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cutoff: Option<f64>,
    pub genesets: Option<String>,
    pub tmpdir: Option<Utf8PathBuf>,
    pub retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub cutoff: f64,
    pub libraries: Vec<GeneSetLibrary>,
    pub tmpdir: Option<Utf8PathBuf>,
    pub retries: u32,
    pub timeout: Duration,
    /// Overall budget for retrying the enrichment call; `None` means attempts alone decide.
    pub deadline: Option<Duration>,
    pub enrichr_url: String,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            cutoff: DEFAULT_CUTOFF,
            libraries: default_libraries(),
            tmpdir: None,
            retries: DEFAULT_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            deadline: None,
            enrichr_url: DEFAULT_ENRICHR_URL.to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `kira-g2t.json` from the current directory when present.
    /// Without either, the built-in defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let defaults = ResolvedConfig::default();

        let libraries = match config.genesets {
            Some(GeneSetsEntry::Delimited(value)) => GeneSetLibrary::parse_list(&value)?,
            Some(GeneSetsEntry::List(values)) => values
                .iter()
                .map(|value| value.parse::<GeneSetLibrary>())
                .collect::<Result<Vec<_>, KiraError>>()?,
            None => defaults.libraries,
        };

        let cutoff = validate_cutoff(config.cutoff.unwrap_or(defaults.cutoff))?;

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            cutoff,
            libraries,
            tmpdir: config.tmpdir,
            retries: config.retries.unwrap_or(defaults.retries),
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            deadline: config.deadline_secs.map(Duration::from_secs),
            enrichr_url: config.enrichr_url.unwrap_or(defaults.enrichr_url),
        })
    }
}

impl ResolvedConfig {
    pub fn apply(mut self, overrides: ConfigOverrides) -> Result<Self, KiraError> {
        if let Some(cutoff) = overrides.cutoff {
            self.cutoff = validate_cutoff(cutoff)?;
        }
        if let Some(genesets) = overrides.genesets {
            self.libraries = GeneSetLibrary::parse_list(&genesets)?;
        }
        if let Some(tmpdir) = overrides.tmpdir {
            self.tmpdir = Some(tmpdir);
        }
        if let Some(retries) = overrides.retries {
            self.retries = retries;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout = Duration::from_secs(timeout_secs);
        }
        if let Some(deadline_secs) = overrides.deadline_secs {
            self.deadline = Some(Duration::from_secs(deadline_secs));
        }
        Ok(self)
    }
}

fn validate_cutoff(cutoff: f64) -> Result<f64, KiraError> {
    if !cutoff.is_finite() || !(0.0..=1.0).contains(&cutoff) {
        return Err(KiraError::InvalidCutoff(cutoff));
    }
    Ok(cutoff)
}
