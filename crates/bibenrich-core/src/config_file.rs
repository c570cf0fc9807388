use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api_keys: Option<ApiKeysConfig>,
    pub enrichment: Option<EnrichmentConfig>,
    pub confidence: Option<ConfidenceConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub delay_secs: Option<f64>,
    pub resolve_timeout_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub search_timeout_secs: Option<u64>,
    pub search_results: Option<usize>,
    pub max_candidates: Option<usize>,
    pub resolver_url: Option<String>,
    pub search_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    pub authoritative_base: Option<u8>,
    pub search_base: Option<u8>,
    pub unclassified_base: Option<u8>,
    pub per_flag_bonus: Option<u8>,
    pub doi_webpage: Option<u8>,
    pub search_webpage: Option<u8>,
    pub review_threshold: Option<u8>,
}

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Platform config directory path: `<config_dir>/bibenrich/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bibenrich").join("config.toml"))
}

/// Load config by cascading CWD `.bibenrich.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".bibenrich.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    match read_config(path) {
        Ok(config) => Some(config),
        Err(ConfigFileError::Read { .. }) => None,
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}

/// Read and parse a config file, reporting why it could not be used.
pub fn read_config(path: &Path) -> Result<ConfigFile, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `overlay`'s value for a field if set, otherwise `base`'s.
fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (ba, oa) = (&base.api_keys, &overlay.api_keys);
    let (be, oe) = (&base.enrichment, &overlay.enrichment);
    let (bc, oc) = (&base.confidence, &overlay.confidence);

    ConfigFile {
        api_keys: Some(ApiKeysConfig {
            google_api_key: pick(oa, ba, |a| a.google_api_key.clone()),
            google_cse_id: pick(oa, ba, |a| a.google_cse_id.clone()),
        }),
        enrichment: Some(EnrichmentConfig {
            delay_secs: pick(oe, be, |e| e.delay_secs),
            resolve_timeout_secs: pick(oe, be, |e| e.resolve_timeout_secs),
            fetch_timeout_secs: pick(oe, be, |e| e.fetch_timeout_secs),
            search_timeout_secs: pick(oe, be, |e| e.search_timeout_secs),
            search_results: pick(oe, be, |e| e.search_results),
            max_candidates: pick(oe, be, |e| e.max_candidates),
            resolver_url: pick(oe, be, |e| e.resolver_url.clone()),
            search_url: pick(oe, be, |e| e.search_url.clone()),
            user_agent: pick(oe, be, |e| e.user_agent.clone()),
        }),
        confidence: Some(ConfidenceConfig {
            authoritative_base: pick(oc, bc, |c| c.authoritative_base),
            search_base: pick(oc, bc, |c| c.search_base),
            unclassified_base: pick(oc, bc, |c| c.unclassified_base),
            per_flag_bonus: pick(oc, bc, |c| c.per_flag_bonus),
            doi_webpage: pick(oc, bc, |c| c.doi_webpage),
            search_webpage: pick(oc, bc, |c| c.search_webpage),
            review_threshold: pick(oc, bc, |c| c.review_threshold),
        }),
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl ConfigFile {
    /// Overwrite the fields of `config` that this file sets.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref a) = self.api_keys {
            if a.google_api_key.is_some() {
                config.google_api_key = a.google_api_key.clone();
            }
            if a.google_cse_id.is_some() {
                config.google_cse_id = a.google_cse_id.clone();
            }
        }

        if let Some(ref e) = self.enrichment {
            set(&mut config.delay_secs, e.delay_secs);
            set(&mut config.resolve_timeout_secs, e.resolve_timeout_secs);
            set(&mut config.fetch_timeout_secs, e.fetch_timeout_secs);
            set(&mut config.search_timeout_secs, e.search_timeout_secs);
            set(&mut config.search_results, e.search_results);
            set(&mut config.max_candidates, e.max_candidates);
            set(&mut config.resolver_url, e.resolver_url.clone());
            set(&mut config.search_url, e.search_url.clone());
            set(&mut config.user_agent, e.user_agent.clone());
        }

        if let Some(ref c) = self.confidence {
            let table = &mut config.confidence;
            set(&mut table.authoritative_base, c.authoritative_base);
            set(&mut table.search_base, c.search_base);
            set(&mut table.unclassified_base, c.unclassified_base);
            set(&mut table.per_flag_bonus, c.per_flag_bonus);
            set(&mut table.doi_webpage, c.doi_webpage);
            set(&mut table.search_webpage, c.search_webpage);
            set(&mut table.review_threshold, c.review_threshold);
        }
    }

    /// Defaults with this file applied on top.
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();
        self.apply_to(&mut config);
        config
    }
}
