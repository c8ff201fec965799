use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;
use tracing::Level;
use url::Url;

use crate::form::{AvatarRules, DEFAULT_AVATAR_MAX_BYTES, DEFAULT_AVATAR_TYPES};
use crate::logging;
use crate::search::DEFAULT_DEBOUNCE;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "contactdesk";
const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_PAGE_SIZES: [usize; 4] = [5, 10, 20, 50];

#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from, if any.
    pub config_path: Option<PathBuf>,
    pub remote: RemoteConfig,
    pub list: ListConfig,
    pub avatar: AvatarRules,
    pub log_level: Level,
    /// Problems found while loading that did not stop it. Reported once
    /// logging is up.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ListConfig {
    pub page_size: usize,
    /// Sizes offered to the user.
    pub page_sizes: Vec<usize>,
    pub debounce: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            remote: RemoteConfig {
                base_url: default_base_url(),
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
            list: ListConfig {
                page_size: DEFAULT_PAGE_SIZE,
                page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
                debounce: DEFAULT_DEBOUNCE,
            },
            avatar: AvatarRules::default(),
            log_level: Level::WARN,
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Apply command-line overrides on top of the file.
    pub fn apply_overrides(&mut self, base_url: Option<&str>, page_size: Option<usize>) -> Result<()> {
        if let Some(raw) = base_url {
            self.remote.base_url = parse_base_url(raw)?;
        }
        if let Some(size) = page_size {
            if size == 0 {
                bail!("page size must be greater than zero");
            }
            self.list.page_size = size;
        }
        Ok(())
    }

    pub fn report_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("{warning}");
        }
    }
}

// =============================================================================
// File format
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    remote: RemoteFile,
    list: ListFile,
    avatar: AvatarFile,
    logging: LoggingFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteFile {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListFile {
    page_size: Option<usize>,
    page_sizes: Option<Vec<usize>>,
    debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AvatarFile {
    max_bytes: Option<usize>,
    allowed_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingFile {
    level: Option<String>,
}

// =============================================================================
// Loading
// =============================================================================

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load the configuration. An explicit path must exist; the default file is
/// optional and its absence yields defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            let path = expand_tilde(path);
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    let mut config = load_from_str(&raw)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    config.config_path = Some(path);
    Ok(config)
}

pub fn load_from_str(raw: &str) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw).context("failed to parse configuration as TOML")?;

    let mut warnings = Vec::new();
    warn_unknown_keys(&value, &mut warnings);

    let file: ConfigFile = value
        .try_into()
        .context("failed to deserialize configuration")?;

    let defaults = Config::default();

    let base_url = match file.remote.base_url {
        Some(raw) => parse_base_url(&raw)?,
        None => defaults.remote.base_url,
    };
    let timeout = match file.remote.timeout_secs {
        Some(0) => bail!("remote.timeout_secs must be greater than zero"),
        Some(secs) => Duration::from_secs(secs),
        None => defaults.remote.timeout,
    };

    let page_size = match file.list.page_size {
        Some(0) => bail!("list.page_size must be greater than zero"),
        Some(size) => size,
        None => defaults.list.page_size,
    };
    let page_sizes = match file.list.page_sizes {
        Some(sizes) if sizes.is_empty() => bail!("list.page_sizes must not be empty"),
        Some(sizes) if sizes.contains(&0) => bail!("list.page_sizes entries must be greater than zero"),
        Some(sizes) => sizes,
        None => defaults.list.page_sizes,
    };
    if !page_sizes.contains(&page_size) {
        warnings.push(format!(
            "list.page_size {} is not one of list.page_sizes {:?}",
            page_size, page_sizes
        ));
    }
    let debounce = file
        .list
        .debounce_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.list.debounce);

    let max_bytes = match file.avatar.max_bytes {
        Some(0) => bail!("avatar.max_bytes must be greater than zero"),
        Some(bytes) => bytes,
        None => DEFAULT_AVATAR_MAX_BYTES,
    };
    let allowed_types: Vec<String> = match file.avatar.allowed_types {
        Some(types) => types
            .into_iter()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
        None => DEFAULT_AVATAR_TYPES.iter().map(|t| t.to_string()).collect(),
    };
    if allowed_types.is_empty() {
        bail!("avatar.allowed_types must name at least one type");
    }

    let log_level = match file.logging.level.as_deref() {
        Some(name) => logging::parse_level(name).unwrap_or_else(|| {
            warnings.push(format!("unknown logging.level `{}`; using warn", name));
            Level::WARN
        }),
        None => defaults.log_level,
    };

    Ok(Config {
        config_path: None,
        remote: RemoteConfig { base_url, timeout },
        list: ListConfig {
            page_size,
            page_sizes,
            debounce,
        },
        avatar: AvatarRules {
            max_bytes,
            allowed_types,
        },
        log_level,
        warnings,
    })
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid base URL `{}`", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("base URL must use http or https, got `{}`", raw);
    }
    if url.cannot_be_a_base() {
        bail!("base URL `{}` cannot have paths appended", raw);
    }
    Ok(url)
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value, warnings: &mut Vec<String>) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from(["remote", "list", "avatar", "logging"]);
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            warnings.push(format!("unknown configuration key `{}`", key));
        }
    }

    let sections: [(&str, &[&str]); 4] = [
        ("remote", &["base_url", "timeout_secs"]),
        ("list", &["page_size", "page_sizes", "debounce_ms"]),
        ("avatar", &["max_bytes", "allowed_types"]),
        ("logging", &["level"]),
    ];
    for (section, known) in sections {
        if let Some(value) = table.get(section) {
            warn_unknown_in_section(value, section, known, warnings);
        }
    }
}

fn warn_unknown_in_section(
    value: &toml::Value,
    section: &str,
    known: &[&str],
    warnings: &mut Vec<String>,
) {
    let Some(table) = value.as_table() else {
        return;
    };
    let known_set: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if !known_set.contains(key.as_str()) {
            warnings.push(format!("unknown {}.* entry `{}`", section, key));
        }
    }
}
