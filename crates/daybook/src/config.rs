use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use daybook_core::Priority;
use daybook_core::task::PRIORITY_USAGE;
use serde::Deserialize;

const CONFIG_FILE: &str = "config.toml";

/// Optional user configuration loaded from `config.toml` in the daybook
/// configuration directory.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserConfig {
    /// Directory holding workspace files; defaults to the configuration
    /// directory itself.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Priority letter assigned to new tasks when `--priority` is absent.
    #[serde(default)]
    pub default_priority: Option<String>,
}

impl UserConfig {
    /// Load configuration from `dir/config.toml`; a missing file yields
    /// the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Everything the command handlers need from the environment, resolved
/// once at startup so the core stays free of ambient lookups.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory workspace files live under.
    pub data_dir: PathBuf,
    /// Priority for new tasks without an explicit `--priority`.
    pub default_priority: Priority,
}

impl Settings {
    /// Resolve settings from the `--data-dir` flag and the user config.
    /// Config always loads from the configuration directory; for the data
    /// dir the flag wins over the config file's `data_dir`, which wins
    /// over the configuration directory itself.
    pub fn resolve(data_dir_flag: Option<PathBuf>) -> Result<Self> {
        Self::resolve_from(data_dir_flag, default_config_root()?)
    }

    fn resolve_from(data_dir_flag: Option<PathBuf>, config_root: PathBuf) -> Result<Self> {
        let config = UserConfig::load(&config_root)?;

        let data_dir = data_dir_flag
            .or(config.data_dir)
            .unwrap_or(config_root);

        let default_priority = match config.default_priority.as_deref() {
            None => Priority::Normal,
            Some(letter) => {
                let pri = Priority::from_letter(letter);
                if pri == Priority::Unknown {
                    bail!("invalid default_priority {letter:?} in config\n{PRIORITY_USAGE}");
                }
                pri
            }
        };

        Ok(Self {
            data_dir,
            default_priority,
        })
    }
}

fn default_config_root() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("daybook"))
        .ok_or_else(|| anyhow!("could not determine a configuration directory"))
}
