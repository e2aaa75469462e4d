use crate::enumerate::{default_exclude, EnumerateOptions};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub devices: DevicesConfig,

    #[serde(default)]
    pub smart: SmartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// Glob-style patterns of devices to skip (e.g. "loop*", "sr*")
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Friendly aliases for devices: { "sda" = "boot-ssd", "nvme0n1" = "scratch" }
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartConfig {
    /// Open SMART sessions at all. Off means identity only.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Timeout handed to each pass-through or admin command, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub command_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for DevicesConfig {
    fn default() -> Self {
        Self { exclude: default_exclude(), aliases: HashMap::new() }
    }
}

impl Default for SmartConfig {
    fn default() -> Self {
        Self { enabled: true, command_timeout_secs: default_timeout_secs() }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    /// Load the user's config, falling back to defaults. A missing file is
    /// created with the defaults; an invalid one is left alone.
    pub fn load() -> Self {
        let path = match Config::config_path() {
            Some(p) => p,
            None    => return Config::default(),
        };

        if !path.exists() {
            if let Err(e) = try_write_defaults(&path) {
                debug!(error = %e, "could not write default config");
            }
            return Config::default();
        }

        match fs::read_to_string(&path).map_err(anyhow::Error::from).and_then(|t| Config::load_from_str(&t)) {
            Ok(c)  => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config");
                Config::default()
            }
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("diskinfo").join("diskinfo.toml"))
    }

    pub fn load_from_str(text: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=60).contains(&self.smart.command_timeout_secs),
            "smart.command_timeout_secs must be between 1 and 60, got {}",
            self.smart.command_timeout_secs
        );
        ensure!(
            self.devices.exclude.iter().all(|p| !p.trim().is_empty()),
            "devices.exclude must not contain empty patterns"
        );
        Ok(())
    }

    pub fn enumerate_options(&self) -> EnumerateOptions {
        EnumerateOptions {
            exclude:         self.devices.exclude.clone(),
            smart:           self.smart.enabled,
            command_timeout: Duration::from_secs(self.smart.command_timeout_secs),
        }
    }

    /// The configured alias for a device, or its own name.
    pub fn display_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.devices.aliases.get(name).map(String::as_str).unwrap_or(name)
    }
}

fn try_write_defaults(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# diskinfo configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = Config::load_from_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.smart.enabled);
        assert_eq!(cfg.smart.command_timeout_secs, 5);
        assert!(cfg.devices.exclude.contains(&"loop*".to_string()));
    }

    #[test]
    fn defaults_survive_a_round_trip_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(Config::load_from_str(&text).unwrap(), Config::default());
    }

    #[test]
    fn timeout_is_validated() {
        assert!(Config::load_from_str("[smart]\ncommand_timeout_secs = 0\n").is_err());
        assert!(Config::load_from_str("[smart]\ncommand_timeout_secs = 61\n").is_err());
        assert!(Config::load_from_str("[smart]\ncommand_timeout_secs = 60\n").is_ok());
    }

    #[test]
    fn options_follow_config() {
        let cfg = Config::load_from_str(
            "[devices]\nexclude = [\"sdz\"]\n[devices.aliases]\nsda = \"boot\"\n[smart]\nenabled = false\ncommand_timeout_secs = 12\n",
        )
        .unwrap();
        let opts = cfg.enumerate_options();
        assert_eq!(opts.exclude, vec!["sdz".to_string()]);
        assert!(!opts.smart);
        assert_eq!(opts.command_timeout, Duration::from_secs(12));
        assert_eq!(cfg.display_name("sda"), "boot");
        assert_eq!(cfg.display_name("sdb"), "sdb");
    }
}
