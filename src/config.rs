use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::{clog_debug, Error, Result};

/// Console verbosity, 0..=3. Controls what child-process output reaches the
/// terminal and whether the orchestrator prints its own progress lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// 0: all child output discarded, no progress lines.
    Silent,
    /// 1: child stderr surfaced, stdout discarded.
    Errors,
    /// 2: level 1 plus orchestrator progress lines.
    Progress,
    /// 3: full child stdout and stderr surfaced.
    Full,
}

impl Verbosity {
    /// Map a numeric `--verbose-level` to a variant. Values above 3 clamp to
    /// `Full`.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Silent,
            1 => Verbosity::Errors,
            2 => Verbosity::Progress,
            _ => Verbosity::Full,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Verbosity::Silent => 0,
            Verbosity::Errors => 1,
            Verbosity::Progress => 2,
            Verbosity::Full => 3,
        }
    }

    /// Child stdout is inherited only at full verbosity.
    pub fn shows_stdout(&self) -> bool {
        matches!(self, Verbosity::Full)
    }

    /// Child stderr is inherited at every level above silent.
    pub fn shows_stderr(&self) -> bool {
        *self >= Verbosity::Errors
    }

    /// Whether the orchestrator prints its own step-progress lines.
    pub fn progress(&self) -> bool {
        *self >= Verbosity::Progress
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Progress
    }
}

/// Immutable snapshot of one run's settings. Built once in `main` from CLI
/// flags layered over the optional config file, then passed by value; nothing
/// mutates it afterwards (in particular, dashboard enablement travels here
/// rather than through process-global environment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub sequential: bool,
    pub build_images: bool,
    pub ui: bool,
    pub verbosity: Verbosity,
    pub continue_on_failure: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sequential: false,
            build_images: false,
            ui: false,
            verbosity: Verbosity::default(),
            continue_on_failure: true,
        }
    }
}

/// Optional on-disk defaults at ~/.chaosup/chaosup.toml. Boolean fields can
/// only enable behavior; CLI flags layer on top.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ui: bool,
    #[serde(default)]
    pub build_images: bool,
    #[serde(default)]
    pub sequential: bool,
    pub verbose_level: Option<u8>,
    pub continue_on_failure: Option<bool>,
}

impl Config {
    pub fn chaosup_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".chaosup"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::chaosup_dir()?.join("chaosup.toml"))
    }

    pub fn report_path() -> Result<PathBuf> {
        Ok(Self::chaosup_dir()?.join("last-run.json"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        clog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            clog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        clog_debug!(
            "Config loaded: ui={}, build_images={}, sequential={}, verbose_level={:?}",
            config.ui,
            config.build_images,
            config.sequential,
            config.verbose_level
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::chaosup_dir()?;
        if !dir.exists() {
            clog_debug!("Creating chaosup directory: {}", dir.display());
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        clog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}
