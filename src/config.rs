use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{collections::HashSet, fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::display::button::Button;
use crate::display::panel::Orientation;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every group falls back to its defaults
/// so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// "info" | "debug" | ...
    pub log_level: Option<String>,
    pub board: BoardConfig,
    pub ui: UiConfig,
    pub fan: FanConfig,
    /// mount points shown on the disk pages
    pub disks: Vec<String>,
    /// two disks per page
    pub group_disks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            board: BoardConfig::default(),
            ui: UiConfig::default(),
            fan: FanConfig::default(),
            disks: Vec::new(),
            group_disks: true,
        }
    }
}

/// HAT wiring, BCM numbering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub spi_bus: String,
    pub spi_speed_hz: u32,
    pub rst_pin: u32,
    pub dc_pin: u32,
    pub cs_pin: u32,
    pub busy_pin: u32,
    pub key_ok_pin: u32,
    pub key_back_pin: u32,
    pub key_add_pin: u32,
    pub key_sub_pin: u32,
    pub fan_pin: u32,
    pub led_pin: u32,
    pub busy_poll_ms: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            spi_bus: "/dev/spidev0.0".to_string(),
            spi_speed_hz: 2_000_000,
            rst_pin: 17,
            dc_pin: 25,
            cs_pin: 8,
            busy_pin: 24,
            key_ok_pin: 5,
            key_back_pin: 6,
            key_add_pin: 13,
            key_sub_pin: 19,
            fan_pin: 18,
            led_pin: 26,
            busy_poll_ms: 100,
        }
    }
}

impl BoardConfig {
    pub fn key_pin(&self, button: Button) -> u32 {
        match button {
            Button::Ok => self.key_ok_pin,
            Button::Back => self.key_back_pin,
            Button::Add => self.key_add_pin,
            Button::Sub => self.key_sub_pin,
        }
    }

    fn pins(&self) -> [(&'static str, u32); 10] {
        [
            ("rst", self.rst_pin),
            ("dc", self.dc_pin),
            ("cs", self.cs_pin),
            ("busy", self.busy_pin),
            ("key_ok", self.key_ok_pin),
            ("key_back", self.key_back_pin),
            ("key_add", self.key_add_pin),
            ("key_sub", self.key_sub_pin),
            ("fan", self.fan_pin),
            ("led", self.led_pin),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiOrientation {
    /// 122x250 frames
    Vertical,
    /// 250x122 frames
    Horizontal,
}

impl From<UiOrientation> for Orientation {
    fn from(o: UiOrientation) -> Self {
        match o {
            UiOrientation::Vertical => Orientation::Vertical,
            UiOrientation::Horizontal => Orientation::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// page shown at startup, first page when unset
    pub index_page: Option<String>,
    pub orientation: UiOrientation,
    pub idle_tick_ms: u64,
    pub button_queue: usize,
    pub menu_per_page: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            index_page: None,
            orientation: UiOrientation::Horizontal,
            idle_tick_ms: 20,
            button_queue: 16,
            menu_per_page: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    pub enabled: bool,
    pub on_celsius: f64,
    pub off_celsius: f64,
    pub period_secs: u64,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            on_celsius: 55.0,
            off_celsius: 43.0,
            period_secs: 2,
        }
    }
}

/// CLI overrides, layered over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "nasink", about = "NasInk e-paper status panel", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Verbose logging
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Mount point to show, repeatable
    #[arg(short = 'd', long = "disk", value_hint = ValueHint::DirPath)]
    pub disks: Vec<String>,
    /// One disk per page
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_group: bool,
    /// Leave the fan alone
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_fan: bool,
    /// Page shown at startup
    #[arg(long)]
    pub index_page: Option<String>,
    /// Render the index page to a PBM file and exit, hardware untouched
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub dump_page: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: read YAML, merge CLI, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults via serde(default), 2) YAML file (explicit path or search)
    let mut cfg = if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            read_yaml(p)?
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        read_yaml(&p)?
    } else {
        Config::default()
    };

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&mut cfg)?;

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/nasink/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/nasink.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["nasink.yaml", "config/nasink.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.debug               { cfg.log_level = Some("debug".to_string()); }
    // disks on the command line replace the configured list
    if !cli.disks.is_empty()   { cfg.disks = cli.disks.clone(); }
    if cli.no_group            { cfg.group_disks = false; }
    if cli.no_fan              { cfg.fan.enabled = false; }
    if cli.index_page.is_some() { cfg.ui.index_page = cli.index_page.clone(); }
}

/// Invariants; clamps what can be clamped, rejects the rest.
fn validate(cfg: &mut Config) -> Result<(), ConfigError> {
    if cfg.disks.is_empty() {
        return Err(ConfigError::Validation("no partition(s) specified, use -d <mount>".into()));
    }

    let mut seen = HashSet::new();
    for (name, pin) in cfg.board.pins() {
        if !seen.insert(pin) {
            return Err(ConfigError::Validation(format!("pin {pin} ({name}) is assigned twice")));
        }
    }

    if cfg.board.spi_speed_hz == 0 {
        return Err(ConfigError::Validation("board spi_speed_hz must be > 0".into()));
    }
    if cfg.fan.off_celsius >= cfg.fan.on_celsius {
        return Err(ConfigError::Validation("fan off_celsius must be below on_celsius".into()));
    }
    if cfg.fan.period_secs == 0 {
        return Err(ConfigError::Validation("fan period_secs must be > 0".into()));
    }
    if cfg.ui.button_queue == 0 {
        return Err(ConfigError::Validation("ui button_queue must be > 0".into()));
    }

    cfg.ui.menu_per_page = cfg.ui.menu_per_page.clamp(1, 3);
    Ok(())
}
