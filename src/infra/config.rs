//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::catalog::{
    Pathway, ReconstructionPolicy, StageCatalog, StageDescriptor, MAX_STAGES,
};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventStoreConfig {
    /// JSONL scan log
    #[serde(default = "default_event_file")]
    pub file: String,
    /// Query this day instead of today (testing against a fixed data set)
    #[serde(default)]
    pub fixed_date: Option<NaiveDate>,
}

fn default_event_file() -> String {
    "data/scans.jsonl".to_string()
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self { file: default_event_file(), fixed_date: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_file")]
    pub file: String,
}

fn default_notification_file() -> String {
    "notification.json".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { file: default_notification_file() }
    }
}

/// A clinic branch the board serves
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchConfig {
    pub name: String,
    /// Short code used in requests (e.g. "kbj")
    pub code: String,
    /// Identifier used by the scan log
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub codes: Vec<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathwayConfig {
    pub code: String,
    pub name: String,
    pub policy: ReconstructionPolicy,
    /// Number of configured stages shown (capped at MAX_STAGES)
    #[serde(default)]
    pub visible_stages: Option<i64>,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub event_store: EventStoreConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    pub branches: Vec<BranchConfig>,
    pub pathways: Vec<PathwayConfig>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    bind_address: String,
    port: u16,
    event_file: String,
    fixed_date: Option<NaiveDate>,
    notification_file: String,
    branches: Vec<BranchConfig>,
    catalog: StageCatalog,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            event_file: default_event_file(),
            fixed_date: None,
            notification_file: default_notification_file(),
            branches: vec![BranchConfig {
                name: "Kebon Jeruk".to_string(),
                code: "kbj".to_string(),
                id: "1".to_string(),
            }],
            catalog: Self::default_catalog(),
            config_file: "default".to_string(),
        }
    }
}

/// Branch and pathway codes are exactly three lowercase ASCII letters
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_lowercase())
}

impl Config {
    fn default_catalog() -> StageCatalog {
        let outpatient = Pathway::new(
            "pol",
            "Poli / Rawat Jalan",
            ReconstructionPolicy::Chronological,
            vec![
                StageDescriptor::new("Registrasi", ["REG"], None),
                StageDescriptor::new("Rekam Medik", ["RM"], None),
                StageDescriptor::new("Pemeriksaan Awal", ["PA"], None),
                StageDescriptor::new("Refraksi", ["REF"], None),
                StageDescriptor::new("Ruang Konsul", ["POLI"], None),
                StageDescriptor::new("Laboratorium", ["LAB"], None),
                StageDescriptor::new("Pemeriksaan Penunjang", ["PP"], None),
            ],
        )
        .expect("built-in outpatient pathway should be valid");
        let surgery = Pathway::new(
            "opr",
            "Operasi",
            ReconstructionPolicy::FixedTemplate,
            vec![
                StageDescriptor::new("Ruang Persiapan Tindakan", ["PREOP"], Some(0)),
                StageDescriptor::new("Ruang Tindakan", ["OT", "OT1", "OT2"], Some(1)),
                StageDescriptor::new("Ruang Pemulihan", ["PREPOST"], Some(2)),
            ],
        )
        .expect("built-in surgery pathway should be valid");

        StageCatalog::new(vec![surgery, outpatient])
            .expect("built-in pathway codes should be unique")
    }

    /// Determine config file path from the CLI flag or environment
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        // Default to dev.toml
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Self::from_toml(toml_config, &path.display().to_string())
    }

    fn from_toml(toml_config: TomlConfig, config_file: &str) -> anyhow::Result<Self> {
        if toml_config.branches.is_empty() {
            bail!("no branch defined in {config_file}");
        }
        for branch in &toml_config.branches {
            if !is_valid_code(&branch.code) {
                bail!("invalid branch code '{}' in {config_file}", branch.code);
            }
        }

        let mut pathways = Vec::with_capacity(toml_config.pathways.len());
        for pathway in toml_config.pathways {
            if !is_valid_code(&pathway.code) {
                bail!("invalid pathway code '{}' in {config_file}", pathway.code);
            }

            let visible = pathway
                .visible_stages
                .map(|n| n.clamp(0, MAX_STAGES as i64) as usize)
                .unwrap_or(MAX_STAGES);
            let mut stages = pathway.stages;
            stages.truncate(visible);

            let descriptors = stages
                .iter()
                .map(|s| StageDescriptor::new(&s.name, &s.codes, s.order))
                .collect();

            let built = Pathway::new(&pathway.code, &pathway.name, pathway.policy, descriptors)
                .with_context(|| format!("Invalid pathway '{}' in {config_file}", pathway.code))?;
            pathways.push(built);
        }

        let catalog = StageCatalog::new(pathways)
            .with_context(|| format!("Invalid stage catalog in {config_file}"))?;

        Ok(Self {
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            event_file: toml_config.event_store.file,
            fixed_date: toml_config.event_store.fixed_date,
            notification_file: toml_config.notifications.file,
            branches: toml_config.branches,
            catalog,
            config_file: config_file.to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => {
                info!(config_file = %path, "config_file_loaded");
                config
            }
            Err(e) => {
                warn!(config_file = %path, error = %format!("{e:#}"), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    /// Look up a configured branch by its request code
    pub fn branch(&self, code: &str) -> Option<&BranchConfig> {
        if !is_valid_code(code) {
            return None;
        }
        self.branches.iter().find(|b| b.code == code)
    }

    /// Day whose scans are shown: the fixed date when configured, else today
    pub fn query_date(&self) -> NaiveDate {
        self.fixed_date.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn event_file(&self) -> &str {
        &self.event_file
    }

    pub fn fixed_date(&self) -> Option<NaiveDate> {
        self.fixed_date
    }

    pub fn notification_file(&self) -> &str {
        &self.notification_file
    }

    pub fn branches(&self) -> &[BranchConfig] {
        &self.branches
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to pin the query date
    #[cfg(test)]
    pub fn with_fixed_date(mut self, date: NaiveDate) -> Self {
        self.fixed_date = Some(date);
        self
    }

    /// Builder method for tests to point at a scan log
    #[cfg(test)]
    pub fn with_event_file(mut self, file: &str) -> Self {
        self.event_file = file.to_string();
        self
    }

    /// Builder method for tests to point at a notification file
    #[cfg(test)]
    pub fn with_notification_file(mut self, file: &str) -> Self {
        self.notification_file = file.to_string();
        self
    }
}
