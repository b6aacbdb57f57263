use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing;

use crate::amount::Amount;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Self::from_toml_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg = toml::from_str::<CoreConfig>(text)?;
        // Fail at load time rather than on the first mashup.
        cfg.economy.policy(&cfg.pagination)?;
        Ok(cfg)
    }

    /// Knobs handed to the command layer.
    pub fn policy(&self) -> Result<EconomyPolicy> {
        self.economy.policy(&self.pagination)
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.storage.ledger_path = absolutize(root, &self.storage.ledger_path);
        self.logbook.path = absolutize(root, &self.logbook.path);
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            economy: EconomyConfig::default(),
            pagination: PaginationConfig::default(),
            storage: StorageConfig::default(),
            logbook: LogbookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemConfig {
    #[serde(default = "SystemConfig::default_name")]
    pub name: String,
    #[serde(default = "SystemConfig::default_version")]
    pub version: String,
}

impl SystemConfig {
    fn default_name() -> String {
        "dses".to_string()
    }

    fn default_version() -> String {
        "0.1.0".to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            version: Self::default_version(),
        }
    }
}

/// Incentive amounts and contribution weights.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EconomyConfig {
    /// Paid once per distinct developer whose service a new mashup composes.
    #[serde(default = "EconomyConfig::default_incentive_amount")]
    pub incentive_amount: String,
    /// Token used for incentives and call-time fees.
    #[serde(default = "EconomyConfig::default_fee_token")]
    pub fee_token: String,
    /// Weight `L` applied to invocations per service.
    #[serde(default = "EconomyConfig::default_invoke_weight")]
    pub invoke_weight: f64,
    /// Weight `R` applied to call-time sold per service.
    #[serde(default = "EconomyConfig::default_sales_weight")]
    pub sales_weight: f64,
    /// Contribution stored on a fresh registration.
    #[serde(default = "EconomyConfig::default_baseline_contribution")]
    pub baseline_contribution: f64,
}

impl EconomyConfig {
    fn default_incentive_amount() -> String {
        "10".to_string()
    }
    fn default_fee_token() -> String {
        "TOKENS".to_string()
    }
    fn default_invoke_weight() -> f64 {
        2.0
    }
    fn default_sales_weight() -> f64 {
        1.0
    }
    fn default_baseline_contribution() -> f64 {
        1.0
    }

    fn policy(&self, pagination: &PaginationConfig) -> Result<EconomyPolicy> {
        let incentive_amount = Amount::parse(&self.incentive_amount, "economy.incentive_amount")?;
        anyhow::ensure!(
            !self.fee_token.trim().is_empty(),
            "economy.fee_token must not be empty"
        );
        anyhow::ensure!(
            pagination.default_page_size > 0,
            "pagination.default_page_size must be positive"
        );
        Ok(EconomyPolicy {
            incentive_amount,
            fee_token: self.fee_token.trim().to_string(),
            invoke_weight: self.invoke_weight,
            sales_weight: self.sales_weight,
            baseline_contribution: self.baseline_contribution,
            default_page_size: pagination.default_page_size,
        })
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            incentive_amount: Self::default_incentive_amount(),
            fee_token: Self::default_fee_token(),
            invoke_weight: Self::default_invoke_weight(),
            sales_weight: Self::default_sales_weight(),
            baseline_contribution: Self::default_baseline_contribution(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "PaginationConfig::default_page_size")]
    pub default_page_size: u64,
}

impl PaginationConfig {
    fn default_page_size() -> u64 {
        10
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: Self::default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_ledger_path")]
    pub ledger_path: PathBuf,
}

impl StorageConfig {
    fn default_ledger_path() -> PathBuf {
        PathBuf::from("ledger.db")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_path: Self::default_ledger_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
}

impl LogbookConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("logbook.jsonl")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

/// Validated economy knobs passed into [`crate::commands::Commands`].
#[derive(Debug, Clone, PartialEq)]
pub struct EconomyPolicy {
    pub incentive_amount: Amount,
    pub fee_token: String,
    pub invoke_weight: f64,
    pub sales_weight: f64,
    pub baseline_contribution: f64,
    pub default_page_size: u64,
}

impl Default for EconomyPolicy {
    fn default() -> Self {
        let cfg = CoreConfig::default();
        Self {
            incentive_amount: Amount::from(10),
            fee_token: cfg.economy.fee_token,
            invoke_weight: cfg.economy.invoke_weight,
            sales_weight: cfg.economy.sales_weight,
            baseline_contribution: cfg.economy.baseline_contribution,
            default_page_size: cfg.pagination.default_page_size,
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}
