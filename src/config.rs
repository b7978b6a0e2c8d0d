use crate::errors::{AppError, AppResult};
use crate::expansion::{CustodyService, ExpansionConfig, ServiceCredential};
use crate::types::{SignatoryId, SignatorySet};
use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bitcoin_rpc: BitcoinRpcConfig,
    pub custody: CustodyConfig,
    pub services: ServicesConfig,
    pub signatories: SignatoriesConfig,
}

/// Bitcoin RPC configuration for UTXO discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinRpcConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_seconds: u64,
}

impl Default for BitcoinRpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8332".to_string(),
            username: "bitcoin".to_string(),
            password: "password".to_string(),
            timeout_seconds: 60,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyConfig {
    /// Confirmations required before an output counts as spendable
    pub confidence_level: u32,
    /// Account that writes address details
    pub registrar_account: String,
    /// Account holding generated client/free addresses
    pub holder_account: String,
    /// Account holding change addresses
    pub change_holder_account: String,
    /// Domain of client accounts, e.g. `alice@d3`
    pub client_domain: String,
    /// Account on which membership-change events are written
    pub trigger_account: String,
    pub poll_interval_seconds: u64,
    pub checkpoint_path: PathBuf,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            confidence_level: 6,
            registrar_account: "mst_btc_registration_service@notary".to_string(),
            holder_account: "notary@notary".to_string(),
            change_holder_account: "change_addresses@notary".to_string(),
            client_domain: "d3".to_string(),
            trigger_account: "expansion_trigger@notary".to_string(),
            poll_interval_seconds: 60,
            checkpoint_path: PathBuf::from("./custody_checkpoints.db"),
        }
    }
}

/// Credential of each custody service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub address_generation: ServiceCredential,
    pub deposit: ServiceCredential,
    pub withdrawal: ServiceCredential,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        let credential = |account: &str| ServiceCredential {
            account_id: account.to_string(),
            signatory: SignatoryId::new("notary-0"),
        };
        Self {
            address_generation: credential("btc_address_generation@notary"),
            deposit: credential("btc_deposit@notary"),
            withdrawal: credential("btc_withdrawal@notary"),
        }
    }
}

impl ServicesConfig {
    pub fn credential(&self, service: CustodyService) -> &ServiceCredential {
        match service {
            CustodyService::AddressGeneration => &self.address_generation,
            CustodyService::Deposit => &self.deposit,
            CustodyService::Withdrawal => &self.withdrawal,
        }
    }
}

/// Genesis signatory set shared by all services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatoriesConfig {
    pub members: Vec<String>,
    pub threshold: usize,
}

impl Default for SignatoriesConfig {
    fn default() -> Self {
        Self {
            members: vec!["notary-0".to_string()],
            threshold: 1,
        }
    }
}

impl AppConfig {
    /// Load configuration from config.toml file and environment variables
    /// Environment variables take precedence over file configuration
    pub fn load() -> AppResult<Self> {
        Self::load_from("config")
    }

    /// Same as [`AppConfig::load`] with an explicit config file (optional)
    pub fn load_from(file: &str) -> AppResult<Self> {
        let rpc = BitcoinRpcConfig::default();
        let custody = CustodyConfig::default();
        let services = ServicesConfig::default();
        let signatories = SignatoriesConfig::default();

        let mut builder = Config::builder()
            // Bitcoin RPC defaults
            .set_default("bitcoin_rpc.url", rpc.url)?
            .set_default("bitcoin_rpc.username", rpc.username)?
            .set_default("bitcoin_rpc.password", rpc.password)?
            .set_default("bitcoin_rpc.timeout_seconds", rpc.timeout_seconds)?
            .set_default("bitcoin_rpc.initial_backoff_ms", rpc.initial_backoff_ms)?
            .set_default("bitcoin_rpc.backoff_multiplier", rpc.backoff_multiplier)?
            .set_default("bitcoin_rpc.max_backoff_seconds", rpc.max_backoff_seconds)?
            // Custody defaults
            .set_default("custody.confidence_level", custody.confidence_level)?
            .set_default("custody.registrar_account", custody.registrar_account)?
            .set_default("custody.holder_account", custody.holder_account)?
            .set_default(
                "custody.change_holder_account",
                custody.change_holder_account,
            )?
            .set_default("custody.client_domain", custody.client_domain)?
            .set_default("custody.trigger_account", custody.trigger_account)?
            .set_default(
                "custody.poll_interval_seconds",
                custody.poll_interval_seconds,
            )?
            .set_default(
                "custody.checkpoint_path",
                custody.checkpoint_path.to_string_lossy().to_string(),
            )?
            .set_default("signatories.members", signatories.members)?
            .set_default("signatories.threshold", signatories.threshold as i64)?;

        for service in CustodyService::ALL {
            let credential = services.credential(service);
            builder = builder
                .set_default(
                    format!("services.{}.account_id", service.as_str()),
                    credential.account_id.clone(),
                )?
                .set_default(
                    format!("services.{}.signatory", service.as_str()),
                    credential.signatory.as_str().to_string(),
                )?;
        }

        let config = builder
            // Load from config.toml if it exists
            .add_source(File::with_name(file).required(false))
            // BITCOIN_RPC_* and CUSTODY_* env variables override single settings
            .set_override_option("bitcoin_rpc.url", env::var("BITCOIN_RPC_URL").ok())?
            .set_override_option("bitcoin_rpc.username", env::var("BITCOIN_RPC_USERNAME").ok())?
            .set_override_option("bitcoin_rpc.password", env::var("BITCOIN_RPC_PASSWORD").ok())?
            .set_override_option(
                "bitcoin_rpc.timeout_seconds",
                env::var("BITCOIN_RPC_TIMEOUT_SECONDS").ok(),
            )?
            .set_override_option(
                "custody.confidence_level",
                env::var("CUSTODY_CONFIDENCE_LEVEL").ok(),
            )?
            .set_override_option(
                "custody.poll_interval_seconds",
                env::var("CUSTODY_POLL_INTERVAL_SECONDS").ok(),
            )?
            .set_override_option(
                "custody.checkpoint_path",
                env::var("CUSTODY_CHECKPOINT_PATH").ok(),
            )?
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Get default config values for CLI argument defaults
    pub fn get_defaults() -> Result<Self, ConfigError> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(_) => Ok(Self {
                bitcoin_rpc: BitcoinRpcConfig::default(),
                custody: CustodyConfig::default(),
                services: ServicesConfig::default(),
                signatories: SignatoriesConfig::default(),
            }),
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.custody.confidence_level == 0 {
            return Err(AppError::Config(
                "custody.confidence_level must be at least 1".to_string(),
            ));
        }
        if self.custody.poll_interval_seconds == 0 {
            return Err(AppError::Config(
                "custody.poll_interval_seconds must be at least 1".to_string(),
            ));
        }
        self.initial_signatory_set()?;
        Ok(())
    }

    /// Genesis signatory set from the `signatories` section
    pub fn initial_signatory_set(&self) -> AppResult<SignatorySet> {
        SignatorySet::new(
            self.signatories.members.iter().map(SignatoryId::new),
            self.signatories.threshold,
        )
        .map_err(|e| AppError::Config(format!("signatories: {}", e)))
    }

    /// Expander configuration of every custody service
    pub fn expansion_configs(&self) -> Vec<ExpansionConfig> {
        CustodyService::ALL
            .iter()
            .map(|service| ExpansionConfig {
                service: *service,
                credential: self.services.credential(*service).clone(),
                trigger_account: self.custody.trigger_account.clone(),
            })
            .collect()
    }
}
