use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where each run artifact is written
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OutputPaths {
    pub combined_csv: PathBuf,
    pub airdrop_csv: PathBuf,
    pub settlement_csv: PathBuf,
    pub appchain_csv: PathBuf,
    pub invoke_file: PathBuf,
    pub inverse_csv: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            combined_csv: PathBuf::from("combined_rewards.csv"),
            airdrop_csv: PathBuf::from("airdrop.csv"),
            settlement_csv: PathBuf::from("settlement_rewards.csv"),
            appchain_csv: PathBuf::from("appchain_rewards.csv"),
            invoke_file: PathBuf::from("invoke.txt"),
            inverse_csv: PathBuf::from("airdrop_inverse.csv"),
        }
    }
}

impl OutputPaths {
    /// Resolve relative paths against `dir`; absolute paths are kept
    pub fn rooted_at(&self, dir: &Path) -> Self {
        let root = |p: &PathBuf| if p.is_absolute() { p.clone() } else { dir.join(p) };
        Self {
            combined_csv: root(&self.combined_csv),
            airdrop_csv: root(&self.airdrop_csv),
            settlement_csv: root(&self.settlement_csv),
            appchain_csv: root(&self.appchain_csv),
            invoke_file: root(&self.invoke_file),
            inverse_csv: root(&self.inverse_csv),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub settlement_endpoint: String,
    pub appchain_endpoint: String,
    /// Contract receiving the `reward` calls in the command batch
    pub batch_target_address: String,
    pub query_limit: u32,
    pub request_timeout_secs: u64,
    /// When false an empty combined set fails the run
    pub allow_empty_export: bool,
    pub output: OutputPaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settlement_endpoint: "https://api.cartridge.gg/x/nums-starknet/torii/graphql".to_string(),
            appchain_endpoint: "http://localhost:8080/graphql".to_string(),
            batch_target_address:
                "0x00e5f10eddc01699dc899a30dbc3c9858148fa4aa0a47c0ffd85f887ffc4653e".to_string(),
            query_limit: 200,
            request_timeout_secs: 30,
            allow_empty_export: true,
            output: OutputPaths::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by `AIRDROP_*` variables, e.g.
    /// `AIRDROP_APPCHAIN_ENDPOINT` or `AIRDROP_OUTPUT__AIRDROP_CSV`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Config::default();
        let path = |p: &PathBuf| p.to_string_lossy().into_owned();

        config::Config::builder()
            .set_default("settlement_endpoint", defaults.settlement_endpoint.clone())?
            .set_default("appchain_endpoint", defaults.appchain_endpoint.clone())?
            .set_default("batch_target_address", defaults.batch_target_address.clone())?
            .set_default("query_limit", i64::from(defaults.query_limit))?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("allow_empty_export", defaults.allow_empty_export)?
            .set_default("output.combined_csv", path(&defaults.output.combined_csv))?
            .set_default("output.airdrop_csv", path(&defaults.output.airdrop_csv))?
            .set_default("output.settlement_csv", path(&defaults.output.settlement_csv))?
            .set_default("output.appchain_csv", path(&defaults.output.appchain_csv))?
            .set_default("output.invoke_file", path(&defaults.output.invoke_file))?
            .set_default("output.inverse_csv", path(&defaults.output.inverse_csv))?
            .add_source(
                config::Environment::with_prefix("AIRDROP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
