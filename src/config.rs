//! Runtime configuration, read from the environment (`.env` is loaded by the binaries).

use std::env;
use std::path::PathBuf;

use reqwest::Url;
use thiserror::Error;

use crate::services::bucketing::{BucketWidth, InvalidBucketWidth};

/// Environment variable for a full database URL
const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Discrete connection parameters, used when DATABASE_URL is not set
const ENV_DB_HOST: &str = "DB_HOST";
const ENV_DB_PORT: &str = "DB_PORT";
const ENV_DB_NAME: &str = "DB_NAME";
const ENV_DB_USER: &str = "DB_USER";
const ENV_DB_PASSWORD: &str = "DB_PASSWORD";

/// Environment variable for the snapshot bucket width in minutes
const ENV_BUCKET_MINUTES: &str = "SNAPSHOT_BUCKET_MINUTES";

/// Environment variable for the batch source label
const ENV_SOURCE: &str = "PIPELINE_SOURCE";

/// Environment variable for the landing-zone directory
const ENV_LANDING_ZONE_DIR: &str = "LANDING_ZONE_DIR";

const ENV_COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
const ENV_COINGECKO_BASE_URL: &str = "COINGECKO_BASE_URL";
const ENV_COINGECKO_COIN_IDS: &str = "COINGECKO_COIN_IDS";

pub const DEFAULT_SOURCE: &str = "CoinGecko";
const DEFAULT_LANDING_ZONE_DIR: &str = "landing_zone";
const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_COIN_IDS: &str = "bitcoin,ethereum,solana";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error(transparent)]
    BucketWidth(#[from] InvalidBucketWidth),
}

#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub coin_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub bucket_width: BucketWidth,
    pub source: String,
    pub landing_zone_dir: PathBuf,
    pub coingecko: CoinGeckoConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = match get(ENV_DATABASE_URL) {
            Some(url) => url,
            None => {
                let password = get(ENV_DB_PASSWORD).ok_or(ConfigError::Missing(ENV_DB_PASSWORD))?;
                let port = match get(ENV_DB_PORT) {
                    Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                        name: ENV_DB_PORT,
                        value: raw,
                    })?,
                    None => 5432,
                };
                postgres_url(
                    &get(ENV_DB_USER).unwrap_or_else(|| "postgres".to_string()),
                    &password,
                    &get(ENV_DB_HOST).unwrap_or_else(|| "localhost".to_string()),
                    port,
                    &get(ENV_DB_NAME).unwrap_or_else(|| "crypto_db".to_string()),
                )?
            }
        };

        let bucket_width = match get(ENV_BUCKET_MINUTES) {
            Some(raw) => {
                let minutes = raw.parse::<u32>().map_err(|_| ConfigError::Invalid {
                    name: ENV_BUCKET_MINUTES,
                    value: raw,
                })?;
                BucketWidth::new(minutes)?
            }
            None => BucketWidth::default(),
        };

        let coin_ids = get(ENV_COINGECKO_COIN_IDS)
            .unwrap_or_else(|| DEFAULT_COIN_IDS.to_string())
            .split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        Ok(Self {
            database_url,
            bucket_width,
            source: get(ENV_SOURCE).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            landing_zone_dir: get(ENV_LANDING_ZONE_DIR)
                .unwrap_or_else(|| DEFAULT_LANDING_ZONE_DIR.to_string())
                .into(),
            coingecko: CoinGeckoConfig {
                api_key: get(ENV_COINGECKO_API_KEY),
                base_url: get(ENV_COINGECKO_BASE_URL)
                    .unwrap_or_else(|| DEFAULT_COINGECKO_BASE_URL.to_string()),
                coin_ids,
            },
        })
    }
}

/// Assemble a Postgres URL from discrete settings. User and password are
/// percent-encoded, so any character is allowed in them.
fn postgres_url(
    user: &str,
    password: &str,
    host: &str,
    port: u16,
    database: &str,
) -> Result<String, ConfigError> {
    let invalid = |name: &'static str, value: &str| ConfigError::Invalid {
        name,
        value: value.to_string(),
    };

    let mut url = Url::parse("postgres://localhost/").map_err(|_| invalid(ENV_DB_HOST, host))?;
    url.set_host(Some(host)).map_err(|_| invalid(ENV_DB_HOST, host))?;
    url.set_port(Some(port)).map_err(|_| invalid(ENV_DB_PORT, &port.to_string()))?;
    url.set_username(user).map_err(|_| invalid(ENV_DB_USER, user))?;
    url.set_password(Some(password))
        .map_err(|_| invalid(ENV_DB_PASSWORD, "<redacted>"))?;
    url.path_segments_mut()
        .map_err(|_| invalid(ENV_DB_NAME, database))?
        .pop_if_empty()
        .push(database);

    Ok(url.into())
}
