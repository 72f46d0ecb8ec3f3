use crate::credentials::ApiCredentials;
use crate::signer::SignerConfig;
use anyhow::{Context, Result};
use std::path::Path;

pub const DEFAULT_ENV_FILE: &str = "local.env";
pub const DEFAULT_API_HOST: &str = "http://api.velocityweather.com/v1";

/// Names of the environment variables `Config` is read from.
#[derive(Debug, Clone, Copy)]
pub struct EnvVars {
    pub key: &'static str,
    pub secret: &'static str,
    pub host: &'static str,
    pub strip_padding: &'static str,
    pub http_timeout: &'static str,
    pub max_clock_skew: &'static str,
}

pub const ENV_VARS: EnvVars = EnvVars {
    key: "BARON_KEY",
    secret: "BARON_SECRET",
    host: "BARON_HOST",
    strip_padding: "BARON_STRIP_PADDING",
    http_timeout: "HTTP_TIMEOUT_SECS",
    max_clock_skew: "MAX_CLOCK_SKEW_SECS",
};

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: ApiCredentials,
    pub api_host: String,
    pub strip_padding: bool,
    pub http_timeout_secs: u64,
    pub max_clock_skew_secs: u64,
}

impl Config {
    /// Load config from a specific .env file, or `local.env` / `.env` if None.
    pub fn from_env_file(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                dotenvy::from_filename(p).with_context(|| format!("Cannot read config file {p}"))?;
            }
            None if Path::new(DEFAULT_ENV_FILE).exists() => {
                dotenvy::from_filename(DEFAULT_ENV_FILE).ok();
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::build_from_env(&ENV_VARS)
    }

    fn build_from_env(vars: &EnvVars) -> Result<Self> {
        let credentials = ApiCredentials::from_env(vars.key, vars.secret).with_context(|| {
            format!(
                "{} and {} must be set (environment or local.env)",
                vars.key, vars.secret
            )
        })?;

        let http_timeout_secs: u64 = env_parse(vars.http_timeout, "30")?;
        if http_timeout_secs == 0 {
            anyhow::bail!("{} must be greater than 0", vars.http_timeout);
        }

        Ok(Self {
            credentials,
            api_host: env(vars.host, DEFAULT_API_HOST),
            strip_padding: env_bool(vars.strip_padding, "false")?,
            http_timeout_secs,
            max_clock_skew_secs: env_parse(vars.max_clock_skew, "300")?,
        })
    }

    pub fn signer_config(&self) -> SignerConfig {
        SignerConfig {
            strip_padding: self.strip_padding,
        }
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let val = env(key, default);
    val.trim()
        .parse()
        .with_context(|| format!("Invalid value for {key}: {val}"))
}

fn env_bool(key: &str, default: &str) -> Result<bool> {
    parse_bool(&env(key, default)).with_context(|| format!("{key} must be true or false"))
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
