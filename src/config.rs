//! Startup configuration, read once from the environment.

use std::str::FromStr;
use std::time::Duration;

use crate::content::Strategy;
use crate::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SETTLE_MS: u64 = 1500;
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DESCRIPTION_POINTER: &str = "/description";

/// Credentials and endpoint for the authenticated job API.
#[derive(Debug, Clone)]
pub struct CookieApiConfig {
    /// URL template; `{job_key}` is replaced per request.
    pub endpoint: String,
    pub token: String,
    pub cookie: Option<String>,
    /// JSON pointer to the description text in the response.
    pub description_pointer: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub strategies: Vec<Strategy>,
    pub timeout: Duration,
    pub user_agent: String,
    pub proxies: Vec<String>,
    pub spider_api_key: Option<String>,
    pub api: Option<CookieApiConfig>,
    pub settle: Duration,
    pub port: u16,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let strategies = match get("JOBDESC_STRATEGIES") {
            Some(list) => parse_strategies(&list)?,
            None => vec![Strategy::Static],
        };

        let api = match (get("JOBDESC_API_URL"), get("JOBDESC_API_TOKEN")) {
            (Some(endpoint), Some(token)) => Some(CookieApiConfig {
                endpoint,
                token,
                cookie: get("JOBDESC_API_COOKIE"),
                description_pointer: get("JOBDESC_API_DESCRIPTION_POINTER")
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION_POINTER.to_string()),
            }),
            _ => None,
        };

        let config = Config {
            strategies,
            timeout: Duration::from_secs(parse_number(
                "JOBDESC_TIMEOUT_SECS",
                get("JOBDESC_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
            user_agent: get("JOBDESC_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            proxies: get("JOBDESC_PROXIES")
                .map(|list| split_list(&list).map(str::to_string).collect())
                .unwrap_or_default(),
            spider_api_key: get("SPIDER_API_KEY"),
            api,
            settle: Duration::from_millis(parse_number(
                "JOBDESC_SETTLE_MS",
                get("JOBDESC_SETTLE_MS"),
                DEFAULT_SETTLE_MS,
            )?),
            port: parse_number("PORT", get("PORT"), DEFAULT_PORT)?,
        };
        config.validate(&lookup)?;
        Ok(config)
    }

    /// Replace the strategy chain, re-checking credentials for the new one.
    pub fn with_strategies(mut self, list: &str) -> Result<Self, ConfigError> {
        self.strategies = parse_strategies(list)?;
        self.check_credentials()?;
        Ok(self)
    }

    fn validate<F>(&self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "JOBDESC_TIMEOUT_SECS",
                message: "must be greater than zero".into(),
            });
        }
        if self.strategies.contains(&Strategy::CookieApi) && self.api.is_none() {
            // Name whichever half of the pair is absent.
            let key = if lookup("JOBDESC_API_URL").map_or(true, |v| v.trim().is_empty()) {
                "JOBDESC_API_URL"
            } else {
                "JOBDESC_API_TOKEN"
            };
            return Err(ConfigError::MissingKey {
                key,
                strategy: Strategy::CookieApi,
            });
        }
        self.check_credentials()
    }

    fn check_credentials(&self) -> Result<(), ConfigError> {
        for strategy in &self.strategies {
            match strategy {
                Strategy::ProxyRendered if self.spider_api_key.is_none() => {
                    return Err(ConfigError::MissingKey {
                        key: "SPIDER_API_KEY",
                        strategy: *strategy,
                    })
                }
                Strategy::CookieApi if self.api.is_none() => {
                    return Err(ConfigError::MissingKey {
                        key: "JOBDESC_API_URL",
                        strategy: *strategy,
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_strategies(list: &str) -> Result<Vec<Strategy>, ConfigError> {
    let mut strategies = Vec::new();
    for name in split_list(list) {
        let strategy = Strategy::from_str(name)?;
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }
    if strategies.is_empty() {
        return Err(ConfigError::Invalid {
            key: "JOBDESC_STRATEGIES",
            message: "no strategies listed".into(),
        });
    }
    Ok(strategies)
}

fn parse_number<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}
