//! Server configuration.
//!
//! Everything is read from environment variables (with `.env` support via `dotenvy` in `main`). Missing values fall
//! back to documented defaults, with a log line explaining what happened.
use std::env;

use log::*;
use mpg_common::{helpers::parse_boolean_flag, Secret};
use rand::{distributions::Alphanumeric, Rng};

const DEFAULT_MPS_HOST: &str = "127.0.0.1";
const DEFAULT_MPS_PORT: u16 = 8470;
const DEFAULT_COMMISSION_RATE: f64 = 0.10;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub webhook: WebhookConfig,
    /// The platform commission, as a fraction of the sub-order total (0.10 = 10%).
    pub commission_rate: f64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        // An ephemeral secret keeps a misconfigured server from issuing tokens that survive a restart.
        let secret: String = rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, String> {
        let secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET is not set".to_string())?;
        if secret.trim().is_empty() {
            return Err("JWT_SECRET is empty".to_string());
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}

#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    /// Shared secret for the courier webhook HMAC signature.
    pub hmac_secret: Secret<String>,
    /// If false, the webhook HMAC check is skipped entirely. Only ever disable this in tests.
    pub hmac_checks: bool,
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("HEXALOG_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ HEXALOG_WEBHOOK_SECRET is not set. Please set it to the shared secret for the Hexalog webhook."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("MPS_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are disabled. Any caller can post courier events. Never do this in production.");
        }
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MPS_HOST.to_string(),
            port: DEFAULT_MPS_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            webhook: WebhookConfig::default(),
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MPS_HOST").ok().unwrap_or_else(|| DEFAULT_MPS_HOST.into());
        let port = env::var("MPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MPS_PORT. {e} Using the default, {DEFAULT_MPS_PORT}, instead."
                    );
                    DEFAULT_MPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MPS_PORT);
        let database_url = env::var("MPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MPS_DATABASE_URL is not set. Please set it to the URL for the settlement database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!("🪛️ Could not load the JWT secret from the environment. {e}. Using an ephemeral secret instead.");
            AuthConfig::default()
        });
        let webhook = WebhookConfig::from_env_or_default();
        let commission_rate = env::var("MPS_COMMISSION_RATE")
            .ok()
            .and_then(|s| {
                s.parse::<f64>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid value for MPS_COMMISSION_RATE. {e}");
                        e
                    })
                    .ok()
            })
            .filter(|r| (0.0..1.0).contains(r))
            .unwrap_or_else(|| {
                info!("🪛️ Using the default commission rate of {DEFAULT_COMMISSION_RATE}.");
                DEFAULT_COMMISSION_RATE
            });
        Self { host, port, database_url, auth, webhook, commission_rate }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_auth_config_has_a_nonempty_secret() {
        let config = AuthConfig::default();
        assert_eq!(config.jwt_secret.reveal().len(), 48);
    }

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_MPS_PORT);
        assert!((config.commission_rate - 0.10).abs() < f64::EPSILON);
    }
}
