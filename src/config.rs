use std::env;
use std::time::Duration;

/// Service configuration, defaults overridable through the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    /// How long an issued code stays valid.
    pub otp_ttl: Duration,
    /// Period of the background sweep over expired records.
    pub sweep_interval: Duration,
    /// Upper bound on a single email delivery attempt.
    pub delivery_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            otp_ttl: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            delivery_timeout: Duration::from_secs(10),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(port) = env::var("PORT") {
            config.bind_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(ttl) = env_secs("OTP_TTL_SECS") {
            config.otp_ttl = ttl;
        }
        if let Some(period) = env_secs("SWEEP_INTERVAL_SECS") {
            config.sweep_interval = period;
        }
        if let Some(timeout) = env_secs("DELIVERY_TIMEOUT_SECS") {
            config.delivery_timeout = timeout;
        }
        config
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key).ok()?.parse().ok().map(Duration::from_secs)
}
