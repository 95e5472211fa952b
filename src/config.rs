use std::env;

/// SLA thresholds applied to tickets whose category does not define its own.
#[derive(Clone, Copy, Debug)]
pub struct SlaDefaults {
    pub response_hours: f64,
    pub resolution_hours: f64,
}

impl Default for SlaDefaults {
    fn default() -> Self {
        Self {
            response_hours: 8.0,
            resolution_hours: 48.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub sla_defaults: SlaDefaults,
    pub scan_interval_secs: u64,
    pub lock_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let response_hours = env::var("SLA_DEFAULT_RESPONSE_HOURS")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidSlaHours("SLA_DEFAULT_RESPONSE_HOURS"))?;

        let resolution_hours = env::var("SLA_DEFAULT_RESOLUTION_HOURS")
            .unwrap_or_else(|_| "48".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidSlaHours("SLA_DEFAULT_RESOLUTION_HOURS"))?;

        let scan_interval_secs = env::var("SLA_SCAN_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let lock_ttl_secs = env::var("TICKET_LOCK_TTL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        Ok(Config {
            sla_defaults: SlaDefaults {
                response_hours,
                resolution_hours,
            },
            scan_interval_secs,
            lock_ttl_secs,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sla_defaults: SlaDefaults::default(),
            scan_interval_secs: 300,
            lock_ttl_secs: 30,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be a number of hours")]
    InvalidSlaHours(&'static str),
}
