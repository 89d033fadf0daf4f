use std::env;
use std::time::Duration;

use crate::schemas::LOCAL_MEMBER;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    /// Uses MongoDB when set, the in-memory store otherwise.
    pub mongodb_uri: Option<String>,
    pub mongodb_db: String,
    pub local_member: String,
    pub simulated_latency: Duration,
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            mongodb_uri: None,
            mongodb_db: "OpenSplit".to_string(),
            local_member: LOCAL_MEMBER.to_string(),
            simulated_latency: Duration::ZERO,
            seed_demo: true,
        }
    }
}

fn flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "on" | "ON" | "yes")
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        Config {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            mongodb_uri: lookup("MONGODB_URI").filter(|v| !v.trim().is_empty()),
            mongodb_db: lookup("MONGODB_DB").unwrap_or(defaults.mongodb_db),
            local_member: lookup("LOCAL_MEMBER")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.local_member),
            simulated_latency: lookup("SIMULATED_LATENCY_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.simulated_latency),
            seed_demo: lookup("SEED_DEMO")
                .map(|v| flag(&v))
                .unwrap_or(defaults.seed_demo),
        }
    }
}
