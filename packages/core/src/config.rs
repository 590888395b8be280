use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub poll_interval_seconds: u64,
    pub poller_enabled: bool,
    pub send_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is required")?;

        let bind_addr =
            env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

        let poll_interval_seconds = match env::var("POLL_INTERVAL_SECONDS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| "POLL_INTERVAL_SECONDS must be a valid number")?,
            Err(_) => 1,
        };

        let poller_enabled = match env::var("POLLER_ENABLED") {
            Ok(raw) => match raw.as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                other => return Err(format!("Invalid POLLER_ENABLED: {}", other)),
            },
            Err(_) => false,
        };

        let send_timeout_ms = match env::var("SEND_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| "SEND_TIMEOUT_MS must be a valid number")?,
            Err(_) => 500,
        };

        Ok(Self {
            database_url,
            bind_addr,
            poll_interval_seconds,
            poller_enabled,
            send_timeout_ms,
        })
    }
}
