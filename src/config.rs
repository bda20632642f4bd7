use std::{env, time::Duration};

use anyhow::Context;

use crate::checkout::{FanoutFailurePolicy, tracker::DEFAULT_POLL_INTERVAL};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub payment_gateway_url: Option<String>,
    pub payment_gateway_timeout: Duration,
    pub order_poll_interval: Duration,
    pub fanout_failure_policy: FanoutFailurePolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let payment_gateway_url = env::var("PAYMENT_GATEWAY_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let payment_gateway_timeout = env::var("PAYMENT_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));
        let order_poll_interval = env::var("ORDER_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let fanout_failure_policy = match env::var("FANOUT_FAILURE_POLICY") {
            Ok(value) => value
                .parse::<FanoutFailurePolicy>()
                .context("FANOUT_FAILURE_POLICY")?,
            Err(_) => FanoutFailurePolicy::default(),
        };
        Ok(Self {
            port,
            database_url,
            host,
            payment_gateway_url,
            payment_gateway_timeout,
            order_poll_interval,
            fanout_failure_policy,
        })
    }
}
