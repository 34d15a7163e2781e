// Service configuration, read from the environment (and an optional .env file):
// - database connection string
// - HTTP listen address/port
// - node base URL, connect timeout and TCP keepalive
// - supervisor retry delay
// - receivable amount floor and receive confirmation lifetime

use crate::models::Amount;
use crate::sync::receivable::DEFAULT_RECEIVED_TTL;
use dotenv::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub node_base_url: String,
    pub node_connect_timeout: Duration,
    pub node_tcp_keepalive: Duration,
    pub retry_delay: Duration,
    pub receivable_min_amount: Amount,
    pub received_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:monitor.db".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            node_base_url: "http://localhost:8081".to_string(),
            node_connect_timeout: Duration::from_secs(30),
            node_tcp_keepalive: Duration::from_secs(60),
            retry_delay: Duration::from_secs(10),
            receivable_min_amount: 1,
            received_ttl: DEFAULT_RECEIVED_TTL,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Config::default();

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let server_host = env::var("SERVER_HOST").unwrap_or(defaults.server_host);
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.server_port);
        let node_base_url = env::var("NODE_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.node_base_url);
        let node_connect_timeout = env::var("NODE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.node_connect_timeout);
        let node_tcp_keepalive = env::var("NODE_TCP_KEEPALIVE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.node_tcp_keepalive);
        let retry_delay = env::var("RETRY_DELAY_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.retry_delay);
        let receivable_min_amount = env::var("RECEIVABLE_MIN_AMOUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.receivable_min_amount);
        let received_ttl = env::var("RECEIVED_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.received_ttl);

        Self {
            database_url,
            server_host,
            server_port,
            node_base_url,
            node_connect_timeout,
            node_tcp_keepalive,
            retry_delay,
            receivable_min_amount,
            received_ttl,
        }
    }
}
