use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("GUESTCHAT_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("GUESTCHAT_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("GUESTCHAT_PORT must be a port number")?;
        let db_path: PathBuf = get("GUESTCHAT_DB_PATH")
            .unwrap_or_else(|| "guestchat.db".into())
            .into();
        let sweep_secs: u64 = get("GUESTCHAT_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|| "60".into())
            .parse()
            .context("GUESTCHAT_SWEEP_INTERVAL_SECS must be a whole number of seconds")?;
        if sweep_secs == 0 {
            bail!("GUESTCHAT_SWEEP_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            host,
            port,
            db_path,
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}
