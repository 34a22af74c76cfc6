use anyhow::Context;

const DEFAULT_KV_URL: &str = "ws://127.0.0.1:50000/kv";

/// Where chirp state is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// In-process map; state is lost on exit.
    Memory,
    /// A `chirp-kv-server` WebSocket endpoint.
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageTarget,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("CHIRP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("CHIRP_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("CHIRP_PORT is not a port number")?;

        let storage = match lookup("CHIRP_KV_URL") {
            Some(url) if url.eq_ignore_ascii_case("memory") => StorageTarget::Memory,
            Some(url) => StorageTarget::Remote(url),
            None => StorageTarget::Remote(DEFAULT_KV_URL.into()),
        };

        Ok(Self { host, port, storage })
    }
}
