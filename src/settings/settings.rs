use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    pub session: Session,
    pub store: Store,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub min_username_len: usize,
    pub min_password_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Http {
    pub address: String,
    // plain HTTP unless both are set
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Clone, Deserialize)]
pub struct Store {
    pub backend: StoreBackend,
    pub mysql_dsn: Option<String>,
    pub lock_wait_timeout_secs: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Redis,
    Memory,
}

#[derive(Clone, Deserialize)]
pub struct Session {
    pub backend: SessionBackend,
    pub redis_dsn: Option<String>,
    pub key_prefix: String,
}

/// Drops the user-info part of a connection string, so settings can be
/// logged.
fn redact_dsn(dsn: &str) -> String {
    match (dsn.find("://"), dsn.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &dsn[..scheme_end], &dsn[at..])
        }
        _ => dsn.to_owned(),
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("mysql_dsn", &self.mysql_dsn.as_deref().map(redact_dsn))
            .field("lock_wait_timeout_secs", &self.lock_wait_timeout_secs)
            .finish()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("redis_dsn", &self.redis_dsn.as_deref().map(redact_dsn))
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the TOML file, then applies `RAPPORT__<SECTION>__<KEY>` environment
/// overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("RAPPORT")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

impl Settings {
    /// Everything in process memory, plain HTTP on a loopback port.
    pub fn in_memory() -> Self {
        Settings {
            auth: Auth {
                issuer: "rapport.auth".to_owned(),
                audience: "rapport-client".to_owned(),
                access_ttl_secs: 15 * 60,
                refresh_ttl_secs: 7 * 24 * 60 * 60,
                min_username_len: 3,
                min_password_len: 8,
            },
            http: Http {
                address: "127.0.0.1:8080".to_owned(),
                cert_path: None,
                key_path: None,
            },
            log: Log {
                filter: "info".to_owned(),
            },
            session: Session {
                backend: SessionBackend::Memory,
                redis_dsn: None,
                key_prefix: "rapport:auth".to_owned(),
            },
            store: Store {
                backend: StoreBackend::Memory,
                mysql_dsn: None,
                lock_wait_timeout_secs: None,
            },
        }
    }
}
