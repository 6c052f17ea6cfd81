use std::{path::PathBuf, time::Duration};

use crate::error::Result;
pub use clap::Parser;
use loclib_dal::StorageConfig;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "LOCLIB_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "LOCLIB_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "LOCLIB_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/loclib.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "LOCLIB_DATA_DIR",
        help = "Data directory for catalog database, default is system default like ~/.local/share/loclib",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "LOCLIB_MAX_CONNECTIONS",
        default_value_t = 50,
        help = "Maximum number of database connections"
    )]
    pub max_connections: u32,

    #[arg(
        long,
        env = "LOCLIB_STORAGE_TIMEOUT",
        default_value = "5s",
        help = "Limit for single storage operation in human friendly format (e.g. 5s, 500ms)",
        value_parser = humantime::parse_duration
    )]
    pub storage_timeout: Duration,

    #[arg(
        long,
        env = "LOCLIB_SITE_NAME",
        default_value = "Local Library",
        help = "Name of the library shown in pages"
    )]
    pub site_name: String,

    #[arg(
        long,
        env = "LOCLIB_STATIC_DIR",
        help = "Directory with static files (styles, images) served under /static"
    )]
    pub static_dir: Option<PathBuf>,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("loclib"))
        .unwrap_or_else(|| PathBuf::from("loclib"))
        .to_string_lossy()
        .to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/loclib.db", self.data_dir))
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig::new(self.database_url())
            .with_max_connections(self.max_connections)
            .with_timeout(self.storage_timeout)
    }

    /// URL where server can be reached
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&format!("http://{}:{}/", self.listen_address, self.port))?;
        Ok(url)
    }
}
