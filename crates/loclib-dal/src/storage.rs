use std::{str::FromStr as _, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info};

use crate::{
    DEFAULT_TIMEOUT, Pool,
    author::AuthorRepository,
    book::BookRepository,
    book_instance::BookInstanceRepository,
    error::Result,
    genre::GenreRepository,
    integrity::IntegrityChecker,
};

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub timeout: Duration,
}

impl StorageConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 50,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    fn is_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

pub async fn new_pool(config: &StorageConfig) -> Result<Pool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = SqlitePoolOptions::new().acquire_timeout(config.timeout);
    // every connection to memory database is a new database, so keep just one forever
    let pool_options = if config.is_memory() {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(config.max_connections)
    };

    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}

/// Long lived handle to catalog storage
///
/// Opened once at process start and passed explicitly to whoever needs it,
/// [`Storage::close`] should be called on shutdown.
#[derive(Clone)]
pub struct Storage {
    pool: Pool,
    timeout: Duration,
}

impl Storage {
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let pool = new_pool(config).await?;
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Opened catalog storage");
        Ok(Self::from_pool(pool, config.timeout))
    }

    pub fn from_pool(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub async fn close(&self) {
        debug!("Closing catalog storage");
        self.pool.close().await
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn authors(&self) -> AuthorRepository {
        AuthorRepository::new(self.pool.clone()).with_timeout(self.timeout)
    }

    pub fn genres(&self) -> GenreRepository {
        GenreRepository::new(self.pool.clone()).with_timeout(self.timeout)
    }

    pub fn books(&self) -> BookRepository {
        BookRepository::new(self.pool.clone()).with_timeout(self.timeout)
    }

    pub fn book_instances(&self) -> BookInstanceRepository {
        BookInstanceRepository::new(self.pool.clone()).with_timeout(self.timeout)
    }

    pub fn integrity(&self) -> IntegrityChecker {
        IntegrityChecker::new(self.pool.clone()).with_timeout(self.timeout)
    }
}
