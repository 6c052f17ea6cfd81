pub mod author;
pub mod book;
pub mod book_instance;
pub mod dashboard;
pub mod detail;
pub mod error;
pub mod genre;
pub mod integrity;
pub mod storage;

use std::{fmt::Display, future::Future, time::Duration};

pub use error::Error;
pub use sqlx::Error as SqlxError;
pub use storage::{Storage, StorageConfig};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

pub const MAX_LIMIT: usize = 10_000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds nested record from joined columns named `{prefix}_{column}`
pub trait FromRowPrefixed: Sized {
    fn from_row_prefixed(row: &ChosenRow, prefix: &str) -> Result<Self, sqlx::Error>;
}

/// Bounds storage operation, expiry is reported as transient [`Error::Timeout`]
pub(crate) async fn timed<T, F>(limit: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!("Storage operation did not finish in {limit:?}");
            Err(Error::Timeout(limit))
        }
    }
}

#[derive(Debug, Clone)]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Order::Asc(s) => write!(f, "{}", s),
            Order::Desc(s) => write!(f, "{} DESC", s),
        }
    }
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        match self {
            Order::Asc(s) => s.as_str(),
            Order::Desc(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingParams {
    pub limit: i64,
    pub order: Option<Vec<Order>>,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            limit: MAX_LIMIT as i64,
            order: None,
        }
    }
}

impl ListingParams {
    pub fn new(limit: i64) -> Self {
        Self { limit, order: None }
    }

    pub fn with_order(mut self, order: Vec<Order>) -> Self {
        self.order = Some(order);
        self
    }

    /// Sets order only if none was requested
    pub fn or_order(mut self, order: Order) -> Self {
        if self.order.as_ref().is_none_or(|o| o.is_empty()) {
            self.order = Some(vec![order]);
        }
        self
    }

    /// ORDER BY clause, `valid_fields` maps public field names to SQL columns
    pub fn order_by(&self, valid_fields: &[(&str, &str)]) -> Result<String> {
        let ordering = self
            .order
            .as_ref()
            .map(|o| {
                o.iter()
                    .map(|o| {
                        valid_fields
                            .iter()
                            .find(|(name, _)| *name == o.as_ref())
                            .map(|(_, column)| match o {
                                Order::Asc(_) => column.to_string(),
                                Order::Desc(_) => format!("{column} DESC"),
                            })
                            .ok_or_else(|| Error::InvalidOrderByField(o.as_ref().to_string()))
                    })
                    .collect::<Result<Vec<String>>>()
                    .map(|o| o.join(", "))
            })
            .transpose()?
            .filter(|o| !o.is_empty())
            .map(|o| format!("ORDER BY {o}"))
            .unwrap_or_default();
        Ok(ordering)
    }

    pub(crate) fn limit(&self) -> i64 {
        self.limit.clamp(0, MAX_LIMIT as i64)
    }
}
