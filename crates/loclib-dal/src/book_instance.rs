use futures::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Row as _};
use std::{fmt::Display, str::FromStr, time::Duration};
use time::Date;
use tracing::debug;

use crate::{
    ChosenDB, ChosenRow, DEFAULT_TIMEOUT, Error, FromRowPrefixed, ListingParams, Order,
    book::BookRef,
    error::Result,
    integrity::EntityKind,
    timed,
};

const VALID_ORDER_FIELDS: &[(&str, &str)] = &[
    ("id", "i.id"),
    ("imprint", "i.imprint"),
    ("status", "i.status"),
    ("due_back", "i.due_back"),
    ("book", "b.title"),
];

const SELECT: &str = r#"
SELECT i.id, i.imprint, i.status, i.due_back, b.id AS book_id, b.title AS book_title
FROM book_instance i
JOIN book b ON i.book_id = b.id
"#;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstanceStatus {
    Available,
    #[default]
    Maintenance,
    Loaned,
    Reserved,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 4] = [
        InstanceStatus::Available,
        InstanceStatus::Maintenance,
        InstanceStatus::Loaned,
        InstanceStatus::Reserved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Available => "Available",
            InstanceStatus::Maintenance => "Maintenance",
            InstanceStatus::Loaned => "Loaned",
            InstanceStatus::Reserved => "Reserved",
        }
    }
}

impl Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid book copy status: {0}")]
pub struct InvalidStatus(String);

impl FromStr for InstanceStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        InstanceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreateBookInstance {
    pub book_id: i64,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: Date,
}

/// Physical copy of a book
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookInstance {
    pub id: i64,
    pub book: BookRef,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: Date,
}

impl BookInstance {
    pub fn url(&self) -> String {
        EntityKind::BookInstance.url(self.id)
    }
}

impl sqlx::FromRow<'_, ChosenRow> for BookInstance {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status.parse().map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: Box::new(e),
        })?;
        Ok(BookInstance {
            id: row.try_get("id")?,
            book: BookRef::from_row_prefixed(row, "book")?,
            imprint: row.try_get("imprint")?,
            status,
            due_back: row.try_get("due_back")?,
        })
    }
}

pub type BookInstanceRepository = BookInstanceRepositoryImpl<sqlx::Pool<ChosenDB>>;

pub struct BookInstanceRepositoryImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> BookInstanceRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn create(&self, payload: CreateBookInstance) -> Result<BookInstance> {
        timed(self.timeout, async {
            let result = sqlx::query(
                "INSERT INTO book_instance (book_id, imprint, status, due_back) VALUES (?, ?, ?, ?)",
            )
            .bind(payload.book_id)
            .bind(&payload.imprint)
            .bind(payload.status.as_str())
            .bind(payload.due_back)
            .execute(&self.executor)
            .await?;

            let id = result.last_insert_rowid();
            debug!("Created book copy {id}");
            get(id, &self.executor).await
        })
        .await
    }

    pub async fn update(&self, id: i64, payload: CreateBookInstance) -> Result<BookInstance> {
        timed(self.timeout, async {
            let result = sqlx::query(
                "UPDATE book_instance SET book_id = ?, imprint = ?, status = ?, due_back = ? WHERE id = ?",
            )
            .bind(payload.book_id)
            .bind(&payload.imprint)
            .bind(payload.status.as_str())
            .bind(payload.due_back)
            .bind(id)
            .execute(&self.executor)
            .await?;

            if result.rows_affected() == 0 {
                return Err(Error::RecordNotFound(format!("Book copy {id}")));
            }
            debug!("Updated book copy {id}");
            get(id, &self.executor).await
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<BookInstance> {
        timed(self.timeout, get(id, &self.executor)).await
    }

    pub async fn list_all(&self) -> Result<Vec<BookInstance>> {
        self.list(ListingParams::default()).await
    }

    pub async fn list(&self, params: ListingParams) -> Result<Vec<BookInstance>> {
        let params = params.or_order(Order::Asc("id".to_string()));
        let order = params.order_by(VALID_ORDER_FIELDS)?;
        let sql = format!("{SELECT} {order} LIMIT ?");
        timed(self.timeout, async {
            let records = sqlx::query_as::<_, BookInstance>(&sql)
                .bind(params.limit())
                .fetch(&self.executor)
                .try_collect::<Vec<_>>()
                .await?;
            Ok::<_, Error>(records)
        })
        .await
    }

    pub async fn list_by_book(&self, book_id: i64) -> Result<Vec<BookInstance>> {
        timed(self.timeout, list_by_book(book_id, &self.executor)).await
    }

    pub async fn count(&self) -> Result<u64> {
        timed(self.timeout, async {
            let count: u64 = sqlx::query_scalar("SELECT count(*) FROM book_instance")
                .fetch_one(&self.executor)
                .await?;
            Ok::<_, Error>(count)
        })
        .await
    }

    pub async fn count_by_status(&self, status: InstanceStatus) -> Result<u64> {
        timed(self.timeout, async {
            let count: u64 =
                sqlx::query_scalar("SELECT count(*) FROM book_instance WHERE status = ?")
                    .bind(status.as_str())
                    .fetch_one(&self.executor)
                    .await?;
            Ok::<_, Error>(count)
        })
        .await
    }

    /// Copies are not referenced by anything, so they can always be deleted
    pub async fn delete(&self, id: i64) -> Result<()> {
        timed(self.timeout, async {
            let res = sqlx::query("DELETE FROM book_instance WHERE id = ?")
                .bind(id)
                .execute(&self.executor)
                .await?;

            if res.rows_affected() == 0 {
                Err(Error::RecordNotFound(format!("Book copy {id}")))
            } else {
                debug!("Deleted book copy {id}");
                Ok(())
            }
        })
        .await
    }
}

pub(crate) async fn get<'c, E>(id: i64, executor: E) -> Result<BookInstance>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let sql = format!("{SELECT} WHERE i.id = ?");
    sqlx::query_as::<_, BookInstance>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Book copy {id}")))
}

pub(crate) async fn list_by_book<'c, E>(book_id: i64, executor: E) -> Result<Vec<BookInstance>>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let sql = format!("{SELECT} WHERE i.book_id = ? ORDER BY i.id");
    let records = sqlx::query_as::<_, BookInstance>(&sql)
        .bind(book_id)
        .fetch_all(executor)
        .await?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        for status in InstanceStatus::ALL {
            assert_eq!(status, status.as_str().parse().unwrap());
        }
        assert!("available".parse::<InstanceStatus>().is_err());
        assert_eq!(InstanceStatus::Maintenance, InstanceStatus::default());
    }
}
