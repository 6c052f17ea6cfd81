use futures::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    ChosenDB, DEFAULT_TIMEOUT, Error, ListingParams, Order,
    book::BookShort,
    error::Result,
    integrity::{Deletion, EntityKind},
    timed,
};

const VALID_ORDER_FIELDS: &[(&str, &str)] = &[("id", "id"), ("name", "name")];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreateGenre {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

impl Genre {
    pub fn url(&self) -> String {
        EntityKind::Genre.url(self.id)
    }
}

/// Key under which genre names are compared, case is folded for all scripts
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

pub type GenreRepository = GenreRepositoryImpl<sqlx::Pool<ChosenDB>>;

pub struct GenreRepositoryImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> GenreRepositoryImpl<E>
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

    pub async fn create(&self, payload: CreateGenre) -> Result<Genre> {
        timed(self.timeout, async {
            let result = sqlx::query("INSERT INTO genre (name, name_key) VALUES (?, ?)")
                .bind(&payload.name)
                .bind(name_key(&payload.name))
                .execute(&self.executor)
                .await?;

            let id = result.last_insert_rowid();
            debug!("Created genre {id}");
            get(id, &self.executor).await
        })
        .await
    }

    pub async fn update(&self, id: i64, payload: CreateGenre) -> Result<Genre> {
        timed(self.timeout, async {
            let result = sqlx::query("UPDATE genre SET name = ?, name_key = ? WHERE id = ?")
                .bind(&payload.name)
                .bind(name_key(&payload.name))
                .bind(id)
                .execute(&self.executor)
                .await?;

            if result.rows_affected() == 0 {
                return Err(Error::RecordNotFound(format!("Genre {id}")));
            }
            debug!("Updated genre {id}");
            get(id, &self.executor).await
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Genre> {
        timed(self.timeout, get(id, &self.executor)).await
    }

    /// Case insensitive lookup, used to keep genre names unique
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Genre>> {
        timed(self.timeout, async {
            let record = sqlx::query_as::<_, Genre>(
                "SELECT id, name FROM genre WHERE name_key = ? ORDER BY id LIMIT 1",
            )
            .bind(name_key(name))
            .fetch_optional(&self.executor)
            .await?;
            Ok::<_, Error>(record)
        })
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<Genre>> {
        self.list(ListingParams::default()).await
    }

    /// Sorted by name unless requested otherwise
    pub async fn list(&self, params: ListingParams) -> Result<Vec<Genre>> {
        let params = params.or_order(Order::Asc("name".to_string()));
        let order = params.order_by(VALID_ORDER_FIELDS)?;
        let sql = format!("SELECT id, name FROM genre {order} LIMIT ?");
        timed(self.timeout, async {
            let records = sqlx::query_as::<_, Genre>(&sql)
                .bind(params.limit())
                .fetch(&self.executor)
                .try_collect::<Vec<_>>()
                .await?;
            Ok::<_, Error>(records)
        })
        .await
    }

    pub async fn count(&self) -> Result<u64> {
        timed(self.timeout, async {
            let count: u64 = sqlx::query_scalar("SELECT count(*) FROM genre")
                .fetch_one(&self.executor)
                .await?;
            Ok::<_, Error>(count)
        })
        .await
    }

    /// Deletes genre only if no book is in it
    pub async fn delete_guarded(&self, id: i64) -> Result<Deletion<BookShort>> {
        timed(self.timeout, async {
            let mut transaction = self.executor.begin().await?;
            let blockers = crate::book::list_by_genre(id, &mut *transaction).await?;
            if !blockers.is_empty() {
                warn!(
                    "Genre {id} cannot be deleted, referenced by {} books",
                    blockers.len()
                );
                return Ok(Deletion::Blocked(blockers));
            }

            let res = sqlx::query("DELETE FROM genre WHERE id = ?")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            if res.rows_affected() == 0 {
                return Err(Error::RecordNotFound(format!("Genre {id}")));
            }
            transaction.commit().await?;
            debug!("Deleted genre {id}");
            Ok(Deletion::Deleted)
        })
        .await
    }
}

pub(crate) async fn get<'c, E>(id: i64, executor: E) -> Result<Genre>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_as::<_, Genre>("SELECT id, name FROM genre WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Genre {id}")))
}
