use futures::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Row as _};
use std::time::Duration;
use time::Date;
use tracing::{debug, warn};

use crate::{
    ChosenDB, ChosenRow, DEFAULT_TIMEOUT, Error, FromRowPrefixed, ListingParams, Order,
    book::BookShort,
    error::Result,
    integrity::{Deletion, EntityKind},
    timed,
};

const VALID_ORDER_FIELDS: &[(&str, &str)] = &[
    ("id", "id"),
    ("first_name", "first_name"),
    ("family_name", "family_name"),
    ("date_of_birth", "date_of_birth"),
    ("date_of_death", "date_of_death"),
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreateAuthor {
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<Date>,
    pub date_of_death: Option<Date>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<Date>,
    pub date_of_death: Option<Date>,
}

impl Author {
    pub fn name(&self) -> String {
        display_name(&self.first_name, &self.family_name)
    }

    /// Age at death in years, unknown unless both dates are known
    pub fn lifespan(&self) -> Option<i32> {
        match (self.date_of_birth, self.date_of_death) {
            (Some(birth), Some(death)) => Some(death.year() - birth.year()),
            _ => None,
        }
    }

    pub fn url(&self) -> String {
        EntityKind::Author.url(self.id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct AuthorShort {
    pub id: i64,
    pub first_name: String,
    pub family_name: String,
}

impl AuthorShort {
    pub fn name(&self) -> String {
        display_name(&self.first_name, &self.family_name)
    }

    pub fn url(&self) -> String {
        EntityKind::Author.url(self.id)
    }
}

impl FromRowPrefixed for AuthorShort {
    fn from_row_prefixed(row: &ChosenRow, prefix: &str) -> Result<Self, sqlx::Error> {
        Ok(AuthorShort {
            id: row.try_get(format!("{prefix}_id").as_str())?,
            first_name: row.try_get(format!("{prefix}_first_name").as_str())?,
            family_name: row.try_get(format!("{prefix}_family_name").as_str())?,
        })
    }
}

fn is_cjk(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| ('\u{4e00}'..='\u{9fa5}').contains(&c))
}

/// Chinese names are written given name first without separator,
/// others as "family, first"
pub fn display_name(first_name: &str, family_name: &str) -> String {
    if is_cjk(first_name) && is_cjk(family_name) {
        format!("{first_name}{family_name}")
    } else {
        format!("{family_name}, {first_name}")
    }
}

pub type AuthorRepository = AuthorRepositoryImpl<sqlx::Pool<ChosenDB>>;

pub struct AuthorRepositoryImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> AuthorRepositoryImpl<E>
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

    pub async fn create(&self, payload: CreateAuthor) -> Result<Author> {
        timed(self.timeout, async {
            let result = sqlx::query(
                "INSERT INTO author (first_name, family_name, date_of_birth, date_of_death) VALUES (?, ?, ?, ?)",
            )
            .bind(&payload.first_name)
            .bind(&payload.family_name)
            .bind(payload.date_of_birth)
            .bind(payload.date_of_death)
            .execute(&self.executor)
            .await?;

            let id = result.last_insert_rowid();
            debug!("Created author {id}");
            get(id, &self.executor).await
        })
        .await
    }

    pub async fn update(&self, id: i64, payload: CreateAuthor) -> Result<Author> {
        timed(self.timeout, async {
            let mut transaction = self.executor.begin().await?;
            let result = sqlx::query(
                "UPDATE author SET first_name = ?, family_name = ?, date_of_birth = ?, date_of_death = ? WHERE id = ?",
            )
            .bind(&payload.first_name)
            .bind(&payload.family_name)
            .bind(payload.date_of_birth)
            .bind(payload.date_of_death)
            .bind(id)
            .execute(&mut *transaction)
            .await?;

            if result.rows_affected() == 0 {
                return Err(Error::RecordNotFound(format!("Author {id}")));
            }
            let record = get(id, &mut *transaction).await?;
            transaction.commit().await?;
            debug!("Updated author {id}");
            Ok(record)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Author> {
        timed(self.timeout, get(id, &self.executor)).await
    }

    pub async fn list_all(&self) -> Result<Vec<Author>> {
        self.list(ListingParams::default()).await
    }

    /// Sorted by family name unless requested otherwise
    pub async fn list(&self, params: ListingParams) -> Result<Vec<Author>> {
        let params = params.or_order(Order::Asc("family_name".to_string()));
        let order = params.order_by(VALID_ORDER_FIELDS)?;
        let sql = format!(
            "SELECT id, first_name, family_name, date_of_birth, date_of_death FROM author {order} LIMIT ?"
        );
        timed(self.timeout, async {
            let records = sqlx::query_as::<_, Author>(&sql)
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
            let count: u64 = sqlx::query_scalar("SELECT count(*) FROM author")
                .fetch_one(&self.executor)
                .await?;
            Ok::<_, Error>(count)
        })
        .await
    }

    /// Deletes author only if no book references it, the check and the delete
    /// share one transaction
    pub async fn delete_guarded(&self, id: i64) -> Result<Deletion<BookShort>> {
        timed(self.timeout, async {
            let mut transaction = self.executor.begin().await?;
            let blockers = crate::book::list_by_author(id, &mut *transaction).await?;
            if !blockers.is_empty() {
                warn!(
                    "Author {id} cannot be deleted, referenced by {} books",
                    blockers.len()
                );
                return Ok(Deletion::Blocked(blockers));
            }

            let res = sqlx::query("DELETE FROM author WHERE id = ?")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            if res.rows_affected() == 0 {
                return Err(Error::RecordNotFound(format!("Author {id}")));
            }
            transaction.commit().await?;
            debug!("Deleted author {id}");
            Ok(Deletion::Deleted)
        })
        .await
    }
}

pub(crate) async fn get<'c, E>(id: i64, executor: E) -> Result<Author>
where
    E: Executor<'c, Database = ChosenDB>,
{
    sqlx::query_as::<_, Author>(
        "SELECT id, first_name, family_name, date_of_birth, date_of_death FROM author WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::RecordNotFound(format!("Author {id}")))
}
