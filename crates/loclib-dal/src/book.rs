use futures::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Row as _, SqliteConnection};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    ChosenDB, ChosenRow, DEFAULT_TIMEOUT, Error, FromRowPrefixed, ListingParams, Order,
    author::AuthorShort,
    book_instance::BookInstance,
    error::Result,
    genre::Genre,
    integrity::{Deletion, EntityKind},
    timed,
};

const VALID_ORDER_FIELDS: &[(&str, &str)] = &[
    ("id", "b.id"),
    ("title", "b.title"),
    ("isbn", "b.isbn"),
    ("author", "a.family_name"),
];

const SELECT_SHORT: &str = r#"
SELECT b.id, b.title, b.summary,
a.id AS author_id, a.first_name AS author_first_name, a.family_name AS author_family_name
FROM book b
JOIN author a ON b.author_id = a.id
"#;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreateBook {
    pub title: String,
    pub author_id: i64,
    pub summary: String,
    pub isbn: String,
    pub genres: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author: AuthorShort,
    pub genres: Vec<Genre>,
}

impl Book {
    pub fn url(&self) -> String {
        EntityKind::Book.url(self.id)
    }
}

impl sqlx::FromRow<'_, ChosenRow> for Book {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Book {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            summary: row.try_get("summary")?,
            isbn: row.try_get("isbn")?,
            author: AuthorShort::from_row_prefixed(row, "author")?,
            genres: Vec::new(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookShort {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub author: AuthorShort,
}

impl BookShort {
    pub fn url(&self) -> String {
        EntityKind::Book.url(self.id)
    }
}

impl sqlx::FromRow<'_, ChosenRow> for BookShort {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(BookShort {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            summary: row.try_get("summary")?,
            author: AuthorShort::from_row_prefixed(row, "author")?,
        })
    }
}

/// Book as referenced from its copies
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookRef {
    pub id: i64,
    pub title: String,
}

impl BookRef {
    pub fn url(&self) -> String {
        EntityKind::Book.url(self.id)
    }
}

impl FromRowPrefixed for BookRef {
    fn from_row_prefixed(row: &ChosenRow, prefix: &str) -> Result<Self, sqlx::Error> {
        Ok(BookRef {
            id: row.try_get(format!("{prefix}_id").as_str())?,
            title: row.try_get(format!("{prefix}_title").as_str())?,
        })
    }
}

pub type BookRepository = BookRepositoryImpl<sqlx::Pool<ChosenDB>>;

pub struct BookRepositoryImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> BookRepositoryImpl<E>
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

    pub async fn create(&self, payload: CreateBook) -> Result<Book> {
        timed(self.timeout, async {
            let mut transaction = self.executor.begin().await?;
            let result = sqlx::query(
                "INSERT INTO book (title, author_id, summary, isbn) VALUES (?, ?, ?, ?)",
            )
            .bind(&payload.title)
            .bind(payload.author_id)
            .bind(&payload.summary)
            .bind(&payload.isbn)
            .execute(&mut *transaction)
            .await?;

            let id = result.last_insert_rowid();
            insert_genres(id, &payload.genres, &mut *transaction).await?;
            let record = get(id, &mut *transaction).await?;
            transaction.commit().await?;
            debug!("Created book {id}");
            Ok::<_, Error>(record)
        })
        .await
    }

    /// Replaces all mutable fields including whole genre set
    pub async fn update(&self, id: i64, payload: CreateBook) -> Result<Book> {
        timed(self.timeout, async {
            let mut transaction = self.executor.begin().await?;
            let result = sqlx::query(
                "UPDATE book SET title = ?, author_id = ?, summary = ?, isbn = ? WHERE id = ?",
            )
            .bind(&payload.title)
            .bind(payload.author_id)
            .bind(&payload.summary)
            .bind(&payload.isbn)
            .bind(id)
            .execute(&mut *transaction)
            .await?;

            if result.rows_affected() == 0 {
                return Err(Error::RecordNotFound(format!("Book {id}")));
            }

            sqlx::query("DELETE FROM book_genres WHERE book_id = ?")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            insert_genres(id, &payload.genres, &mut *transaction).await?;
            let record = get(id, &mut *transaction).await?;
            transaction.commit().await?;
            debug!("Updated book {id}");
            Ok(record)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        timed(self.timeout, async {
            let mut conn = self.executor.acquire().await?;
            get(id, &mut *conn).await
        })
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<BookShort>> {
        self.list(ListingParams::default()).await
    }

    /// Sorted by title unless requested otherwise
    pub async fn list(&self, params: ListingParams) -> Result<Vec<BookShort>> {
        let params = params.or_order(Order::Asc("title".to_string()));
        let order = params.order_by(VALID_ORDER_FIELDS)?;
        let sql = format!("{SELECT_SHORT} {order} LIMIT ?");
        timed(self.timeout, async {
            let records = sqlx::query_as::<_, BookShort>(&sql)
                .bind(params.limit())
                .fetch(&self.executor)
                .try_collect::<Vec<_>>()
                .await?;
            Ok::<_, Error>(records)
        })
        .await
    }

    pub async fn list_by_author(&self, author_id: i64) -> Result<Vec<BookShort>> {
        timed(self.timeout, list_by_author(author_id, &self.executor)).await
    }

    pub async fn list_by_genre(&self, genre_id: i64) -> Result<Vec<BookShort>> {
        timed(self.timeout, list_by_genre(genre_id, &self.executor)).await
    }

    pub async fn count(&self) -> Result<u64> {
        timed(self.timeout, async {
            let count: u64 = sqlx::query_scalar("SELECT count(*) FROM book")
                .fetch_one(&self.executor)
                .await?;
            Ok::<_, Error>(count)
        })
        .await
    }

    /// Deletes book only if it has no copies, genre links go with it
    pub async fn delete_guarded(&self, id: i64) -> Result<Deletion<BookInstance>> {
        timed(self.timeout, async {
            let mut transaction = self.executor.begin().await?;
            let blockers =
                crate::book_instance::list_by_book(id, &mut *transaction).await?;
            if !blockers.is_empty() {
                warn!(
                    "Book {id} cannot be deleted, it has {} copies",
                    blockers.len()
                );
                return Ok(Deletion::Blocked(blockers));
            }

            let res = sqlx::query("DELETE FROM book WHERE id = ?")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            if res.rows_affected() == 0 {
                return Err(Error::RecordNotFound(format!("Book {id}")));
            }
            transaction.commit().await?;
            debug!("Deleted book {id}");
            Ok(Deletion::Deleted)
        })
        .await
    }
}

async fn insert_genres(book_id: i64, genres: &[i64], conn: &mut SqliteConnection) -> Result<()> {
    let mut genres = genres.to_vec();
    genres.sort_unstable();
    genres.dedup();
    for genre_id in genres {
        sqlx::query("INSERT INTO book_genres (book_id, genre_id) VALUES (?, ?)")
            .bind(book_id)
            .bind(genre_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn get(id: i64, conn: &mut SqliteConnection) -> Result<Book> {
    const SQL: &str = r#"
    SELECT b.id, b.title, b.summary, b.isbn,
    a.id AS author_id, a.first_name AS author_first_name, a.family_name AS author_family_name
    FROM book b
    JOIN author a ON b.author_id = a.id
    WHERE b.id = ?
    "#;
    let mut book = sqlx::query_as::<_, Book>(SQL)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::RecordNotFound(format!("Book {id}")))?;

    book.genres = sqlx::query_as::<_, Genre>(
        "SELECT g.id, g.name FROM genre g JOIN book_genres bg ON bg.genre_id = g.id WHERE bg.book_id = ? ORDER BY g.name",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(book)
}

pub(crate) async fn list_by_author<'c, E>(author_id: i64, executor: E) -> Result<Vec<BookShort>>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let sql = format!("{SELECT_SHORT} WHERE b.author_id = ? ORDER BY b.title");
    let records = sqlx::query_as::<_, BookShort>(&sql)
        .bind(author_id)
        .fetch_all(executor)
        .await?;
    Ok(records)
}

pub(crate) async fn list_by_genre<'c, E>(genre_id: i64, executor: E) -> Result<Vec<BookShort>>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let sql = format!(
        "{SELECT_SHORT} JOIN book_genres bg ON bg.book_id = b.id WHERE bg.genre_id = ? ORDER BY b.title"
    );
    let records = sqlx::query_as::<_, BookShort>(&sql)
        .bind(genre_id)
        .fetch_all(executor)
        .await?;
    Ok(records)
}
