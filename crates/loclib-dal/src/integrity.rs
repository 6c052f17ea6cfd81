//! Referential integrity of the catalog
//!
//! Authors and genres cannot be deleted while any book references them,
//! books cannot be deleted while they have copies. Copies can always go.
//!
//! [`IntegrityChecker`] answers whether delete is possible (for confirmation
//! pages), the repositories' `delete_guarded` methods repeat the same check
//! inside the deleting transaction.

use serde::Serialize;
use sqlx::{Executor, Pool};
use std::{fmt::Display, time::Duration};

use crate::{
    ChosenDB, DEFAULT_TIMEOUT, book::BookShort, book_instance::BookInstance, error::Result, timed,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Author,
    Genre,
    Book,
    BookInstance,
}

impl EntityKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntityKind::Author => "author",
            EntityKind::Genre => "genre",
            EntityKind::Book => "book",
            EntityKind::BookInstance => "bookinstance",
        }
    }

    /// Canonical URL of entity detail
    pub fn url(&self, id: i64) -> String {
        format!("/catalog/{}/{}", self.path_segment(), id)
    }

    pub fn list_url(&self) -> String {
        format!("/catalog/{}s", self.path_segment())
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Author => "Author",
            EntityKind::Genre => "Genre",
            EntityKind::Book => "Book",
            EntityKind::BookInstance => "Book copy",
        };
        f.write_str(name)
    }
}

/// Result of checking whether an entity can be deleted
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteCheck<B> {
    Allowed,
    Blocked(Vec<B>),
}

impl<B> DeleteCheck<B> {
    pub fn from_blockers(blockers: Vec<B>) -> Self {
        if blockers.is_empty() {
            DeleteCheck::Allowed
        } else {
            DeleteCheck::Blocked(blockers)
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, DeleteCheck::Allowed)
    }

    pub fn blockers(&self) -> &[B] {
        match self {
            DeleteCheck::Allowed => &[],
            DeleteCheck::Blocked(blockers) => blockers,
        }
    }
}

/// Outcome of guarded delete, blocked delete is not an error
#[derive(Debug, Clone, PartialEq)]
pub enum Deletion<B> {
    Deleted,
    Blocked(Vec<B>),
}

pub type IntegrityChecker = IntegrityCheckerImpl<Pool<ChosenDB>>;

pub struct IntegrityCheckerImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> IntegrityCheckerImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB>,
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

    pub async fn can_delete_author(&self, id: i64) -> Result<DeleteCheck<BookShort>> {
        let blockers = timed(self.timeout, crate::book::list_by_author(id, &self.executor)).await?;
        Ok(DeleteCheck::from_blockers(blockers))
    }

    pub async fn can_delete_genre(&self, id: i64) -> Result<DeleteCheck<BookShort>> {
        let blockers = timed(self.timeout, crate::book::list_by_genre(id, &self.executor)).await?;
        Ok(DeleteCheck::from_blockers(blockers))
    }

    pub async fn can_delete_book(&self, id: i64) -> Result<DeleteCheck<BookInstance>> {
        let blockers = timed(
            self.timeout,
            crate::book_instance::list_by_book(id, &self.executor),
        )
        .await?;
        Ok(DeleteCheck::from_blockers(blockers))
    }
}
