use serde::Serialize;

use crate::{Storage, book_instance::InstanceStatus, error::Result};

/// Catalog totals for the home page.
///
/// Counts are read concurrently, each one reflects the moment of its own
/// query, there is no common snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub books: u64,
    pub book_instances: u64,
    pub available_book_instances: u64,
    pub authors: u64,
    pub genres: u64,
}

pub async fn dashboard_counts(storage: &Storage) -> Result<DashboardCounts> {
    let books = storage.books();
    let instances = storage.book_instances();
    let authors = storage.authors();
    let genres = storage.genres();

    let (books, book_instances, available_book_instances, authors, genres) = tokio::try_join!(
        books.count(),
        instances.count(),
        instances.count_by_status(InstanceStatus::Available),
        authors.count(),
        genres.count(),
    )?;

    Ok(DashboardCounts {
        books,
        book_instances,
        available_book_instances,
        authors,
        genres,
    })
}
