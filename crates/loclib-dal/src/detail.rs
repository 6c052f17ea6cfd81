//! Detail pages read a primary entity together with entities related to it.
//!
//! Both reads are issued concurrently. Missing primary entity fails the whole
//! composition with [`Error::RecordNotFound`](crate::Error::RecordNotFound)
//! and the sibling read is dropped, empty related collection is valid.

use serde::Serialize;

use crate::{
    Storage,
    author::Author,
    book::{Book, BookShort},
    book_instance::BookInstance,
    error::Result,
    genre::Genre,
};

#[derive(Debug, Clone, Serialize)]
pub struct AuthorDetail {
    pub author: Author,
    pub books: Vec<BookShort>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreDetail {
    pub genre: Genre,
    pub books: Vec<BookShort>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub instances: Vec<BookInstance>,
}

pub async fn author_detail(storage: &Storage, id: i64) -> Result<AuthorDetail> {
    let authors = storage.authors();
    let books = storage.books();
    let (author, books) = tokio::try_join!(authors.get(id), books.list_by_author(id))?;
    Ok(AuthorDetail { author, books })
}

pub async fn genre_detail(storage: &Storage, id: i64) -> Result<GenreDetail> {
    let genres = storage.genres();
    let books = storage.books();
    let (genre, books) = tokio::try_join!(genres.get(id), books.list_by_genre(id))?;
    Ok(GenreDetail { genre, books })
}

/// Book with resolved author and genres, plus its copies
pub async fn book_detail(storage: &Storage, id: i64) -> Result<BookDetail> {
    let books = storage.books();
    let instances = storage.book_instances();
    let (book, instances) = tokio::try_join!(books.get(id), instances.list_by_book(id))?;
    Ok(BookDetail { book, instances })
}

/// Copy is read with its book already joined
pub async fn book_instance_detail(storage: &Storage, id: i64) -> Result<BookInstance> {
    storage.book_instances().get(id).await
}
