mod catalog_author;
mod catalog_book;
mod catalog_genre;
mod server_health;
