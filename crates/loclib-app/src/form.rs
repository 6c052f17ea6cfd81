//! Submitted catalog forms
//!
//! Every form goes through the same steps: string fields are trimmed and
//! HTML escaped, declarative `garde` rules are checked, and only a valid form
//! is turned into a draft for the repository. An invalid form is returned
//! together with all field errors, so it can be shown again with the values
//! user entered (already escaped).

use garde::Validate;
use loclib_dal::{
    author::{Author, CreateAuthor},
    book::{Book, CreateBook},
    book_instance::{CreateBookInstance, InstanceStatus, InvalidStatus},
    genre::{CreateGenre, Genre},
};
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};

use crate::view::date_input;

pub fn sanitize(value: &str) -> String {
    tera::escape_html(value.trim())
}

fn required(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        Err(garde::Error::new("must be specified"))
    } else {
        Ok(())
    }
}

fn required_identifier(value: &str, ctx: &()) -> garde::Result {
    required(value, ctx)?;
    is_identifier(value, ctx)
}

fn is_identifier(value: &str, _ctx: &()) -> garde::Result {
    value
        .parse::<i64>()
        .map(|_| ())
        .map_err(|_| garde::Error::new("invalid identifier"))
}

fn optional_date(value: &str, _ctx: &()) -> garde::Result {
    parse_optional_date(value)
        .map(|_| ())
        .map_err(|_| garde::Error::new("invalid date"))
}

fn is_status(value: &str, _ctx: &()) -> garde::Result {
    parse_status(value).map(|_| ()).map_err(garde::Error::new)
}

/// Empty value means no date, otherwise ISO date or date-time is expected
pub fn parse_optional_date(value: &str) -> Result<Option<Date>, time::error::Parse> {
    if value.is_empty() {
        return Ok(None);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .or_else(|e| {
            OffsetDateTime::parse(value, &Rfc3339)
                .map(|dt| dt.date())
                .map_err(|_| e)
        })
        .map(Some)
}

fn parse_status(value: &str) -> Result<InstanceStatus, InvalidStatus> {
    if value.is_empty() {
        Ok(InstanceStatus::default())
    } else {
        value.parse()
    }
}

fn parse_id(field: &str, label: &str, value: &str) -> Result<i64, FieldError> {
    value
        .parse()
        .map_err(|_| FieldError::new(field, format!("{label}: invalid identifier")))
}

fn parse_date(field: &str, label: &str, value: &str) -> Result<Option<Date>, FieldError> {
    parse_optional_date(value).map_err(|_| FieldError::new(field, format!("{label}: invalid date")))
}

/// `genre[1]` -> `genre`
fn base_field(path: &str) -> &str {
    path.split(['[', '.']).next().unwrap_or(path)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum Validation<F, D> {
    Valid(D),
    Invalid { form: F, errors: Vec<FieldError> },
}

pub trait CatalogForm: Validate<Context = ()> + Clone + Sized {
    type Draft;

    /// Trims and escapes all string fields
    fn sanitize(self) -> Self;

    /// Human readable name of the field
    fn label(field: &str) -> &str {
        field
    }

    /// Conversion of already validated form
    fn into_draft(self) -> Result<Self::Draft, FieldError>;
}

pub fn validate<F: CatalogForm>(form: F) -> Validation<F, F::Draft> {
    let form = form.sanitize();
    if let Err(report) = form.validate() {
        let errors = report
            .iter()
            .map(|(path, error)| {
                let path = path.to_string();
                let field = base_field(&path);
                FieldError::new(field, format!("{}: {}", F::label(field), error.message()))
            })
            .collect();
        return Validation::Invalid { form, errors };
    }

    match form.clone().into_draft() {
        Ok(draft) => Validation::Valid(draft),
        Err(error) => Validation::Invalid {
            form,
            errors: vec![error],
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuthorForm {
    #[garde(custom(required), length(chars, max = 100))]
    pub first_name: String,
    #[garde(custom(required), length(chars, max = 100))]
    pub family_name: String,
    #[garde(custom(optional_date))]
    pub date_of_birth: String,
    #[garde(custom(optional_date))]
    pub date_of_death: String,
}

impl CatalogForm for AuthorForm {
    type Draft = CreateAuthor;

    fn sanitize(self) -> Self {
        AuthorForm {
            first_name: sanitize(&self.first_name),
            family_name: sanitize(&self.family_name),
            date_of_birth: sanitize(&self.date_of_birth),
            date_of_death: sanitize(&self.date_of_death),
        }
    }

    fn label(field: &str) -> &str {
        match field {
            "first_name" => "First name",
            "family_name" => "Family name",
            "date_of_birth" => "Date of birth",
            "date_of_death" => "Date of death",
            other => other,
        }
    }

    fn into_draft(self) -> Result<CreateAuthor, FieldError> {
        Ok(CreateAuthor {
            date_of_birth: parse_date("date_of_birth", "Date of birth", &self.date_of_birth)?,
            date_of_death: parse_date("date_of_death", "Date of death", &self.date_of_death)?,
            first_name: self.first_name,
            family_name: self.family_name,
        })
    }
}

impl From<&Author> for AuthorForm {
    fn from(author: &Author) -> Self {
        AuthorForm {
            first_name: author.first_name.clone(),
            family_name: author.family_name.clone(),
            date_of_birth: date_input(author.date_of_birth),
            date_of_death: date_input(author.date_of_death),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GenreForm {
    #[garde(length(chars, min = 2, max = 100))]
    pub name: String,
}

impl CatalogForm for GenreForm {
    type Draft = CreateGenre;

    fn sanitize(self) -> Self {
        GenreForm {
            name: sanitize(&self.name),
        }
    }

    fn label(field: &str) -> &str {
        match field {
            "name" => "Genre name",
            other => other,
        }
    }

    fn into_draft(self) -> Result<CreateGenre, FieldError> {
        Ok(CreateGenre { name: self.name })
    }
}

impl From<&Genre> for GenreForm {
    fn from(genre: &Genre) -> Self {
        GenreForm {
            name: genre.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BookForm {
    #[garde(custom(required))]
    pub title: String,
    #[garde(custom(required_identifier))]
    pub author: String,
    #[garde(custom(required))]
    pub summary: String,
    #[garde(custom(required))]
    pub isbn: String,
    #[garde(inner(custom(is_identifier)))]
    pub genre: Vec<String>,
}

impl BookForm {
    pub fn has_genre(&self, genre_id: i64) -> bool {
        let id = genre_id.to_string();
        self.genre.iter().any(|g| *g == id)
    }
}

impl CatalogForm for BookForm {
    type Draft = CreateBook;

    fn sanitize(self) -> Self {
        BookForm {
            title: sanitize(&self.title),
            author: sanitize(&self.author),
            summary: sanitize(&self.summary),
            isbn: sanitize(&self.isbn),
            genre: self.genre.iter().map(|g| sanitize(g)).collect(),
        }
    }

    fn label(field: &str) -> &str {
        match field {
            "title" => "Title",
            "author" => "Author",
            "summary" => "Summary",
            "isbn" => "ISBN",
            "genre" => "Genre",
            other => other,
        }
    }

    fn into_draft(self) -> Result<CreateBook, FieldError> {
        let genres = self
            .genre
            .iter()
            .map(|g| parse_id("genre", "Genre", g))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CreateBook {
            author_id: parse_id("author", "Author", &self.author)?,
            title: self.title,
            summary: self.summary,
            isbn: self.isbn,
            genres,
        })
    }
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        BookForm {
            title: book.title.clone(),
            author: book.author.id.to_string(),
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            genre: book.genres.iter().map(|g| g.id.to_string()).collect(),
        }
    }
}

/// Draft values are already sanitized, so they can be shown in form again
impl From<&CreateBook> for BookForm {
    fn from(draft: &CreateBook) -> Self {
        BookForm {
            title: draft.title.clone(),
            author: draft.author_id.to_string(),
            summary: draft.summary.clone(),
            isbn: draft.isbn.clone(),
            genre: draft.genres.iter().map(|g| g.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BookInstanceForm {
    #[garde(custom(required_identifier))]
    pub book: String,
    #[garde(custom(required))]
    pub imprint: String,
    #[garde(custom(is_status))]
    pub status: String,
    #[garde(custom(optional_date))]
    pub due_back: String,
}

impl CatalogForm for BookInstanceForm {
    type Draft = CreateBookInstance;

    fn sanitize(self) -> Self {
        BookInstanceForm {
            book: sanitize(&self.book),
            imprint: sanitize(&self.imprint),
            status: sanitize(&self.status),
            due_back: sanitize(&self.due_back),
        }
    }

    fn label(field: &str) -> &str {
        match field {
            "book" => "Book",
            "imprint" => "Imprint",
            "status" => "Status",
            "due_back" => "Date when book available",
            other => other,
        }
    }

    /// Missing due date means the copy is available from today
    fn into_draft(self) -> Result<CreateBookInstance, FieldError> {
        let status = parse_status(&self.status)
            .map_err(|e| FieldError::new("status", format!("Status: {e}")))?;
        let due_back = parse_date("due_back", "Date when book available", &self.due_back)?
            .unwrap_or_else(|| OffsetDateTime::now_utc().date());
        Ok(CreateBookInstance {
            book_id: parse_id("book", "Book", &self.book)?,
            imprint: self.imprint,
            status,
            due_back,
        })
    }
}

impl From<&CreateBookInstance> for BookInstanceForm {
    fn from(draft: &CreateBookInstance) -> Self {
        BookInstanceForm {
            book: draft.book_id.to_string(),
            imprint: draft.imprint.clone(),
            status: draft.status.as_str().to_string(),
            due_back: date_input(Some(draft.due_back)),
        }
    }
}
