use loclib_dal::{
    author::{Author, AuthorShort},
    book::{Book, BookRef, BookShort},
    book_instance::{BookInstance, InstanceStatus},
    genre::Genre,
};
use serde::Serialize;
use tera::{Context, Tera};
use time::{macros::format_description, Date};

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("error.html", include_str!("../templates/error.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("author_list.html", include_str!("../templates/author_list.html")),
    ("author_detail.html", include_str!("../templates/author_detail.html")),
    ("author_form.html", include_str!("../templates/author_form.html")),
    ("author_delete.html", include_str!("../templates/author_delete.html")),
    ("genre_list.html", include_str!("../templates/genre_list.html")),
    ("genre_detail.html", include_str!("../templates/genre_detail.html")),
    ("genre_form.html", include_str!("../templates/genre_form.html")),
    ("genre_delete.html", include_str!("../templates/genre_delete.html")),
    ("book_list.html", include_str!("../templates/book_list.html")),
    ("book_detail.html", include_str!("../templates/book_detail.html")),
    ("book_form.html", include_str!("../templates/book_form.html")),
    ("book_delete.html", include_str!("../templates/book_delete.html")),
    (
        "bookinstance_list.html",
        include_str!("../templates/bookinstance_list.html"),
    ),
    (
        "bookinstance_detail.html",
        include_str!("../templates/bookinstance_detail.html"),
    ),
    (
        "bookinstance_form.html",
        include_str!("../templates/bookinstance_form.html"),
    ),
    (
        "bookinstance_delete.html",
        include_str!("../templates/bookinstance_delete.html"),
    ),
];

/// HTML templates compiled into the binary
///
/// Autoescaping is off, stored and echoed strings are escaped when forms are
/// sanitized, see [`crate::form::sanitize`].
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        tera.autoescape_on(vec![]);
        Ok(Templates { tera })
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<String, tera::Error> {
        self.tera.render(template, context)
    }
}

/// Medium date format like `Oct 19, 2026`, `?` when unknown
pub fn date_med(date: Option<Date>) -> String {
    date.and_then(|d| {
        d.format(format_description!(
            "[month repr:short] [day padding:none], [year]"
        ))
        .ok()
    })
    .unwrap_or_else(|| "?".to_string())
}

/// Value for date input, `YYYY-MM-DD` or empty
pub fn date_input(date: Option<Date>) -> String {
    date.and_then(|d| d.format(format_description!("[year]-[month]-[day]")).ok())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub id: i64,
    pub name: String,
    pub url: String,
}

impl From<&AuthorShort> for Link {
    fn from(author: &AuthorShort) -> Self {
        Link {
            id: author.id,
            name: author.name(),
            url: author.url(),
        }
    }
}

impl From<&Genre> for Link {
    fn from(genre: &Genre) -> Self {
        Link {
            id: genre.id,
            name: genre.name.clone(),
            url: genre.url(),
        }
    }
}

impl From<&BookRef> for Link {
    fn from(book: &BookRef) -> Self {
        Link {
            id: book.id,
            name: book.title.clone(),
            url: book.url(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: i64,
    pub name: String,
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: String,
    pub date_of_death: String,
    pub lifespan: Option<i32>,
    pub url: String,
}

impl From<&Author> for AuthorView {
    fn from(author: &Author) -> Self {
        AuthorView {
            id: author.id,
            name: author.name(),
            first_name: author.first_name.clone(),
            family_name: author.family_name.clone(),
            date_of_birth: date_med(author.date_of_birth),
            date_of_death: date_med(author.date_of_death),
            lifespan: author.lifespan(),
            url: author.url(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookShortView {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub author: Link,
}

impl From<&BookShort> for BookShortView {
    fn from(book: &BookShort) -> Self {
        BookShortView {
            id: book.id,
            title: book.title.clone(),
            summary: book.summary.clone(),
            url: book.url(),
            author: Link::from(&book.author),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub url: String,
    pub author: Link,
    pub genres: Vec<Link>,
}

impl From<&Book> for BookView {
    fn from(book: &Book) -> Self {
        BookView {
            id: book.id,
            title: book.title.clone(),
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            url: book.url(),
            author: Link::from(&book.author),
            genres: book.genres.iter().map(Link::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookInstanceView {
    pub id: i64,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: String,
    pub url: String,
    pub book: Link,
}

impl From<&BookInstance> for BookInstanceView {
    fn from(instance: &BookInstance) -> Self {
        BookInstanceView {
            id: instance.id,
            imprint: instance.imprint.clone(),
            status: instance.status,
            due_back: date_med(Some(instance.due_back)),
            url: instance.url(),
            book: Link::from(&instance.book),
        }
    }
}

/// Option of select or checkbox list in forms
#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl Choice {
    pub fn new(value: impl ToString, label: impl Into<String>, selected: bool) -> Self {
        Choice {
            value: value.to_string(),
            label: label.into(),
            selected,
        }
    }
}

pub fn views<'a, T, V>(records: &'a [T]) -> Vec<V>
where
    V: From<&'a T>,
{
    records.iter().map(V::from).collect()
}
