use futures::TryStreamExt as _;
use loclib_dal::{
    Error, ListingParams, Order, Storage, StorageConfig,
    author::CreateAuthor,
    book::CreateBook,
    book_instance::{CreateBookInstance, InstanceStatus},
    dashboard::dashboard_counts,
    detail,
    genre::CreateGenre,
    integrity::{DeleteCheck, Deletion},
};
use sqlx::Executor;
use time::macros::date;
use tracing_test::traced_test;

const TEST_DATA: &str = r#"
INSERT INTO author (id, first_name, family_name, date_of_birth, date_of_death)
VALUES (1, 'Patrick', 'Rothfuss', '1973-06-06', NULL);
INSERT INTO author (id, first_name, family_name, date_of_birth, date_of_death)
VALUES (2, 'Ben', 'Bova', '1932-11-08', NULL);
INSERT INTO author (id, first_name, family_name, date_of_birth, date_of_death)
VALUES (3, 'Isaac', 'Asimov', '1920-01-02', '1992-04-06');

INSERT INTO genre (id, name, name_key) VALUES (1, 'Fantasy', 'fantasy');
INSERT INTO genre (id, name, name_key) VALUES (2, 'Science Fiction', 'science fiction');
INSERT INTO genre (id, name, name_key) VALUES (3, 'Poetry', 'poetry');

INSERT INTO book (id, title, author_id, summary, isbn)
VALUES (1, 'The Name of the Wind', 1, 'Kvothe tells his story.', '9781473211896');
INSERT INTO book (id, title, author_id, summary, isbn)
VALUES (2, 'The Wise Man''s Fear', 1, 'Kvothe goes on.', '9788401352836');
INSERT INTO book (id, title, author_id, summary, isbn)
VALUES (3, 'Apes and Angels', 2, 'Humankind''s first starships.', '9780765379528');

INSERT INTO book_genres (book_id, genre_id) VALUES (1, 1);
INSERT INTO book_genres (book_id, genre_id) VALUES (2, 1);
INSERT INTO book_genres (book_id, genre_id) VALUES (3, 2);

INSERT INTO book_instance (id, book_id, imprint, status, due_back)
VALUES (1, 1, 'London Gollancz, 2014.', 'Available', '2025-01-01');
INSERT INTO book_instance (id, book_id, imprint, status, due_back)
VALUES (2, 2, 'Gollancz, 2011.', 'Loaned', '2025-02-01');
"#;

async fn init_db() -> Storage {
    let storage = Storage::open(&StorageConfig::new("sqlite::memory:"))
        .await
        .unwrap();
    storage
        .pool()
        .execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();
    storage
}

#[tokio::test]
#[traced_test]
async fn test_author_crud() {
    let storage = init_db().await;
    let repo = storage.authors();

    let created = repo
        .create(CreateAuthor {
            first_name: "Jim".to_string(),
            family_name: "Jones".to_string(),
            date_of_birth: Some(date!(1971 - 12 - 16)),
            date_of_death: None,
        })
        .await
        .unwrap();
    assert_eq!("Jones, Jim", created.name());
    assert_eq!(None, created.lifespan());

    let updated = repo
        .update(
            created.id,
            CreateAuthor {
                first_name: "James".to_string(),
                family_name: "Jones".to_string(),
                date_of_birth: Some(date!(1971 - 12 - 16)),
                date_of_death: Some(date!(2021 - 01 - 01)),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.id, updated.id);
    assert_eq!("James", updated.first_name);
    assert_eq!(Some(50), updated.lifespan());

    let all = repo.list_all().await.unwrap();
    let names: Vec<_> = all.iter().map(|a| a.family_name.as_str()).collect();
    assert_eq!(vec!["Asimov", "Bova", "Jones", "Rothfuss"], names);
    assert_eq!(4, repo.count().await.unwrap());

    let missing = repo
        .update(
            999,
            CreateAuthor {
                first_name: "No".to_string(),
                family_name: "Body".to_string(),
                date_of_birth: None,
                date_of_death: None,
            },
        )
        .await;
    assert!(matches!(missing, Err(Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_author_list_order() {
    let storage = init_db().await;
    let params = ListingParams::default().with_order(vec![Order::Desc("date_of_birth".into())]);
    let all = storage.authors().list(params).await.unwrap();
    assert_eq!("Rothfuss", all[0].family_name);

    let params = ListingParams::default().with_order(vec![Order::Asc("password".into())]);
    let res = storage.authors().list(params).await;
    assert!(matches!(res, Err(Error::InvalidOrderByField(_))));
}

#[tokio::test]
#[traced_test]
async fn test_author_delete_blocked() {
    let storage = init_db().await;
    let repo = storage.authors();

    let check = storage.integrity().can_delete_author(1).await.unwrap();
    assert_eq!(2, check.blockers().len());

    match repo.delete_guarded(1).await.unwrap() {
        Deletion::Blocked(books) => {
            let mut ids: Vec<_> = books.iter().map(|b| b.id).collect();
            ids.sort();
            assert_eq!(vec![1, 2], ids);
        }
        Deletion::Deleted => panic!("Author with books must not be deleted"),
    }
    assert!(repo.get(1).await.is_ok());
}

#[tokio::test]
async fn test_author_delete_allowed() {
    let storage = init_db().await;
    let repo = storage.authors();

    let check = storage.integrity().can_delete_author(3).await.unwrap();
    assert_eq!(DeleteCheck::Allowed, check);

    assert_eq!(Deletion::Deleted, repo.delete_guarded(3).await.unwrap());
    assert!(matches!(repo.get(3).await, Err(Error::RecordNotFound(_))));
    assert!(matches!(
        repo.delete_guarded(3).await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_foreign_key_backstop() {
    let storage = init_db().await;
    for sql in [
        "DELETE FROM author WHERE id = 1",
        "DELETE FROM genre WHERE id = 1",
        "DELETE FROM book WHERE id = 1",
    ] {
        let res = sqlx::query(sql)
            .execute(storage.pool())
            .await
            .map_err(Error::from);
        assert!(
            matches!(res, Err(Error::ReferentialConflict(_))),
            "{sql} gave {res:?}"
        );
    }
    assert_eq!(3, storage.books().count().await.unwrap());

    let res = storage
        .books()
        .create(CreateBook {
            title: "Orphan".to_string(),
            author_id: 999,
            summary: "No author".to_string(),
            isbn: "123".to_string(),
            genres: vec![],
        })
        .await;
    assert!(matches!(res, Err(Error::ReferentialConflict(_))));
}

#[tokio::test]
#[traced_test]
async fn test_genre_lookup_and_delete() {
    let storage = init_db().await;
    let repo = storage.genres();

    let found = repo.find_by_name("fantasy").await.unwrap().unwrap();
    assert_eq!(1, found.id);
    assert!(repo.find_by_name("Horror").await.unwrap().is_none());

    let names: Vec<_> = repo
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(vec!["Fantasy", "Poetry", "Science Fiction"], names);

    match repo.delete_guarded(2).await.unwrap() {
        Deletion::Blocked(books) => {
            assert_eq!(1, books.len());
            assert_eq!("Apes and Angels", books[0].title);
        }
        Deletion::Deleted => panic!("Genre with books must not be deleted"),
    }

    assert_eq!(Deletion::Deleted, repo.delete_guarded(3).await.unwrap());
    assert!(matches!(repo.get(3).await, Err(Error::RecordNotFound(_))));

    let renamed = repo
        .update(
            1,
            CreateGenre {
                name: "High Fantasy".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!("High Fantasy", renamed.name);
    assert_eq!(1, repo.find_by_name("HIGH fantasy").await.unwrap().unwrap().id);
    assert!(repo.find_by_name("fantasy").await.unwrap().is_none());
}

#[tokio::test]
#[traced_test]
async fn test_genre_lookup_any_script() {
    let storage = init_db().await;
    let repo = storage.genres();

    for name in ["Épopée", "Фэнтези"] {
        let genre = repo
            .create(CreateGenre {
                name: name.to_string(),
            })
            .await
            .unwrap();
        let lower = name.to_lowercase();
        let upper = name.to_uppercase();
        assert_eq!(genre.id, repo.find_by_name(&lower).await.unwrap().unwrap().id);
        assert_eq!(genre.id, repo.find_by_name(&upper).await.unwrap().unwrap().id);
    }
    assert!(repo.find_by_name("epopee").await.unwrap().is_none());
}

#[tokio::test]
#[traced_test]
async fn test_book_crud() {
    let storage = init_db().await;
    let repo = storage.books();

    let book = repo
        .create(CreateBook {
            title: "Foundation".to_string(),
            author_id: 3,
            summary: "Psychohistory.".to_string(),
            isbn: "9780553293357".to_string(),
            genres: vec![2, 1, 2],
        })
        .await
        .unwrap();
    assert_eq!("Asimov", book.author.family_name);
    let genres: Vec<_> = book.genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(vec!["Fantasy", "Science Fiction"], genres);
    assert_eq!(vec![1, 2], book.genres.iter().map(|g| g.id).collect::<Vec<_>>());

    let updated = repo
        .update(
            book.id,
            CreateBook {
                title: "Foundation".to_string(),
                author_id: 3,
                summary: "Psychohistory.".to_string(),
                isbn: "9780553293357".to_string(),
                genres: vec![2],
            },
        )
        .await
        .unwrap();
    assert_eq!(1, updated.genres.len());
    assert_eq!(2, updated.genres[0].id);

    let titles: Vec<_> = repo
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(
        vec![
            "Apes and Angels",
            "Foundation",
            "The Name of the Wind",
            "The Wise Man's Fear"
        ],
        titles
    );

    assert_eq!(2, repo.list_by_genre(2).await.unwrap().len());
    assert_eq!(1, repo.list_by_author(3).await.unwrap().len());
}

#[tokio::test]
async fn test_book_delete_guarded_by_copies() {
    let storage = init_db().await;
    let repo = storage.books();

    match repo.delete_guarded(1).await.unwrap() {
        Deletion::Blocked(copies) => {
            assert_eq!(1, copies.len());
            assert_eq!("London Gollancz, 2014.", copies[0].imprint);
        }
        Deletion::Deleted => panic!("Book with copies must not be deleted"),
    }

    // genre links are removed together with the book
    assert_eq!(Deletion::Deleted, repo.delete_guarded(3).await.unwrap());
    assert!(storage.books().list_by_genre(2).await.unwrap().is_empty());
    assert_eq!(
        DeleteCheck::Allowed,
        storage.integrity().can_delete_genre(2).await.unwrap()
    );
}

#[tokio::test]
#[traced_test]
async fn test_book_instances() {
    let storage = init_db().await;
    let repo = storage.book_instances();

    let copy = repo
        .create(CreateBookInstance {
            book_id: 3,
            imprint: "Tor, 2016.".to_string(),
            status: InstanceStatus::default(),
            due_back: date!(2025 - 03 - 01),
        })
        .await
        .unwrap();
    assert_eq!(InstanceStatus::Maintenance, copy.status);
    assert_eq!("Apes and Angels", copy.book.title);
    assert_eq!(format!("/catalog/bookinstance/{}", copy.id), copy.url());

    let copy = repo
        .update(
            copy.id,
            CreateBookInstance {
                book_id: 3,
                imprint: "Tor, 2016.".to_string(),
                status: InstanceStatus::Reserved,
                due_back: date!(2025 - 04 - 01),
            },
        )
        .await
        .unwrap();
    assert_eq!(InstanceStatus::Reserved, copy.status);

    assert_eq!(3, repo.count().await.unwrap());
    assert_eq!(
        1,
        repo.count_by_status(InstanceStatus::Available)
            .await
            .unwrap()
    );

    repo.delete(copy.id).await.unwrap();
    assert!(matches!(
        repo.delete(copy.id).await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_detail_composition() {
    let storage = init_db().await;

    let author = detail::author_detail(&storage, 1).await.unwrap();
    assert_eq!("Rothfuss", author.author.family_name);
    assert_eq!(2, author.books.len());

    let author = detail::author_detail(&storage, 3).await.unwrap();
    assert!(author.books.is_empty());

    let book = detail::book_detail(&storage, 1).await.unwrap();
    assert_eq!("Rothfuss", book.book.author.family_name);
    assert_eq!(1, book.book.genres.len());
    assert_eq!(1, book.instances.len());

    let genre = detail::genre_detail(&storage, 1).await.unwrap();
    assert_eq!(2, genre.books.len());

    let copy = detail::book_instance_detail(&storage, 2).await.unwrap();
    assert_eq!("The Wise Man's Fear", copy.book.title);
}

#[tokio::test]
async fn test_detail_not_found() {
    let storage = init_db().await;
    assert!(matches!(
        detail::author_detail(&storage, 999).await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        detail::genre_detail(&storage, 999).await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        detail::book_detail(&storage, 999).await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        detail::book_instance_detail(&storage, 999).await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_dashboard_counts() {
    let storage = Storage::open(&StorageConfig::new("sqlite::memory:"))
        .await
        .unwrap();
    let author = storage
        .authors()
        .create(CreateAuthor {
            first_name: "Ben".to_string(),
            family_name: "Bova".to_string(),
            date_of_birth: None,
            date_of_death: None,
        })
        .await
        .unwrap();

    let mut books = Vec::new();
    for title in ["One", "Two", "Three"] {
        let book = storage
            .books()
            .create(CreateBook {
                title: title.to_string(),
                author_id: author.id,
                summary: "Summary".to_string(),
                isbn: "isbn".to_string(),
                genres: vec![],
            })
            .await
            .unwrap();
        books.push(book);
    }
    for (book, status) in books
        .iter()
        .take(2)
        .zip([InstanceStatus::Available, InstanceStatus::Loaned])
    {
        storage
            .book_instances()
            .create(CreateBookInstance {
                book_id: book.id,
                imprint: "Imprint".to_string(),
                status,
                due_back: date!(2025 - 01 - 01),
            })
            .await
            .unwrap();
    }

    let counts = dashboard_counts(&storage).await.unwrap();
    assert_eq!(3, counts.books);
    assert_eq!(2, counts.book_instances);
    assert_eq!(1, counts.available_book_instances);
    assert_eq!(1, counts.authors);
    assert_eq!(0, counts.genres);
}

#[tokio::test]
async fn test_storage_timeout() {
    let storage = Storage::open(
        &StorageConfig::new("sqlite::memory:").with_timeout(std::time::Duration::from_millis(50)),
    )
    .await
    .unwrap();

    // the only connection is held, so the next call cannot get one in time
    let _conn = storage.pool().acquire().await.unwrap();
    let res = storage.authors().count().await;
    match res {
        Err(e) => assert!(e.is_transient()),
        Ok(_) => panic!("Count must not succeed without connection"),
    }
}
