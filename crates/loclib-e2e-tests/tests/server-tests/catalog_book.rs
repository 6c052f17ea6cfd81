use loclib_e2e_tests::{client, extend_url, location, prepare_env, spawn_server};
use reqwest::{Client, StatusCode};
use tracing_test::traced_test;
use url::Url;

async fn create(client: &Client, base_url: &Url, path: &str, form: &[(&str, &str)]) -> String {
    let response = client
        .post(extend_url(base_url, path))
        .form(form)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::SEE_OTHER, response.status());
    location(&response).unwrap()
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_book_with_copies() {
    let (args, _config_guard) = prepare_env("test_book_with_copies").await.unwrap();
    let base_url = args.base_url().unwrap();
    spawn_server(args).await.unwrap();
    let client = client().unwrap();

    let author = create(
        &client,
        &base_url,
        "/catalog/author/create",
        &[("first_name", "Ben"), ("family_name", "Bova")],
    )
    .await;
    let genre = create(
        &client,
        &base_url,
        "/catalog/genre/create",
        &[("name", "Science Fiction")],
    )
    .await;
    let author_id = last_segment(&author);
    let genre_id = last_segment(&genre);

    let response = client
        .post(extend_url(&base_url, "/catalog/book/create"))
        .form(&[
            ("title", ""),
            ("author", author_id),
            ("summary", "Short stories"),
            ("isbn", "<b>978</b>"),
            ("genre", genre_id),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = response.text().await.unwrap();
    assert!(body.contains("Title: must be specified"));
    assert!(body.contains("&lt;b&gt;978"));
    assert!(!body.contains("<b>978"));

    let book = create(
        &client,
        &base_url,
        "/catalog/book/create",
        &[
            ("title", "Apes and Angels"),
            ("author", author_id),
            ("summary", "Short stories"),
            ("isbn", "9780765379542"),
            ("genre", genre_id),
        ],
    )
    .await;
    let book_id = last_segment(&book).to_string();

    let copy = create(
        &client,
        &base_url,
        "/catalog/bookinstance/create",
        &[
            ("book", book_id.as_str()),
            ("imprint", "Tor, 2016"),
            ("status", "Available"),
            ("due_back", ""),
        ],
    )
    .await;

    let response = client
        .get(extend_url(&base_url, &book))
        .send()
        .await
        .unwrap();
    let body = response.text().await.unwrap();
    assert!(body.contains("Apes and Angels"));
    assert!(body.contains("Tor, 2016"));
    assert!(body.contains("Science Fiction"));

    let response = client
        .get(extend_url(&base_url, "/catalog"))
        .send()
        .await
        .unwrap();
    let body = response.text().await.unwrap();
    assert!(body.contains("<strong>Books:</strong> 1"));
    assert!(body.contains("<strong>Copies available:</strong> 1"));
    assert!(body.contains("<strong>Genres:</strong> 1"));

    let response = client
        .post(extend_url(&base_url, "/catalog/genre/delete"))
        .form(&[("genreid", genre_id)])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = response.text().await.unwrap();
    assert!(body.contains("Apes and Angels"));

    let response = client
        .post(extend_url(&base_url, "/catalog/book/delete"))
        .form(&[("bookid", book_id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = response.text().await.unwrap();
    assert!(body.contains("Tor, 2016"));

    let response = client
        .post(extend_url(&base_url, "/catalog/bookinstance/delete"))
        .form(&[("bookinstanceid", last_segment(&copy))])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::SEE_OTHER, response.status());

    let response = client
        .post(extend_url(&base_url, "/catalog/book/delete"))
        .form(&[("bookid", book_id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::SEE_OTHER, response.status());
    assert_eq!(Some("/catalog/books".to_string()), location(&response));

    let update_path = format!("/catalog/bookinstance/{}/update", last_segment(&copy));
    let response = client
        .get(extend_url(&base_url, &update_path))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_IMPLEMENTED, response.status());
}
