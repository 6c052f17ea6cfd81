use loclib_e2e_tests::{client, extend_url, location, prepare_env, spawn_server};
use reqwest::StatusCode;
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_author_lifecycle() {
    let (args, _config_guard) = prepare_env("test_author_lifecycle").await.unwrap();
    let base_url = args.base_url().unwrap();
    spawn_server(args).await.unwrap();
    let client = client().unwrap();

    let response = client
        .post(extend_url(&base_url, "/catalog/author/create"))
        .form(&[("first_name", "Ursula"), ("family_name", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = response.text().await.unwrap();
    assert!(body.contains("Family name: must be specified"));
    assert!(body.contains("value=\"Ursula\""));

    let response = client
        .post(extend_url(&base_url, "/catalog/author/create"))
        .form(&[
            ("first_name", "Ursula"),
            ("family_name", "Le Guin"),
            ("date_of_birth", "1929-10-21"),
            ("date_of_death", "2018-01-22"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::SEE_OTHER, response.status());
    let author_path = location(&response).unwrap();
    info!("Author created at {author_path}");

    let response = client
        .get(extend_url(&base_url, &author_path))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = response.text().await.unwrap();
    assert!(body.contains("Le Guin, Ursula"));
    assert!(body.contains("Oct 21, 1929"));

    let response = client
        .get(extend_url(&base_url, "/catalog/authors"))
        .send()
        .await
        .unwrap();
    let body = response.text().await.unwrap();
    assert!(body.contains(&format!("href=\"{author_path}\"")));

    let author_id = author_path.rsplit('/').next().unwrap().to_string();
    let response = client
        .post(extend_url(&base_url, "/catalog/author/delete"))
        .form(&[("authorid", author_id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::SEE_OTHER, response.status());
    assert_eq!(Some("/catalog/authors".to_string()), location(&response));

    let response = client
        .get(extend_url(&base_url, &author_path))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, response.status());

    let response = client
        .post(extend_url(&base_url, "/catalog/author/delete"))
        .form(&[("authorid", author_id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, response.status());
}
