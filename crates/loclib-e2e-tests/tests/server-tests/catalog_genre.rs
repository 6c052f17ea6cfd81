use loclib_e2e_tests::{client, extend_url, location, prepare_env, spawn_server};
use reqwest::StatusCode;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_genre_case_insensitive() {
    let (args, _config_guard) = prepare_env("test_genre_case_insensitive")
        .await
        .unwrap();
    let base_url = args.base_url().unwrap();
    spawn_server(args).await.unwrap();
    let client = client().unwrap();

    let mut locations = Vec::new();
    for name in ["Horror", "horror", "HORROR"] {
        let response = client
            .post(extend_url(&base_url, "/catalog/genre/create"))
            .form(&[("name", name)])
            .send()
            .await
            .unwrap();
        assert_eq!(StatusCode::SEE_OTHER, response.status());
        locations.push(location(&response).unwrap());
    }
    assert!(locations.iter().all(|l| l == &locations[0]));

    let response = client
        .get(extend_url(&base_url, "/catalog/genres"))
        .send()
        .await
        .unwrap();
    let body = response.text().await.unwrap();
    assert_eq!(1, body.matches(&format!("href=\"{}\"", locations[0])).count());

    let response = client
        .get(extend_url(&base_url, &locations[0]))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = response.text().await.unwrap();
    assert!(body.contains("Horror"));

    let response = client
        .post(extend_url(&base_url, "/catalog/genre/create"))
        .form(&[("name", " ")])
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = response.text().await.unwrap();
    assert!(body.contains("Genre name:"));
}
