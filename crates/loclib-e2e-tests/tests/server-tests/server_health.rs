use loclib_e2e_tests::{client, extend_url, location, prepare_env, spawn_server};
use reqwest::StatusCode;
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_health() {
    let (args, _config_guard) = prepare_env("test_health").await.unwrap();
    let base_url = args.base_url().unwrap();

    spawn_server(args).await.unwrap();

    let client = client().unwrap();

    let url = base_url.join("health").unwrap();
    let response = client.get(url).send().await.unwrap();
    info! {"Response: {:#?}", response};
    assert!(response.status().is_success());

    let response = client.get(base_url.clone()).send().await.unwrap();
    assert_eq!(StatusCode::SEE_OTHER, response.status());
    assert_eq!(Some("/catalog".to_string()), location(&response));

    let response = client
        .get(extend_url(&base_url, "/catalog"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("Test Library"));
    assert!(body.contains("<strong>Books:</strong> 0"));

    let response = client
        .get(extend_url(&base_url, "/no/such/page"))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, response.status());
}
