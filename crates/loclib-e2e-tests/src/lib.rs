use std::{path::Path, time::Duration};

use anyhow::{Result, anyhow};
use loclib_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use tempfile::TempDir;
use tracing::{debug, error};
use url::Url;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &[
        "loclib-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--site-name",
        "Test Library",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Fresh configuration with its own data directory under `test-data`
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::current_dir()?.join("test-data");
    if !tokio::fs::try_exists(&base_dir).await? {
        tokio::fs::create_dir_all(&base_dir).await?;
    }
    test_config(test_name, &base_dir)
}

/// Starts server in background task and waits until it is healthy
pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let health_url = args.base_url()?.join("health")?;
    tokio::spawn(async move {
        if let Err(e) = loclib_server::run::run(args).await {
            error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start in time"))
}

/// Client which does not follow redirects, so they can be checked
pub fn client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// Path from `Location` header of redirect response
pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|l| l.to_str().ok())
        .map(|l| l.to_string())
}

pub fn extend_url(base_url: &Url, path: &str) -> Url {
    base_url
        .join(path.trim_start_matches('/'))
        .unwrap_or_else(|_| base_url.clone())
}
