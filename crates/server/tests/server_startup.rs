use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config with storage inside `data_dir`
fn minimal_config(port: u16, data_dir: &Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[storage]
uploads_dir = "{}"
outputs_dir = "{}"
"#,
        port,
        data_dir.join("uploads").display(),
        data_dir.join("outputs").display(),
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_transmute"))
        .env("TRANSMUTE_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let data_dir = TempDir::new().unwrap();
    let config = write_config(&minimal_config(port, data_dir.path()));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "healthy");

    // Storage directories are created on startup
    assert!(data_dir.path().join("uploads").is_dir());
    assert!(data_dir.path().join("outputs").is_dir());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_startup_removes_orphaned_outputs() {
    let port = get_available_port();
    let data_dir = TempDir::new().unwrap();
    let outputs = data_dir.path().join("outputs");
    std::fs::create_dir_all(&outputs).unwrap();
    std::fs::write(outputs.join("stale.pdf"), b"left over").unwrap();
    let config = write_config(&minimal_config(port, data_dir.path()));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    assert!(!outputs.join("stale.pdf").exists());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let port = get_available_port();
    let data_dir = TempDir::new().unwrap();
    let mut content = minimal_config(port, data_dir.path());
    content.push_str(
        r#"
[strategies]
ffmpeg_path = "/opt/private/bin/ffmpeg"
"#,
    );
    let config = write_config(&content);

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let text = response.text().await.expect("Failed to read body");
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["server"]["port"], port);
    assert!(!text.contains("/opt/private"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_runs_from_environment_without_config_file() {
    let port = get_available_port();
    let work_dir = TempDir::new().unwrap();
    let data_dir = work_dir.path().join("data");

    let mut server = tokio::process::Command::new(env!("CARGO_BIN_EXE_transmute"))
        .current_dir(work_dir.path())
        .env_remove("TRANSMUTE_CONFIG")
        .env("TRANSMUTE_SERVER__HOST", "127.0.0.1")
        .env("TRANSMUTE_SERVER__PORT", port.to_string())
        .env("TRANSMUTE_STORAGE__UPLOADS_DIR", data_dir.join("uploads"))
        .env("TRANSMUTE_STORAGE__OUTPUTS_DIR", data_dir.join("outputs"))
        .env("RUST_LOG", "error")
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server");
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start from environment"
    );

    assert!(data_dir.join("uploads").is_dir());
    assert!(data_dir.join("outputs").is_dir());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_transmute"))
            .env("TRANSMUTE_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = write_config(
        r#"
[server]
port = 8080

[dispatcher]
max_concurrent_jobs = 0
"#,
    );

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_transmute"))
            .env("TRANSMUTE_CONFIG", config.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}
