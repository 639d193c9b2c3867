/// Common test utilities for mdms-harness integration tests
///
/// The Docker daemon and the MDMS web app are both replaced by wiremock servers.
/// Blocking harness code must run through `blocking` so the blocking HTTP
/// client never lives on an async worker.
use mdms_harness::config::HarnessConfig;
use serde_json::json;
use std::process::Command;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const DATABASE_ID: &str = "db0123456789abcdef";
pub const WEB_ID: &str = "web0123456789abcdef";

/// Run blocking harness code off the async executor
pub async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

/// Config pointing at a mocked daemon, images pulled, no readiness probe
#[allow(dead_code)]
pub fn config_for(server: &MockServer) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.runtime.endpoint = server.uri();
    config
}

/// Summary entry as returned by `GET /containers/json`
#[allow(dead_code)]
pub fn container_entry(id: &str, name: &str, state: &str) -> serde_json::Value {
    json!({
        "Id": id,
        "Names": [format!("/{}", name)],
        "Image": "whatever",
        "State": state,
        "Status": "Up 2 minutes"
    })
}

/// Mount a container list answer
#[allow(dead_code)]
pub async fn mount_list(server: &MockServer, containers: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/containers/json"))
        .and(query_param("all", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(containers))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_remove_ok(server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/containers/[^/]+$"))
        .and(query_param("force", "true"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

/// Pull stream for an image that is already present
#[allow(dead_code)]
pub async fn mount_pull_up_to_date(server: &MockServer) {
    let body = concat!(
        r#"{"status":"Pulling from library/redis","id":"latest"}"#,
        "\r\n",
        r#"{"status":"Status: Image is up to date"}"#,
        "\r\n"
    );
    Mock::given(method("POST"))
        .and(path("/images/create"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Create and start answers for both reserved names
#[allow(dead_code)]
pub async fn mount_create_and_start(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/containers/create"))
        .and(query_param("name", "mdms-redis"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "Id": DATABASE_ID, "Warnings": [] })),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/containers/create"))
        .and(query_param("name", "mdms"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "Id": WEB_ID, "Warnings": null })),
        )
        .mount(server)
        .await;

    for id in [DATABASE_ID, WEB_ID] {
        Mock::given(method("POST"))
            .and(path(format!("/containers/{}/start", id)))
            .respond_with(ResponseTemplate::new(204))
            .mount(server)
            .await;
    }
}

/// A daemon on which a full start succeeds
#[allow(dead_code)]
pub async fn healthy_daemon(stale: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    mount_list(&server, stale).await;
    mount_remove_ok(&server).await;
    mount_pull_up_to_date(&server).await;
    mount_create_and_start(&server).await;
    server
}

/// "METHOD /path" for every request the server saw, in order
#[allow(dead_code)]
pub async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(describe)
        .collect()
}

fn describe(request: &Request) -> String {
    format!("{} {}", request.method, request.url.path())
}

/// Result of running the harness binary
#[allow(dead_code)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: Option<i32>,
}

/// Run the binary in `dir` against the daemon at `endpoint`
#[allow(dead_code)]
pub fn harness(dir: &std::path::Path, endpoint: &str, args: &[&str]) -> CommandResult {
    let output = Command::new(env!("CARGO_BIN_EXE_mdms-harness"))
        .args(args)
        .current_dir(dir)
        .env("MDMS_HARNESS_DOCKER_URI", endpoint)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute mdms-harness");

    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
        exit_code: output.status.code(),
    }
}

#[allow(dead_code)]
impl CommandResult {
    /// Assert the command succeeded
    pub fn assert_success(&self) {
        if !self.success {
            panic!(
                "Command failed:\nstdout: {}\nstderr: {}\nexit code: {:?}",
                self.stdout, self.stderr, self.exit_code
            );
        }
    }

    /// Assert the command failed
    pub fn assert_failure(&self) {
        if self.success {
            panic!(
                "Command succeeded when it should have failed:\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
    }

    pub fn assert_stdout_contains(&self, text: &str) {
        assert!(
            self.stdout.contains(text),
            "stdout does not contain '{}'\nstdout: {}",
            text,
            self.stdout
        );
    }

    pub fn assert_stderr_contains(&self, text: &str) {
        assert!(
            self.stderr.contains(text),
            "stderr does not contain '{}'\nstderr: {}",
            text,
            self.stderr
        );
    }
}
