//! End-to-end publishing against a throwaway registry.
//!
//! Needs a docker daemon with buildx and QEMU emulation for arm64.
//! Run with `cargo test -p poetry-image --features integration`.
#![cfg(feature = "integration")]

use std::net::TcpStream;
use std::process::Command as StdCommand;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use tempfile::TempDir;

const REGISTRY_USERNAME: &str = "foo";
const REGISTRY_PASSWORD: &str = "bar";
const REGISTRY_PORT: u16 = 5000;

/// Every registry binds the same host port.
static REGISTRY_PORT_LOCK: Mutex<()> = Mutex::new(());

/// `registry:2` with htpasswd authentication, removed on drop.
struct DockerRegistryContainer {
    id: String,
    _auth_dir: TempDir,
}

impl DockerRegistryContainer {
    fn start(username: &str, password: &str) -> Self {
        let auth_dir = TempDir::new().unwrap();

        let htpasswd = StdCommand::new("docker")
            .args(["run", "--rm", "--entrypoint", "htpasswd", "httpd:2", "-Bbn", username, password])
            .output()
            .unwrap();
        assert!(htpasswd.status.success(), "htpasswd failed: {htpasswd:?}");
        std::fs::write(auth_dir.path().join("htpasswd"), &htpasswd.stdout).unwrap();

        let volume = format!("{}:/auth", auth_dir.path().display());
        let port = format!("{REGISTRY_PORT}:5000");
        let run = StdCommand::new("docker")
            .args([
                "run",
                "--detach",
                "--publish",
                &port,
                "--volume",
                &volume,
                "--env",
                "REGISTRY_AUTH=htpasswd",
                "--env",
                "REGISTRY_AUTH_HTPASSWD_REALM=Registry Realm",
                "--env",
                "REGISTRY_AUTH_HTPASSWD_PATH=/auth/htpasswd",
                "registry:2",
            ])
            .output()
            .unwrap();
        assert!(run.status.success(), "registry failed to start: {run:?}");

        let container = Self {
            id: String::from_utf8_lossy(&run.stdout).trim().to_string(),
            _auth_dir: auth_dir,
        };
        container.wait_until_ready();
        container
    }

    fn wait_until_ready(&self) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while TcpStream::connect(("127.0.0.1", REGISTRY_PORT)).is_err() {
            assert!(Instant::now() < deadline, "registry {} never came up", self.id);
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    fn registry(&self) -> String {
        format!("localhost:{REGISTRY_PORT}")
    }
}

impl Drop for DockerRegistryContainer {
    fn drop(&mut self) {
        let _ = StdCommand::new("docker")
            .args(["rm", "--force", "--volumes", &self.id])
            .output();
    }
}

fn publish_command() -> Command {
    let mut cmd = Command::cargo_bin("poetry-image").unwrap();
    cmd.env_remove("DOCKER_BINARY")
        .env_remove("BUILD_CONTEXT")
        .timeout(Duration::from_secs(1800));
    cmd
}

fn image_args(registry: &str) -> Vec<String> {
    [
        "--version-tag",
        "1.0.0",
        "--python-version",
        "3.12",
        "--os-variant",
        "slim",
        "--poetry-version",
        "1.8.3",
        "--registry",
        registry,
        "--use-local-cache-storage-backend",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn image_env(registry: &str, username: &str, password: &str) -> Vec<(String, String)> {
    [
        ("DOCKER_HUB_USERNAME", username),
        ("DOCKER_HUB_PASSWORD", password),
        ("GIT_TAG_NAME", "1.0.0"),
        ("PYTHON_VERSION", "3.12"),
        ("OS_VARIANT", "slim"),
        ("POETRY_VERSION", "1.8.3"),
        ("REGISTRY", registry),
        ("USE_LOCAL_CACHE_STORAGE_BACKEND", "true"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect()
}

#[test]
fn registry_with_credentials_via_flags() {
    let _lock = REGISTRY_PORT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let registry = DockerRegistryContainer::start(REGISTRY_USERNAME, REGISTRY_PASSWORD);

    publish_command()
        .args(["--docker-hub-username", REGISTRY_USERNAME, "--docker-hub-password", REGISTRY_PASSWORD])
        .args(image_args(&registry.registry()))
        .assert()
        .code(0);
}

#[test]
fn registry_with_wrong_credentials_via_flags() {
    let _lock = REGISTRY_PORT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let registry = DockerRegistryContainer::start(REGISTRY_USERNAME, REGISTRY_PASSWORD);

    publish_command()
        .args(["--docker-hub-username", "bang", "--docker-hub-password", "boom"])
        .args(image_args(&registry.registry()))
        .assert()
        .code(1)
        .stderr(predicates::str::contains("Registry authentication against localhost:5000 failed"));
}

#[test]
fn registry_with_credentials_via_env() {
    let _lock = REGISTRY_PORT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let registry = DockerRegistryContainer::start(REGISTRY_USERNAME, REGISTRY_PASSWORD);

    publish_command()
        .envs(image_env(&registry.registry(), REGISTRY_USERNAME, REGISTRY_PASSWORD))
        .assert()
        .code(0);
}

#[test]
fn registry_with_wrong_credentials_via_env() {
    let _lock = REGISTRY_PORT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let registry = DockerRegistryContainer::start(REGISTRY_USERNAME, REGISTRY_PASSWORD);

    publish_command()
        .envs(image_env(&registry.registry(), "boom", "bang"))
        .assert()
        .code(1)
        .stderr(predicates::str::contains("Registry authentication against localhost:5000 failed"));
}
