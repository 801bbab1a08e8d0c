//! Tests for the `gigboard-config` loader.
//!
//! Exercises default handling, file discovery, and environment overrides.

use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use gigboard_config::{load, AppConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "GIGBOARD_CONFIG",
    "GIGBOARD__DATABASE__URL",
    "GIGBOARD__DATABASE__MAX_CONNECTIONS",
    "GIGBOARD__DATABASE__BUSY_TIMEOUT_MS",
];

struct TestContext {
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        for key in ENV_VARS_TO_RESET {
            std::env::remove_var(key);
        }
        Self { original_dir: None }
    }

    fn chdir(&mut self, dir: &TempDir) {
        if self.original_dir.is_none() {
            self.original_dir = std::env::current_dir().ok();
        }
        std::env::set_current_dir(dir.path()).unwrap();
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(dir) = self.original_dir.take() {
            let _ = std::env::set_current_dir(dir);
        }
        for key in ENV_VARS_TO_RESET {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn defaults_load_without_file_or_environment() {
    let mut ctx = TestContext::new();
    let empty = TempDir::new().unwrap();
    ctx.chdir(&empty);

    let config = load().expect("defaults should load");
    let expected = AppConfig::default();

    assert_eq!(config.database.url, expected.database.url);
    assert_eq!(
        config.database.max_connections,
        expected.database.max_connections
    );
    assert_eq!(
        config.database.busy_timeout_ms,
        expected.database.busy_timeout_ms
    );
}

#[test]
#[serial]
fn config_file_discovered_in_working_directory() {
    let mut ctx = TestContext::new();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("gigboard.toml"),
        "[database]\nurl = \"sqlite://from-file.db\"\nmax_connections = 3\n",
    )
    .unwrap();
    ctx.chdir(&dir);

    let config = load().expect("file-backed configuration should load");
    assert_eq!(config.database.url, "sqlite://from-file.db");
    assert_eq!(config.database.max_connections, 3);
}

#[test]
#[serial]
fn explicit_config_path_takes_precedence() {
    let mut ctx = TestContext::new();
    let dir = TempDir::new().unwrap();
    let explicit = dir.path().join("elsewhere.toml");
    fs::write(
        &explicit,
        "[database]\nurl = \"sqlite://explicit.db\"\nmax_connections = 7\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("gigboard.toml"),
        "[database]\nurl = \"sqlite://ignored.db\"\nmax_connections = 1\n",
    )
    .unwrap();
    ctx.chdir(&dir);

    std::env::set_var("GIGBOARD_CONFIG", explicit.display().to_string());

    let config = load().expect("explicit configuration should load");
    assert_eq!(config.database.url, "sqlite://explicit.db");
    assert_eq!(config.database.max_connections, 7);
}

#[test]
#[serial]
fn environment_overrides_win_over_files() {
    let mut ctx = TestContext::new();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("gigboard.toml"),
        "[database]\nurl = \"sqlite://from-file.db\"\nmax_connections = 3\n",
    )
    .unwrap();
    ctx.chdir(&dir);

    std::env::set_var("GIGBOARD__DATABASE__URL", "sqlite://from-env.db");

    let config = load().expect("environment-backed configuration should load");
    assert_eq!(config.database.url, "sqlite://from-env.db");
    assert_eq!(config.database.max_connections, 3);
}
