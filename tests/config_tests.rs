//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides
//! through the CLI

mod common;

use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;
use tempfile::TempDir;

use common::{fixture_path, repersona_cmd};

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self { temp_dir, config_path }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn cmd(&self) -> assert_cmd::Command {
        repersona_cmd(self.temp_dir.path())
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_default() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[provider]"))
        .stdout(predicate::str::contains("[conversation]"))
        .stdout(predicate::str::contains("[persona]"))
        .stdout(predicate::str::contains("[gemini]"))
        .stdout(predicate::str::contains("[logging]"))
        .stdout(predicate::str::contains("context_turns = 10"))
        .stdout(predicate::str::contains("api_key").not());
}

#[test]
fn test_config_validate_default() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[conversation]\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .success();
}

#[test]
fn test_fixture_config_values() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "show", "--config"])
        .arg(fixture_path("valid_config.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("default = \"anthropic\""))
        .stdout(predicate::str::contains("context_turns = 6"))
        .stdout(predicate::str::contains("claude-3-5-haiku-latest"))
        .stdout(predicate::str::contains("https://api.anthropic.com/v1"))
        .stdout(predicate::str::contains("a Norwegian upper-secondary classroom"));
}

#[test]
fn test_config_discovered_in_working_directory() {
    let fixture = ConfigFixture::new();
    fs::write(
        fixture.temp_dir.path().join("repersona.toml"),
        "[persona]\nsetting = \"a Finnish confirmation camp\"\n",
    )
    .unwrap();

    fixture
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a Finnish confirmation camp"));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_validate_nonexistent_file() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "validate", "--config", "/nonexistent/repersona.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E100"))
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_invalid_context_turns() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "validate", "--config"])
        .arg(fixture_path("invalid_config.toml"))
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("context_turns"));
}

#[test]
fn test_invalid_base_url() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[deepseek]\nbase_url = \"api.deepseek.com\"\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deepseek.base_url"));
}

#[test]
fn test_unbounded_retries_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[openai]\nmax_retries = 70\ntimeout_secs = 30\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("max_retries must be at most 10"));
}

#[test]
fn test_zero_timeout_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[anthropic]\ntimeout_secs = 0\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("timeout_secs must be between 1 and 600"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[logging]\nlevel = \"chatty\"\n");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[provider\ndefault = ");

    fixture
        .cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_invalid_config_blocks_chat() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[provider]\ndefault = \"bard\"\n");

    fixture
        .cmd()
        .args(["create", "--config", fixture.path(), "--tradition", "Islam"])
        .assert()
        .failure()
        .code(10);
}

// ─────────────────────────────────────────────────────────────────
// Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_file() {
    let fixture = ConfigFixture::new();
    let target = fixture.temp_dir.path().join("nested").join("config.toml");

    fixture
        .cmd()
        .args(["config", "init", "--path"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));

    let content = fs::read_to_string(&target).unwrap();
    assert!(content.contains("[provider]"));
    assert!(content.contains("API keys are never read from this file"));

    fixture
        .cmd()
        .args(["config", "validate", "--config"])
        .arg(&target)
        .assert()
        .success();
}

#[test]
fn test_config_init_default_location() {
    let fixture = ConfigFixture::new();
    fixture.cmd().args(["config", "init"]).assert().success();

    assert!(fixture
        .temp_dir
        .path()
        .join(".repersona")
        .join("config.toml")
        .exists());
}

#[test]
fn test_config_init_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("# keep me\n");

    fixture
        .cmd()
        .args(["config", "init", "--path", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&fixture.config_path).unwrap(), "# keep me\n");
}

#[test]
fn test_config_init_force_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("# replace me\n");

    fixture
        .cmd()
        .args(["config", "init", "--force", "--path", fixture.path()])
        .assert()
        .success();

    assert!(fs::read_to_string(&fixture.config_path)
        .unwrap()
        .contains("[conversation]"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Variable Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_override_model() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[anthropic]\nmodel = \"claude-from-file\"\n");

    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .env("REPERSONA_ANTHROPIC_MODEL", "claude-from-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("claude-from-env"))
        .stdout(predicate::str::contains("claude-from-file").not());
}

#[test]
fn test_env_override_conversation() {
    let fixture = ConfigFixture::new();
    fixture
        .cmd()
        .args(["config", "show"])
        .env("REPERSONA_CONTEXT_TURNS", "4")
        .env("REPERSONA_PROVIDER", "gemini")
        .assert()
        .success()
        .stdout(predicate::str::contains("context_turns = 4"))
        .stdout(predicate::str::contains("default = \"gemini\""));
}

#[test]
fn test_tilde_expansion() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[conversation]\nexport_dir = \"~/transcripts\"\n");

    let expected = fixture.temp_dir.path().join("transcripts");
    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_str().unwrap()))
        .stdout(predicate::str::contains("~/transcripts").not());
}
