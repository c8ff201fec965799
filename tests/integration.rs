//! Integration tests for the contactdesk command line against a mock service

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command as AssertCommand;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Isolated config pointing at a mock contact service
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
    server: MockServer,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let server = MockServer::start();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            format!(
                "[remote]\nbase_url = \"{}/api\"\ntimeout_secs = 5\n\n[logging]\nlevel = \"error\"\n",
                server.base_url()
            ),
        )
        .unwrap();

        Self {
            temp_dir,
            config_path,
            server,
        }
    }

    /// Run contactdesk with this test env's config
    fn contactdesk(&self) -> AssertCommand {
        let mut cmd = contactdesk_cmd();
        cmd.args(["--config", self.config_path.to_str().unwrap()]);
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn write_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }
}

/// Get the contactdesk binary command
fn contactdesk_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("contactdesk").unwrap()
}

fn contact_json(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        "phone": format!("+1 555 {:04}", id)
    })
}

// =============================================================================
// list / show
// =============================================================================

#[test]
fn test_list_prints_page() {
    let env = TestEnv::new();
    let mock = env.server.mock(|when, then| {
        when.method(GET)
            .path("/api/contacts")
            .query_param("q", "ana")
            .query_param("page", "0")
            .query_param("size", "10");
        then.status(200).json_body(json!({
            "content": [contact_json(1, "Ana Lima"), contact_json(2, "Mariana Souza")],
            "totalPages": 1,
            "totalElements": 2
        }));
    });

    env.contactdesk()
        .args(["list", "--query", "ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 contacts | showing page 1 of 1"))
        .stdout(predicate::str::contains("Ana Lima"))
        .stdout(predicate::str::contains("Mariana Souza"))
        .stdout(predicate::str::contains("Clear search").not());
    mock.assert();
}

#[test]
fn test_list_empty_search_offers_clear() {
    let env = TestEnv::new();
    env.server.mock(|when, then| {
        when.method(GET).path("/api/contacts").query_param("q", "zzz");
        then.status(200)
            .json_body(json!({"content": [], "totalPages": 0, "totalElements": 0}));
    });

    env.contactdesk()
        .args(["list", "--query", "zzz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No contacts found for \"zzz\""))
        .stdout(predicate::str::contains("Clear search"));
}

#[test]
fn test_list_page_past_end_is_clamped() {
    let env = TestEnv::new();
    env.server.mock(|when, then| {
        when.method(GET).path("/api/contacts").query_param("page", "8");
        then.status(200)
            .json_body(json!({"content": [], "totalPages": 2, "totalElements": 7}));
    });
    let last = env.server.mock(|when, then| {
        when.method(GET).path("/api/contacts").query_param("page", "1");
        then.status(200).json_body(json!({
            "content": [contact_json(6, "Yuki Tanaka"), contact_json(7, "Zoe Park")],
            "totalPages": 2,
            "totalElements": 7
        }));
    });

    env.contactdesk()
        .args(["list", "--page", "9", "--size", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("showing page 2 of 2"))
        .stdout(predicate::str::contains("Zoe Park"));
    last.assert();
}

#[test]
fn test_list_failure_exits_nonzero() {
    let env = TestEnv::new();
    env.server.mock(|when, then| {
        when.method(GET).path("/api/contacts");
        then.status(500).json_body(json!({"message": "database offline"}));
    });

    env.contactdesk()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("database offline"));
}

#[test]
fn test_show_uses_placeholder_avatar() {
    let env = TestEnv::new();
    env.server.mock(|when, then| {
        when.method(GET).path("/api/contacts/4");
        then.status(200).json_body(contact_json(4, "Jessica Wang"));
    });

    env.contactdesk()
        .args(["show", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name:   Jessica Wang"))
        .stdout(predicate::str::contains("https://ui-avatars.com/api/?name=Jessica+Wang"))
        .stdout(predicate::str::contains("(JW)"));
}

// =============================================================================
// add / edit / delete
// =============================================================================

#[test]
fn test_add_rejects_empty_email_without_request() {
    let env = TestEnv::new();

    env.contactdesk()
        .args(["add", "--name", "Jessica Wang", "--email", "", "--phone", "+1 555 0100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("email: Email is required."))
        .stderr(predicate::str::contains("name:").not());
}

#[test]
fn test_add_creates_contact() {
    let env = TestEnv::new();
    let mock = env.server.mock(|when, then| {
        when.method(POST).path("/api/contacts").json_body(json!({
            "name": "Jessica Wang",
            "email": "jessica@example.com",
            "phone": "+1 555 0100"
        }));
        then.status(201).json_body(json!({
            "id": 31,
            "name": "Jessica Wang",
            "email": "jessica@example.com",
            "phone": "+1 555 0100"
        }));
    });

    env.contactdesk()
        .args([
            "add",
            "--name",
            " Jessica Wang ",
            "--email",
            "jessica@example.com",
            "--phone",
            "+1 555 0100",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Contact created successfully"))
        .stdout(predicate::str::contains("id: 31"));
    mock.assert();
}

#[test]
fn test_add_refuses_unsupported_avatar() {
    let env = TestEnv::new();
    let gif = env.write_file("face.gif", b"GIF89a");

    env.contactdesk()
        .args([
            "add",
            "--name",
            "Jessica Wang",
            "--email",
            "jessica@example.com",
            "--phone",
            "+1 555 0100",
            "--avatar",
            gif.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "avatar: Unsupported file type. Use JPG, PNG, or WebP.",
        ));
}

#[test]
fn test_add_surfaces_server_message() {
    let env = TestEnv::new();
    env.server.mock(|when, then| {
        when.method(POST).path("/api/contacts");
        then.status(409).json_body(json!({"message": "Email already exists"}));
    });

    env.contactdesk()
        .args([
            "add",
            "--name",
            "Jessica Wang",
            "--email",
            "jessica@example.com",
            "--phone",
            "+1 555 0100",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Email already exists"));
}

#[test]
fn test_edit_remove_avatar_sends_sentinel() {
    let env = TestEnv::new();
    env.server.mock(|when, then| {
        when.method(GET).path("/api/contacts/3");
        then.status(200).json_body(json!({
            "id": 3,
            "name": "Sunny Reddy",
            "email": "sunny@example.com",
            "phone": "+1 555 222 3333",
            "avatarUrl": "https://cdn.example.com/3.png"
        }));
    });
    let update = env.server.mock(|when, then| {
        when.method(PUT)
            .path("/api/contacts/3")
            .body_includes("Sunny Reddy")
            .body_includes("name=\"avatar\"")
            .body_includes("filename=\"\"");
        then.status(200);
    });

    env.contactdesk()
        .args(["edit", "3", "--remove-avatar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Contact updated successfully"));
    update.assert();
}

#[test]
fn test_edit_uploads_new_avatar() {
    let env = TestEnv::new();
    let png = env.write_file("face.png", b"\x89PNG\r\n\x1a\n");
    env.server.mock(|when, then| {
        when.method(GET).path("/api/contacts/3");
        then.status(200).json_body(contact_json(3, "Sunny Reddy"));
    });
    let update = env.server.mock(|when, then| {
        when.method(PUT)
            .path("/api/contacts/3")
            .body_includes("+44 20 7946 0000")
            .body_includes("filename=\"face.png\"")
            .body_includes("image/png");
        then.status(200);
    });

    env.contactdesk()
        .args([
            "edit",
            "3",
            "--phone",
            "+44 20 7946 0000",
            "--avatar",
            png.to_str().unwrap(),
        ])
        .assert()
        .success();
    update.assert();
}

#[test]
fn test_delete_with_yes() {
    let env = TestEnv::new();
    let mock = env.server.mock(|when, then| {
        when.method(DELETE).path("/api/contacts/7");
        then.status(204);
    });

    env.contactdesk()
        .args(["delete", "7", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Contact deleted"));
    mock.assert();
}

#[test]
fn test_delete_declined_at_prompt() {
    let env = TestEnv::new();

    env.contactdesk()
        .args(["delete", "7"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));
}

#[test]
fn test_delete_failure_reports_error() {
    let env = TestEnv::new();
    env.server.mock(|when, then| {
        when.method(DELETE).path("/api/contacts/7");
        then.status(404).json_body(json!({"message": "Contact not found"}));
    });

    env.contactdesk()
        .args(["delete", "7", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Contact not found"));
}

// =============================================================================
// browse / config
// =============================================================================

#[test]
fn test_browse_selects_and_quits() {
    let env = TestEnv::new();
    env.server.mock(|when, then| {
        when.method(GET).path("/api/contacts");
        then.status(200).json_body(json!({
            "content": [contact_json(1, "Ana Lima"), contact_json(2, "Bruno Costa")],
            "totalPages": 1,
            "totalElements": 2
        }));
    });

    env.contactdesk()
        .arg("browse")
        .write_stdin(":h\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(":q to quit"))
        .stdout(predicate::str::contains("toggle row N"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    contactdesk_cmd()
        .args(["--config", missing.to_str().unwrap(), "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_base_url_flag_overrides_config() {
    let env = TestEnv::new();
    let other = MockServer::start();
    let mock = other.mock(|when, then| {
        when.method(GET).path("/v2/contacts");
        then.status(200)
            .json_body(json!({"content": [], "totalPages": 0, "totalElements": 0}));
    });

    env.contactdesk()
        .args(["--base-url", &format!("{}/v2", other.base_url()), "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No contacts yet"));
    mock.assert();
}
