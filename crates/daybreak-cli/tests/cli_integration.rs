//! CLI subprocess integration tests.
//!
//! These run the `daybreak` binary against a temporary data root and check
//! exit codes and JSON output.

use std::path::Path;
use std::process::{Command, Output};

const MANIFEST: &str = r#"
name = "Community"

[applications.game]
type = "client"
name = "The Game"
runtime = "wine"

[applications.hd]
type = "mod"
runtime = "game"

[runtimes.wine]
type = "runtime"
version = "9.0"

[servers.eu]
address = "eu.example.com:2106"
"#;

fn daybreak(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_daybreak"));
    cmd.env("HOME", home)
        .env_remove("DAYBREAK_LOG")
        .arg("--root")
        .arg(home.join("data"))
        .arg("--bundled-themes")
        .arg(home.join("bundled"));
    cmd
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "invalid JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn import_fixture(home: &Path) -> std::path::PathBuf {
    let path = home.join("community.toml");
    std::fs::write(&path, MANIFEST).unwrap();
    let output = daybreak(home).arg("import").arg(&path).output().unwrap();
    assert!(
        output.status.success(),
        "import failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    path
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = daybreak(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("daybreak"));
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = daybreak(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["watch", "list", "resolve", "import", "sources", "theme", "settings"] {
        assert!(stdout.contains(cmd), "help must list '{cmd}'");
    }
}

#[test]
fn fresh_root_shows_default_settings_without_writing() {
    let home = tempfile::tempdir().unwrap();
    let output = daybreak(home.path())
        .args(["--json", "settings"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let settings = json(&output);
    assert_eq!(settings["theme"], "default");
    assert_eq!(settings["auto_patch"], true);
    assert_eq!(settings["paths"]["bin"], "bin");
    assert!(!home.path().join("data").join("settings.json").exists());

    let output = daybreak(home.path())
        .args(["--json", "settings", "--auto-patch", "false"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(json(&output)["auto_patch"], false);
    assert!(home.path().join("data").join("settings.json").is_file());
}

#[test]
fn import_then_list_and_resolve() {
    let home = tempfile::tempdir().unwrap();
    import_fixture(home.path());

    let output = daybreak(home.path())
        .args(["--json", "list", "--kind", "tools"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let tools = json(&output);
    assert_eq!(tools.as_array().unwrap().len(), 1);
    assert_eq!(tools[0]["id"], "hd");

    let output = daybreak(home.path())
        .args(["--json", "resolve", "hd"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let ids: Vec<String> = json(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(ids, vec!["wine", "game", "hd"]);

    let output = daybreak(home.path())
        .args(["--json", "sources", "list"])
        .output()
        .unwrap();
    let sources = json(&output);
    assert_eq!(sources[0]["name"], "Community");
    assert!(sources[0]["url"].as_str().unwrap().starts_with("file://"));
}

#[test]
fn hidden_servers_are_not_listed() {
    let home = tempfile::tempdir().unwrap();
    import_fixture(home.path());

    let output = daybreak(home.path())
        .args(["settings", "--hide-server", "eu"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = daybreak(home.path())
        .args(["--json", "list", "--kind", "servers"])
        .output()
        .unwrap();
    assert!(json(&output).as_array().unwrap().is_empty());

    let output = daybreak(home.path())
        .args(["--json", "list", "--kind", "servers", "--all"])
        .output()
        .unwrap();
    assert_eq!(json(&output)[0]["address"], "eu.example.com:2106");
}

#[test]
fn invalid_manifest_exits_with_manifest_code() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("bad.toml");
    std::fs::write(&path, "name = ").unwrap();

    let output = daybreak(home.path()).arg("import").arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let output = daybreak(home.path())
        .args(["import", "/nonexistent/daybreak.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn resolving_unknown_id_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = daybreak(home.path())
        .args(["resolve", "nothing"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn removing_unknown_source_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = daybreak(home.path())
        .args(["sources", "remove", "https://example.com/none.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn theme_install_selects_theme() {
    let home = tempfile::tempdir().unwrap();
    let theme_dir = home.path().join("dusk-src");
    std::fs::create_dir_all(&theme_dir).unwrap();
    std::fs::write(theme_dir.join("theme.toml"), "name = \"dusk\"\n").unwrap();

    let output = daybreak(home.path())
        .args(["theme", "install"])
        .arg(&theme_dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output = daybreak(home.path())
        .args(["--json", "theme", "list"])
        .output()
        .unwrap();
    let themes = json(&output);
    assert_eq!(themes["current"], "dusk");
    assert_eq!(themes["themes"][0], "dusk");
}

#[test]
fn watch_with_deadline_exits_cleanly() {
    let home = tempfile::tempdir().unwrap();
    import_fixture(home.path());

    let output = daybreak(home.path())
        .args(["--json", "watch", "--seconds", "0"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary = json(&output);
    assert_eq!(summary["sources"], 0);
    assert_eq!(summary["applications"], 2);
    assert_eq!(summary["runtimes"], 1);
}
