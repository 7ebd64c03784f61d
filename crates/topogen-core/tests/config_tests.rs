use std::fs;

use tempfile::TempDir;
use topogen_core::Config;

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_from(dir.path(), None).unwrap();

    assert_eq!(config.backend, "native");
    assert_eq!(config.topology.num_pods, 10);
    assert_eq!(config.topology.services, vec!["api", "web", "worker"]);
}

#[test]
fn layered_files_resolve_in_precedence_order() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "topogen.toml",
        r#"
backend = "native"

[topology]
num_pods = 5
num_nodes = 2
"#,
    );
    write(
        &dir,
        "topogen.native.toml",
        r#"
[topology]
num_pods = 7
"#,
    );
    write(
        &dir,
        "topogen.local.toml",
        r#"
[topology]
num_pods = 9
"#,
    );

    let config = Config::load_from(dir.path(), None).unwrap();

    // Local override wins over backend file wins over base.
    assert_eq!(config.topology.num_pods, 9);
    // Keys only the base file sets survive the merge.
    assert_eq!(config.topology.num_nodes, 2);
}

#[test]
fn backend_hint_selects_the_backend_file() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "topogen.bkbase.toml",
        r#"
[bkbase]
api_url = "https://bkbase.example.com/query"
app_secret = "s3cret"
result_table_id = "2_bkmonitor_bkop_2"
"#,
    );

    let config = Config::load_from(dir.path(), Some("bkbase")).unwrap();
    assert_eq!(config.backend, "bkbase");
    assert_eq!(config.bkbase.api_url, "https://bkbase.example.com/query");

    // Without the hint the bkbase file does not apply.
    let config = Config::load_from(dir.path(), None).unwrap();
    assert_eq!(config.backend, "native");
    assert!(config.bkbase.api_url.is_empty());
}

#[test]
fn environment_overrides_beat_files() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "topogen.toml",
        r#"
[topology]
biz_name = "filebiz"
"#,
    );

    std::env::set_var("BIZ_NAME", "acme");
    let config = Config::load_from(dir.path(), None).unwrap();
    std::env::remove_var("BIZ_NAME");

    assert_eq!(config.topology.biz_name, "acme");
}
