use assert_cmd::Command;

fn cli() -> Command {
    Command::cargo_bin("ingestion-cli").unwrap()
}

#[test]
fn openapi_prints_operational_paths() {
    let output = cli().arg("openapi").assert().success().get_output().stdout.clone();
    let doc: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(doc["info"]["title"], "Ingestion API");
    assert!(doc["paths"].get("/healthz").is_some());
    assert!(doc["paths"].get("/readyz").is_some());
}

#[test]
fn openapi_writes_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openapi.json");
    cli()
        .args(["openapi", "--output"])
        .arg(&path)
        .assert()
        .success();
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(doc["components"]["schemas"].get("ErrorResponse").is_some());
}

#[test]
fn config_masks_connection_string() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("staging.toml"),
        "[telemetry]\nconnection_string = \"InstrumentationKey=top-secret\"\n",
    )
    .unwrap();

    let output = cli()
        .arg("--config-dir")
        .arg(dir.path())
        .args(["--env", "staging", "config"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert!(!text.contains("top-secret"));
    let properties: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(properties["environment"], "staging");
    assert_eq!(properties["telemetry"]["connection_string"], "<redacted>");
}

#[test]
fn unknown_environment_fails() {
    cli().args(["--env", "qa", "config"]).assert().failure();
}

#[test]
fn env_flag_keeps_config_dir_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("base.toml"),
        "[application]\nname = \"from-config-dir\"\n",
    )
    .unwrap();

    let output = cli()
        .env("INGESTION_CONFIG_DIR", dir.path())
        .args(["--env", "local", "config"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let properties: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(properties["application"]["name"], "from-config-dir");
    assert_eq!(properties["environment"], "local");
}

#[test]
fn config_dir_flag_wins_over_environment() {
    let from_env = tempfile::tempdir().unwrap();
    let from_flag = tempfile::tempdir().unwrap();
    std::fs::write(
        from_env.path().join("base.toml"),
        "[application]\nname = \"from-env\"\n",
    )
    .unwrap();
    std::fs::write(
        from_flag.path().join("base.toml"),
        "[application]\nname = \"from-flag\"\n",
    )
    .unwrap();

    let output = cli()
        .env("INGESTION_CONFIG_DIR", from_env.path())
        .arg("--config-dir")
        .arg(from_flag.path())
        .arg("config")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let properties: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(properties["application"]["name"], "from-flag");
}
