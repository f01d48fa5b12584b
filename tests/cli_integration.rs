use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const REF: &str = "PPMS2-NICatKings-20191101";

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("ppms-invoice-{prefix}-{}-{nanos}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write test file");
}

/// Run the binary with HOME pointed at `home` so no real settings leak in
fn run_invoice(args: &[&str], home: &Path) -> (bool, String, String) {
    let bin = std::env::var("CARGO_BIN_EXE_ppms-invoice").unwrap_or_else(|_| {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("target");
        path.push("debug");
        if cfg!(windows) {
            path.push("ppms-invoice.exe");
        } else {
            path.push("ppms-invoice");
        }
        path.to_string_lossy().into_owned()
    });
    let output = Command::new(bin)
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .output()
        .expect("run ppms-invoice");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn config_arg(root: &Path) -> String {
    root.join("config.toml").to_string_lossy().into_owned()
}

#[test]
fn config_init_then_show_and_set() {
    let root = unique_temp_dir("config");
    let config = config_arg(&root);

    let (ok, _, stderr) = run_invoice(&["--config", &config, "config", "init"], &root);
    assert!(ok, "stderr: {stderr}");
    assert!(Path::new(&config).exists());

    let (ok, _, stderr) = run_invoice(&["--config", &config, "config", "init"], &root);
    assert!(!ok);
    assert!(stderr.contains("--force"), "stderr: {stderr}");

    let (ok, _, stderr) = run_invoice(
        &["--config", &config, "config", "set", "mail.test_mode", "true"],
        &root,
    );
    assert!(ok, "stderr: {stderr}");
    let (ok, _, _) = run_invoice(&["--config", &config, "config", "set", "mail.port", "25"], &root);
    assert!(ok);

    let (ok, stdout, _) = run_invoice(&["--config", &config, "config", "show"], &root);
    assert!(ok);
    assert!(stdout.contains("test_mode = true"), "stdout: {stdout}");
    assert!(stdout.contains("port = 25"), "stdout: {stdout}");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn config_set_rejects_unknown_key_and_bad_type() {
    let root = unique_temp_dir("config-bad");
    let config = config_arg(&root);

    let (ok, _, stderr) = run_invoice(&["--config", &config, "config", "set", "mail.nope", "1"], &root);
    assert!(!ok);
    assert!(stderr.starts_with("Error: Config error"), "stderr: {stderr}");

    let (ok, _, _) = run_invoice(&["--config", &config, "config", "set", "mail.port", "lots"], &root);
    assert!(!ok);
    assert!(!Path::new(&config).exists());

    fs::remove_dir_all(&root).ok();
}

#[test]
fn config_show_json_masks_secrets() {
    let root = unique_temp_dir("config-json");
    let config = root.join("config.toml");
    write_file(
        &config,
        "[api]\nurl = \"https://ppms.example.ac.uk/pumapi/\"\nkey = \"secret-key\"\n\n[mail]\npassword = \"hunter2\"\n",
    );
    let config = config.to_string_lossy().into_owned();

    let (ok, stdout, stderr) = run_invoice(&["--config", &config, "--json", "config", "show"], &root);
    assert!(ok, "stderr: {stderr}");
    let json: Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(json["api"]["url"], "https://ppms.example.ac.uk/pumapi/");
    assert_eq!(json["api"]["key"], "********");
    assert_eq!(json["mail"]["password"], "********");
    assert!(!stdout.contains("hunter2"));

    fs::remove_dir_all(&root).ok();
}

#[test]
fn config_path_prefers_explicit_file() {
    let root = unique_temp_dir("config-path");
    let config = config_arg(&root);
    let (ok, stdout, _) = run_invoice(&["--config", &config, "config", "path"], &root);
    assert!(ok);
    assert_eq!(stdout.trim(), config);

    let (ok, stdout, _) = run_invoice(&["config", "path"], &root);
    assert!(ok);
    assert!(stdout.trim().ends_with("config.toml"), "stdout: {stdout}");
    assert!(stdout.contains("ppms-invoice"), "stdout: {stdout}");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn message_substitutes_placeholders() {
    let root = unique_temp_dir("message");
    let config = root.join("config.toml");
    write_file(
        &config,
        r#"[facility]
name = "NIC"
email = "nic@example.ac.uk"

[general]
message_text = "Charges for {MONTH} {YEAR}\nContact {F_NAME}: {F_EMAIL}"
"#,
    );
    let config = config.to_string_lossy().into_owned();

    let (ok, stdout, stderr) = run_invoice(&["--config", &config, "message", REF], &root);
    assert!(ok, "stderr: {stderr}");
    assert_eq!(
        stdout.trim(),
        "Charges for October 2019<br/>Contact NIC: <a href='mailto:nic@example.ac.uk'>nic@example.ac.uk</a>"
    );

    let (ok, stdout, _) = run_invoice(&["--config", &config, "-j", "message", "PPMS2-NICatKings-20200101-DRAFT"], &root);
    assert!(ok);
    let json: Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(json["period"]["sessions_month"], "December");
    assert_eq!(json["period"]["invoice_year"], "2020");
    assert_eq!(json["period"]["draft"], true);
    assert!(json["message"].as_str().unwrap().starts_with("Charges for December 2020"));

    fs::remove_dir_all(&root).ok();
}

#[test]
fn message_with_unknown_placeholder_fails() {
    let root = unique_temp_dir("message-bad");
    let config = root.join("config.toml");
    write_file(&config, "[general]\nmessage_text = \"Hi {NOBODY}\"\n");
    let config = config.to_string_lossy().into_owned();

    let (ok, _, stderr) = run_invoice(&["--config", &config, "message", REF], &root);
    assert!(!ok);
    assert!(stderr.contains("{NOBODY}"), "stderr: {stderr}");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn bad_reference_is_rejected_before_any_request() {
    let root = unique_temp_dir("bad-ref");
    let config = config_arg(&root);

    for args in [
        vec!["show", "PPMS2-NICatKings-2019"],
        vec!["export", "nonsense"],
        vec!["preview", "PPMS2-NICatKings-2019xx01", "AC1"],
        vec!["message", "short"],
    ] {
        let mut full = vec!["--config", config.as_str()];
        full.extend(args);
        let (ok, _, stderr) = run_invoice(&full, &root);
        assert!(!ok);
        assert!(stderr.contains("Invalid invoice reference"), "stderr: {stderr}");
    }

    fs::remove_dir_all(&root).ok();
}

#[test]
fn send_without_mail_server_fails_early() {
    let root = unique_temp_dir("send");
    let config = config_arg(&root);

    let (ok, _, stderr) = run_invoice(&["--config", &config, "send", REF, "--all"], &root);
    assert!(!ok);
    assert!(stderr.contains("mail.server is not set"), "stderr: {stderr}");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn unreachable_api_reports_connectivity_error() {
    let root = unique_temp_dir("offline");
    let config = root.join("config.toml");
    write_file(&config, "[api]\nurl = \"http://127.0.0.1:1/pumapi/\"\nkey = \"k\"\n");
    let config = config.to_string_lossy().into_owned();

    let (ok, stdout, stderr) = run_invoice(&["--config", &config, "list"], &root);
    assert!(!ok);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Response not received from PPMS"), "stderr: {stderr}");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn send_requires_account_selection() {
    let root = unique_temp_dir("send-args");
    let (ok, _, stderr) = run_invoice(&["send", REF], &root);
    assert!(!ok);
    assert!(stderr.contains("--account"), "stderr: {stderr}");
    fs::remove_dir_all(&root).ok();
}
