use std::{
    fs,
    path::PathBuf,
    process::{Command, Output},
};

fn write_config(name: &str, text: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("rc_drive_{}_{}.toml", std::process::id(), name));
    fs::write(&path, text).unwrap();
    path
}

fn run_drive(config: &PathBuf, extra: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_rc_drive"))
        .arg("--config")
        .arg(config)
        .args(extra)
        .env("RUST_LOG", "info")
        .output()
        .unwrap();
    let _ = fs::remove_file(config);
    output
}

#[test]
fn debug_run_stops_itself_and_exits_zero() {
    let config = write_config(
        "self_test",
        r#"
        [source]
        kind = "joystick"
        port = 0
        interface = "127.0.0.1"

        [control]
        period_ms = 1
        self_test_ticks = 5

        [actuator]
        backend = "log"
        "#,
    );

    let output = run_drive(&config, &["--debug", "--source", "multicast"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    // Hosts without a multicast-capable interface cannot join the group.
    if !output.status.success() && stderr.contains("Failed to join multicast group") {
        eprintln!("skipping: multicast unavailable here\n{stderr}");
        return;
    }

    assert!(output.status.success(), "exit {:?}\n{stderr}", output.status);
    assert!(stderr.contains("SelfTestComplete"), "{stderr}");
    assert!(stderr.contains("ticks=5"), "{stderr}");
    assert!(stderr.contains("standby line low"), "{stderr}");
}

#[test]
fn invalid_config_exits_non_zero() {
    let config = write_config("invalid", "[mapping]\nsteer_span = nan\n");

    let output = run_drive(&config, &["--debug"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("steer_span"), "{stderr}");
}
