use std::fs;
use std::process::Command;

use tempfile::TempDir;

#[test]
fn help_lists_the_override_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_helios"))
        .arg("--help")
        .output()
        .expect("failed to run helios --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--config", "--scene", "--size", "--reload-interval", "--no-watch", "--print-config"] {
        assert!(stdout.contains(flag), "help output is missing {flag}");
    }
}

#[test]
fn print_config_resolves_file_and_overrides_without_a_window() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        "[assets.raymarch_program]\nscene_file = \"spheres.comp\"\nscene_reload_interval = 250\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_helios"))
        .arg("--config")
        .arg(&config)
        .args(["--size", "640x480", "--print-config"])
        .output()
        .expect("failed to run helios --print-config");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("width = 640"));
    assert!(stdout.contains("height = 480"));
    assert!(stdout.contains("scene_file = \"spheres.comp\""));
    assert!(stdout.contains("scene_reload_interval = \"250ms\""));
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_helios"))
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--print-config")
        .output()
        .expect("failed to run helios --print-config");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("width = 1280"));
    assert!(stdout.contains("main_file = \"raymarch_main.comp\""));
}

#[test]
fn invalid_size_is_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_helios"))
        .args(["--size", "wide", "--print-config"])
        .output()
        .expect("failed to run helios");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("WIDTHxHEIGHT"));
}
