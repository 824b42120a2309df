use std::{fs, process::Command};

fn pounce() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pounce"))
}

#[test]
fn careful_autoplayer_survives_the_round_and_saves_results() {
    let dir = tempfile::tempdir().expect("temp dir");
    let save_path = dir.path().join("save.toml");

    let output = pounce()
        .args(["--name", "Ada", "--seed", "3", "--clumsiness", "0", "--save-file"])
        .arg(&save_path)
        .output()
        .expect("run pounce");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Welcome, Ada!"));
    assert!(stdout.contains("Congratulations, Ada!"));

    let saved = fs::read_to_string(&save_path).expect("save file written");
    assert!(saved.contains("name = \"Ada\""));
    assert!(saved.contains("credits"));
}

#[test]
fn invalid_config_is_rejected_before_playing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config_path = dir.path().join("pounce.toml");
    fs::write(&config_path, "[entities.hamster]\nspawn_every_ms = 10\n").expect("write config");

    let output = pounce()
        .args(["--name", "Ada", "--config"])
        .arg(&config_path)
        .arg("--save-file")
        .arg(dir.path().join("save.toml"))
        .output()
        .expect("run pounce");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("hamster"));
}

#[test]
fn blank_name_flag_falls_back_to_the_default_player() {
    let dir = tempfile::tempdir().expect("temp dir");
    let save_path = dir.path().join("save.toml");

    let output = pounce()
        .args(["--name", "   ", "--seed", "3", "--clumsiness", "0", "--save-file"])
        .arg(&save_path)
        .output()
        .expect("run pounce");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Welcome, Player!"));
    assert!(stdout.contains("Congratulations, Player!"));

    let saved = fs::read_to_string(&save_path).expect("save file written");
    assert!(saved.contains("name = \"Player\""));
}

#[test]
fn nan_clumsiness_is_reported_instead_of_crashing() {
    let dir = tempfile::tempdir().expect("temp dir");

    let output = pounce()
        .args(["--name", "Ada", "--clumsiness", "NaN", "--save-file"])
        .arg(dir.path().join("save.toml"))
        .output()
        .expect("run pounce");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("clumsiness"), "{stderr}");
    assert!(!stderr.contains("panicked"), "{stderr}");
}
