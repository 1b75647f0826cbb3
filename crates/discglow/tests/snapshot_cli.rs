use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn discglow(config_dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_discglow"))
        .env("DISCGLOW_CONFIG_DIR", config_dir.path())
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run discglow")
}

fn printed_path(output: &Output) -> PathBuf {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    PathBuf::from(stdout.trim())
}

#[test]
fn snapshot_writes_a_dated_png_at_export_density() {
    let config_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("captures");

    let output = discglow(
        &config_dir,
        &[
            "snapshot",
            "--size",
            "48x32",
            "--time",
            "1.5",
            "--output-dir",
            out_dir.to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "snapshot failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let path = printed_path(&output);
    assert_eq!(path.parent(), Some(out_dir.as_path()));
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("disc-image-"), "unexpected name {name}");
    assert!(name.ends_with(".png"));

    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (96, 64));
    // Corners show the opaque export background, the center shows a disc.
    assert_eq!(image.get_pixel(0, 0).0, [0x11, 0x18, 0x27, 0xff]);
    assert_ne!(image.get_pixel(48, 32).0, [0x11, 0x18, 0x27, 0xff]);
}

#[test]
fn snapshot_does_not_persist_preferences() {
    let config_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let output = discglow(
        &config_dir,
        &["snapshot", "--size", "16x16", "--output-dir", out.path().to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(!config_dir.path().join("preferences.toml").exists());
}

#[test]
fn config_export_applies_the_imported_file() {
    let config_dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = out.path().join("input.json");
    fs::write(
        &input,
        r#"{"discs": {"distance": 1.2, "ellipsisProportion": 0.7, "centerOffsetX": 0.3, "centerOffsetY": -0.2}}"#,
    )
    .unwrap();

    let output = discglow(
        &config_dir,
        &[
            "config",
            "export",
            "--config",
            input.to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "export failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let path = printed_path(&output);
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("disc-configuration-") && name.ends_with(".json"));

    let exported: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let discs = &exported["discs"];
    let field = |key: &str| discs[key].as_f64().unwrap();
    assert!((field("distance") - 1.2).abs() < 1e-6);
    assert!((field("ellipsisProportion") - 0.7).abs() < 1e-6);
    assert!((field("centerOffsetX") - 0.3).abs() < 1e-6);
    assert!((field("centerOffsetY") + 0.2).abs() < 1e-6);
}

#[test]
fn config_check_rejects_a_document_without_discs() {
    let config_dir = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bad.json");
    fs::write(&file, r#"{"rings": {}}"#).unwrap();

    let output = discglow(&config_dir, &["config", "check", file.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration format"), "stderr: {stderr}");
}

#[test]
fn config_check_reports_skipped_fields() {
    let config_dir = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("partial.json");
    fs::write(&file, r#"{"discs": {"centerOffsetY": 0.4, "distance": null}}"#).unwrap();

    let output = discglow(&config_dir, &["config", "check", file.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("applied: centerOffsetY"));
    assert!(stdout.contains("skipped: distance, ellipsisProportion, centerOffsetX"));
}
