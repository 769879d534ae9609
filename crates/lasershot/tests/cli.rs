#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn lasershot() -> Command {
    Command::cargo_bin("lasershot").expect("binary built")
}

fn write_frame(path: &Path, spot: Option<(u32, u32)>) {
    let mut img = image::RgbaImage::from_pixel(64, 36, image::Rgba([0, 0, 0, 255]));
    if let Some((x, y)) = spot {
        img.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
    }
    img.save(path).expect("save frame");
}

#[test]
fn calibrate_then_check() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("store.json");

    lasershot()
        .args(["calibrate", "--camera-id", "cam-a", "--width", "64", "--height", "36"])
        .arg("--store")
        .arg(&store)
        .args(["--corners", "0,0", "64,0", "64,36", "0,36"])
        .assert()
        .success()
        .stdout(predicate::str::contains("["));

    let raw = std::fs::read_to_string(&store).expect("store written");
    assert!(raw.contains("laser-calibration"));

    lasershot()
        .args(["check", "--camera-id", "cam-a", "--width", "64", "--height", "36"])
        .arg("--store")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("valid"));

    lasershot()
        .args(["check", "--camera-id", "cam-b", "--width", "64", "--height", "36"])
        .arg("--store")
        .arg(&store)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("invalid"));
}

#[test]
fn collinear_corners_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("store.json");

    lasershot()
        .arg("calibrate")
        .arg("--store")
        .arg(&store)
        .args(["--corners", "0,0", "10,10", "20,20", "30,30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
    assert!(!store.exists());
}

#[test]
fn detect_prints_shots_as_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames: Vec<_> = [Some((5, 5)), None, Some((6, 5)), Some((50, 30))]
        .into_iter()
        .enumerate()
        .map(|(i, spot)| {
            let p = dir.path().join(format!("f{i}.png"));
            write_frame(&p, spot);
            p
        })
        .collect();

    let out = lasershot()
        .args(["detect", "--width", "64", "--height", "36", "--uncorrected"])
        .args(&frames)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let shots: serde_json::Value = serde_json::from_slice(&out).expect("json");
    let list = shots["shots"].as_array().expect("shots array");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["points"].as_array().map(Vec::len), Some(2));
    assert_eq!(list[1]["points"][0]["timestamp"], 150);
}

#[test]
fn unreadable_store_is_no_calibration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("store.json");
    std::fs::write(&store, "garbage").expect("write store");
    let frame = dir.path().join("f0.png");
    write_frame(&frame, Some((5, 5)));

    lasershot()
        .args(["check", "--width", "64", "--height", "36"])
        .arg("--store")
        .arg(&store)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("invalid"));

    let out = lasershot()
        .args(["detect", "--width", "64", "--height", "36"])
        .arg("--store")
        .arg(&store)
        .arg(&frame)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let shots: serde_json::Value = serde_json::from_slice(&out).expect("json");
    assert_eq!(shots["shots"][0]["points"][0]["x"], 5.5);
}

#[test]
fn missing_subcommand_fails() {
    lasershot().assert().failure();
}
