use assert_cmd::cargo::cargo_bin_cmd;
use lopdf::{dictionary, Document, Object};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::new(width, height)
        .save(&path)
        .expect("png fixture should be written");
    path
}

fn write_pdf(dir: &Path, name: &str, media_boxes: &[(i64, i64)]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for (width, height) in media_boxes {
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(*width),
                Object::Integer(*height),
            ],
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).expect("pdf fixture should be written");
    path
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("script.json");
    fs::write(&path, body).expect("script should be written");
    path
}

const END_TO_END_SCRIPT: &str = r#"[
    {"op": "calibrate", "from": {"x": 100, "y": 100}, "to": {"x": 100, "y": 200}, "distance": 10},
    {"op": "line", "from": {"x": 100, "y": 100}, "to": {"x": 100, "y": 300}},
    {"op": "area", "from": {"x": 0, "y": 0}, "to": {"x": 100, "y": 50}},
    {"op": "scale", "value": 0.2}
]"#;

#[test]
fn info_reports_pages_and_surface() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "set.pdf", &[(612, 792), (1224, 792)]);

    let output = cargo_bin_cmd!("takeoff-cli")
        .arg("info")
        .arg(&pdf)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["page_count"], 2);
    assert_eq!(value["first_page_px"]["width"], 612);
    assert_eq!(value["first_page_px"]["height"], 792);
}

#[test]
fn measure_replays_end_to_end_example() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let png = write_png(temp.path(), "plan.png", 1000, 800);
    let script = write_script(temp.path(), END_TO_END_SCRIPT);

    let output = cargo_bin_cmd!("takeoff-cli")
        .arg("measure")
        .arg(&png)
        .arg("--script")
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["source_ref"], "plan.png");
    assert_eq!(value["scale"], 0.2);
    let measurements = value["measurements"].as_array().expect("measurements array");
    assert_eq!(measurements.len(), 2);
    assert_eq!(measurements[0]["kind"], "line");
    assert_eq!(measurements[0]["formatted"], "40.00 ft");
    assert_eq!(measurements[1]["kind"], "area");
    assert_eq!(measurements[1]["formatted"], "200.00 ft²");
}

#[test]
fn measure_writes_csv_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let png = write_png(temp.path(), "plan.png", 1000, 800);
    let script = write_script(temp.path(), END_TO_END_SCRIPT);
    let output_path = temp.path().join("out").join("takeoff.csv");

    cargo_bin_cmd!("takeoff-cli")
        .arg("measure")
        .arg(&png)
        .arg("--script")
        .arg(&script)
        .arg("--format")
        .arg("csv")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("takeoff.csv"));

    let csv = fs::read_to_string(&output_path).expect("csv output should exist");
    assert!(csv.starts_with("ID,Page,Type,Value,Unit"));
    assert!(csv.contains(",line,40.0000,ft,"));
    assert!(csv.contains("TOTAL,0,area,200.0000"));
}

#[test]
fn measure_honours_unit_env_override() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let png = write_png(temp.path(), "plan.png", 400, 300);
    let script = write_script(
        temp.path(),
        r#"[{"op": "line", "from": {"x": 0, "y": 0}, "to": {"x": 30, "y": 40}}]"#,
    );

    cargo_bin_cmd!("takeoff-cli")
        .arg("measure")
        .arg(&png)
        .arg("--script")
        .arg(&script)
        .env("TAKEOFF_UNIT", "m")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"formatted\": \"50.00 m\""))
        .stdout(predicate::str::contains("\"scale\": null"));
}

#[test]
fn measure_fails_for_bad_scale() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let png = write_png(temp.path(), "plan.png", 100, 100);
    let script = write_script(temp.path(), r#"[{"op": "scale", "value": -1}]"#);

    cargo_bin_cmd!("takeoff-cli")
        .arg("measure")
        .arg(&png)
        .arg("--script")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("step 1 failed"));
}

#[test]
fn measure_fails_for_out_of_range_page() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "set.pdf", &[(600, 400)]);
    let script = write_script(temp.path(), r#"[{"op": "page", "index": 4}]"#);

    cargo_bin_cmd!("takeoff-cli")
        .arg("measure")
        .arg(&pdf)
        .arg("--script")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn info_fails_for_missing_file() {
    cargo_bin_cmd!("takeoff-cli")
        .arg("info")
        .arg("does-not-exist.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_unsupported_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("notes.txt");
    fs::write(&path, "not a drawing").expect("fixture should be written");

    cargo_bin_cmd!("takeoff-cli")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open drawing"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("takeoff-cli")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
