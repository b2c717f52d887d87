//! Integration tests driving the built binary
//!
//! These exercise argument handling, JSON output and the archive command
//! end to end against a temporary archive tree. Nothing here touches the
//! raster engine.

use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn geoinv_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // test binary name
    path.pop(); // 'deps' directory
    path.push("geoinv");
    path
}

#[test]
fn inventory_json_output_is_valid() {
    let archive = TempDir::new().unwrap();
    let output = Command::new(geoinv_bin())
        .args(["inventory", "--json"])
        .env("GEOINV_ARCHIVE_ROOT", archive.path())
        .output()
        .expect("failed to execute geoinv");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("output should be valid JSON");
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["data"]["files"], 0);
    assert_eq!(parsed["data"]["dataset"], "aod");
}

#[test]
fn unknown_dataset_fails_with_available_list() {
    let archive = TempDir::new().unwrap();
    let output = Command::new(geoinv_bin())
        .args(["--dataset", "landsat", "inventory"])
        .env("GEOINV_ARCHIVE_ROOT", archive.path())
        .output()
        .expect("failed to execute geoinv");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("landsat"), "stderr: {stderr}");
    assert!(stderr.contains("aod"), "stderr: {stderr}");
}

#[test]
fn process_without_products_fails() {
    let archive = TempDir::new().unwrap();
    let output = Command::new(geoinv_bin())
        .args(["process"])
        .env("GEOINV_ARCHIVE_ROOT", archive.path())
        .output()
        .expect("failed to execute geoinv");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No products requested"), "stderr: {stderr}");
}

#[test]
fn archive_files_granules_into_date_directories() {
    let archive = TempDir::new().unwrap();
    let stage = archive.path().join("mod08/stage");
    std::fs::create_dir_all(&stage).unwrap();
    let granule = "MOD08_D3.A2012204.061.2017310140249.hdf";
    std::fs::write(stage.join(granule), "granule").unwrap();

    let output = Command::new(geoinv_bin())
        .args(["archive", "--json"])
        .env("GEOINV_ARCHIVE_ROOT", archive.path())
        .output()
        .expect("failed to execute geoinv");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["data"]["archived"], 1);
    assert_eq!(parsed["data"]["failed"], 0);

    let filed = archive.path().join("mod08/tiles/2012/204").join(granule);
    assert!(filed.is_file(), "granule should be filed under year/doy");
    assert!(!stage.join(granule).exists(), "stage copy should be moved");
}

#[test]
fn archive_keep_leaves_the_source_in_place() {
    let archive = TempDir::new().unwrap();
    let incoming = TempDir::new().unwrap();
    let granule = "MYD08_D3.A2013010.061.2017310140249.hdf";
    std::fs::write(incoming.path().join(granule), "granule").unwrap();

    let output = Command::new(geoinv_bin())
        .args(["archive", "--keep"])
        .arg(incoming.path())
        .env("GEOINV_ARCHIVE_ROOT", archive.path())
        .output()
        .expect("failed to execute geoinv");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(incoming.path().join(granule).exists());
    assert!(archive
        .path()
        .join("mod08/tiles/2013/010")
        .join(granule)
        .is_file());
}

#[test]
fn list_products_names_driver_products() {
    let archive = TempDir::new().unwrap();
    let output = Command::new(geoinv_bin())
        .args(["inventory", "--list-products", "--json"])
        .env("GEOINV_ARCHIVE_ROOT", archive.path())
        .output()
        .expect("failed to execute geoinv");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["data"]["aero"].is_string());
    assert!(parsed["data"]["aerolta"].is_string());
}

#[test]
fn invalid_date_range_fails_with_suggestion() {
    let archive = TempDir::new().unwrap();
    let output = Command::new(geoinv_bin())
        .args(["inventory", "--dates", "not-a-date"])
        .env("GEOINV_ARCHIVE_ROOT", archive.path())
        .output()
        .expect("failed to execute geoinv");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not-a-date"), "stderr: {stderr}");
}
