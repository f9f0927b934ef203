// End-to-end tests driving the forza-catalog binary against a scratch
// catalog layout: config, CSV export, JSON snapshot, TDS tree, images.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONFIG: &str = r#"
name = "Test Catalog"

[[sources.files]]
name = "consolidated"
file = "data/productsConsolidated.json"
format = "json"

[[sources.files]]
name = "export"
file = "export.csv"
format = "csv"

[merge]
precedence = ["consolidated", "export"]

[assets]
tds_root = "TDS"
image_dir = "images"

[output]
consolidated = "data/productsConsolidated.json"
audit = "data/catalog-audit.json"
"#;

const EXPORT_CSV: &str = "\
ID,Name,Description,Category,Industry,PDF Links\n\
OS2,ForzaSEAL OS2,Neutral-cure silicone sealant,SEAL,marine,\n\
T605,ForzaTAPE T605,Double-sided acrylic foam tape,TAPE,industrial,\n";

fn forza(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_forza-catalog"));
    cmd.current_dir(dir);
    cmd
}

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn scratch_catalog() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "catalog.toml", CONFIG);
    write(dir.path(), "export.csv", EXPORT_CSV);
    write(
        dir.path(),
        "TDS/1. Industrial/T605/TDS/FORZA_TDS_T605.pdf",
        "%PDF-1.4 stub",
    );
    dir
}

fn run_ok(dir: &Path, args: &[&str]) -> Output {
    let output = forza(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn load_store(dir: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join("data/productsConsolidated.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn product<'a>(store: &'a serde_json::Value, id: &str) -> &'a serde_json::Value {
    store["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .unwrap_or_else(|| panic!("product {id} not in store"))
}

#[test]
fn run_links_discovered_tds_and_generates_defaults() {
    let dir = scratch_catalog();
    run_ok(dir.path(), &["run", "--config", "catalog.toml"]);

    let store = load_store(dir.path());
    assert_eq!(store["products"].as_array().unwrap().len(), 2);

    let t605 = product(&store, "t605");
    assert_eq!(
        t605["standardTdsLink"],
        "/TDS/1. Industrial/T605/TDS/FORZA_TDS_T605.pdf"
    );
    assert_eq!(t605["hasTdsLink"], true);

    let os2 = product(&store, "os2");
    assert_eq!(os2["standardTdsLink"], "/TDS/2. Marine/OS2/TDS/FORZA_TDS_OS2.pdf");
    assert_eq!(os2["hasTdsLink"], false);
    assert_eq!(os2["chemistry"], "Silicone");

    // Audit written alongside.
    assert!(dir.path().join("data/catalog-audit.json").exists());
}

#[test]
fn second_run_reproduces_the_products_array() {
    let dir = scratch_catalog();
    run_ok(dir.path(), &["run", "--config", "catalog.toml"]);
    let first = load_store(dir.path());

    run_ok(dir.path(), &["run", "--config", "catalog.toml"]);
    let second = load_store(dir.path());

    assert_eq!(first["products"], second["products"]);
}

#[test]
fn category_conflict_fails_without_touching_the_store() {
    let dir = scratch_catalog();
    run_ok(dir.path(), &["run", "--config", "catalog.toml"]);

    // A snapshot that disagrees with the export on category.
    write(
        dir.path(),
        "data/productsConsolidated.json",
        r#"{"products": [{"id": "os2", "name": "ForzaSEAL OS2", "category": "BOND"}]}"#,
    );
    let manual = std::fs::read_to_string(dir.path().join("data/productsConsolidated.json")).unwrap();

    let output = forza(dir.path())
        .args(["run", "--config", "catalog.toml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("category conflict"), "stderr: {stderr}");

    // The store is exactly what we wrote by hand; nothing was persisted.
    let after = std::fs::read_to_string(dir.path().join("data/productsConsolidated.json")).unwrap();
    assert_eq!(after, manual);
}

#[test]
fn json_flag_emits_a_single_json_value() {
    let dir = scratch_catalog();
    let output = run_ok(dir.path(), &["run", "--config", "catalog.toml", "--json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let audit: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(audit["totalProducts"], 2);
}

#[test]
fn dry_run_writes_nothing() {
    let dir = scratch_catalog();
    run_ok(dir.path(), &["run", "--config", "catalog.toml", "--dry-run"]);
    assert!(!dir.path().join("data/productsConsolidated.json").exists());
}

#[test]
fn validate_accepts_good_and_rejects_bad_configs() {
    let dir = scratch_catalog();
    run_ok(dir.path(), &["validate", "catalog.toml"]);

    write(
        dir.path(),
        "bad.toml",
        "[[sources.files]]\nname = \"a\"\nfile = \"x.csv\"\nformat = \"csv\"\n\n[merge]\nprecedence = [\"nope\"]\n",
    );
    let output = forza(dir.path()).args(["validate", "bad.toml"]).output().unwrap();
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn missing_sources_are_skipped_with_a_warning() {
    let dir = scratch_catalog();
    let output = run_ok(dir.path(), &["run", "--config", "catalog.toml"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("source 'consolidated' missing"), "stderr: {stderr}");
}

#[test]
fn export_round_trips_the_store() {
    let dir = scratch_catalog();
    run_ok(dir.path(), &["run", "--config", "catalog.toml"]);
    run_ok(
        dir.path(),
        &["export", "--config", "catalog.toml", "-o", "out.csv"],
    );

    let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
    assert!(csv.starts_with("ID,"));
    assert!(csv.contains("t605"));
    assert!(csv.contains("ForzaSEAL OS2"));
}

#[test]
fn link_assets_fix_copies_to_canonical_location() {
    let dir = scratch_catalog();
    // The document sits outside the canonical folder layout.
    std::fs::remove_dir_all(dir.path().join("TDS")).unwrap();
    write(
        dir.path(),
        "TDS/1. Industrial/T605 old/FORZA_TDS_T605.pdf",
        "%PDF-1.4 stub",
    );
    run_ok(dir.path(), &["run", "--config", "catalog.toml"]);

    run_ok(dir.path(), &["link-assets", "--config", "catalog.toml", "--fix"]);

    let canonical = dir
        .path()
        .join("TDS/1. Industrial/T605/TDS/FORZA_TDS_T605.pdf");
    assert!(canonical.is_file());
    // The original is copied, not deleted.
    assert!(dir
        .path()
        .join("TDS/1. Industrial/T605 old/FORZA_TDS_T605.pdf")
        .is_file());

    let store = load_store(dir.path());
    assert_eq!(
        product(&store, "t605")["standardTdsLink"],
        "/TDS/1. Industrial/T605/TDS/FORZA_TDS_T605.pdf"
    );
}

#[test]
fn images_are_matched_from_the_flat_directory() {
    let dir = scratch_catalog();
    write(dir.path(), "images/t605.png", "png");
    write(dir.path(), "images/os2.jpg", "jpg");
    run_ok(dir.path(), &["run", "--config", "catalog.toml"]);

    let store = load_store(dir.path());
    assert_eq!(product(&store, "t605")["imageUrl"], "/product-images/t605.png");
    assert_eq!(product(&store, "os2")["imageUrl"], "/product-images/os2.jpg");
}
