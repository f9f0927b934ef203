use chrono::{DateTime, TimeZone, Utc};

use catalog_recon::assets::NoExtractor;
use catalog_recon::config::CatalogConfig;
use catalog_recon::engine::run;
use catalog_recon::model::{AssetCandidate, Category, Confidence};
use catalog_recon::normalize::{from_csv, from_json, NormalizedSource};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn config(toml: &str) -> CatalogConfig {
    CatalogConfig::from_toml(toml).unwrap()
}

fn export_only() -> CatalogConfig {
    config(
        r#"
[[sources.files]]
name = "export"
file = "x.csv"
format = "csv"

[merge]
precedence = ["export"]
"#,
    )
}

fn candidate(path: &str, token: &str, size: u64) -> AssetCandidate {
    AssetCandidate {
        path: path.into(),
        industry: "industrial".into(),
        token: token.into(),
        file_size: size,
    }
}

// -------------------------------------------------------------------------
// End-to-end
// -------------------------------------------------------------------------

const EXPORT_CSV: &str = "\
ID,Name,Description,Category,Industry,PDF Links,Sizes\n\
OS2,ForzaSEAL OS2,Neutral-cure silicone sealant,SEAL,marine,,300ml\n\
T605,ForzaTAPE T605,Double-sided acrylic foam tape,TAPE,industrial,,25m roll\n";

#[test]
fn end_to_end_links_discovered_tds_and_generates_defaults() {
    let source = from_csv(EXPORT_CSV, "export");
    let candidates = vec![candidate(
        "1. Industrial/T605/TDS/FORZA_TDS_T605.pdf",
        "T605",
        1024,
    )];

    let out = run(
        &export_only(),
        vec![source],
        &candidates,
        &[],
        &NoExtractor,
        now(),
    )
    .unwrap();

    assert_eq!(out.records.len(), 2);

    let os2 = out.records.iter().find(|r| r.id == "os2").unwrap();
    let t605 = out.records.iter().find(|r| r.id == "t605").unwrap();

    // No document on disk: a default path under the industry convention.
    assert_eq!(
        os2.standard_tds_link.as_deref(),
        Some("/TDS/2. Marine/OS2/TDS/FORZA_TDS_OS2.pdf")
    );
    assert!(!os2.has_tds_link);

    // Discovered document wins and marks the record linked.
    assert_eq!(
        t605.standard_tds_link.as_deref(),
        Some("/TDS/1. Industrial/T605/TDS/FORZA_TDS_T605.pdf")
    );
    assert!(t605.has_tds_link);

    // The standard link always appears among the PDF links.
    for r in &out.records {
        let link = r.standard_tds_link.clone().unwrap();
        assert!(r.pdf_links.contains(&link));
    }
}

#[test]
fn classification_follows_category_and_id_prefix() {
    let source = from_csv(EXPORT_CSV, "export");
    let out = run(&export_only(), vec![source], &[], &[], &NoExtractor, now()).unwrap();

    let os2 = out.records.iter().find(|r| r.id == "os2").unwrap();
    let t605 = out.records.iter().find(|r| r.id == "t605").unwrap();

    assert_eq!(os2.chemistry, "Silicone");
    assert_eq!(os2.chemistry_confidence, Confidence::High);
    assert_eq!(t605.category, Some(Category::Tape));
    assert_eq!(t605.chemistry, "Acrylic (incl. PSA)");
    assert_eq!(t605.chemistry_confidence, Confidence::High);
}

#[test]
fn pipeline_is_idempotent_over_its_own_output() {
    let candidates = vec![candidate(
        "1. Industrial/T605/TDS/FORZA_TDS_T605.pdf",
        "T605",
        1024,
    )];
    let cfg = config(
        r#"
[[sources.files]]
name = "consolidated"
file = "data/productsConsolidated.json"
format = "json"

[[sources.files]]
name = "export"
file = "x.csv"
format = "csv"

[merge]
precedence = ["consolidated", "export"]
"#,
    );

    let first = run(
        &cfg,
        vec![
            NormalizedSource {
                source: "consolidated".into(),
                records: Vec::new(),
                warnings: Vec::new(),
                violations: Vec::new(),
            },
            from_csv(EXPORT_CSV, "export"),
        ],
        &candidates,
        &[],
        &NoExtractor,
        now(),
    )
    .unwrap();
    assert!(first.touched > 0);

    // Feed the output back as the highest-precedence source a day later.
    let later = Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap();
    let second = run(
        &cfg,
        vec![
            NormalizedSource {
                source: "consolidated".into(),
                records: first.records.clone(),
                warnings: Vec::new(),
                violations: Vec::new(),
            },
            from_csv(EXPORT_CSV, "export"),
        ],
        &candidates,
        &[],
        &NoExtractor,
        later,
    )
    .unwrap();

    assert_eq!(second.touched, 0);
    assert_eq!(first.records, second.records);
}

#[test]
fn no_duplicate_ids_across_sources() {
    let csv = "ID,Name,Category,Industry,PDF Links\nOS2,ForzaSEAL OS2,SEAL,marine,\n";
    let json = r#"{"products": [{"id": "os2", "name": "ForzaSEAL OS2", "description": "From snapshot"}]}"#;

    let cfg = config(
        r#"
[[sources.files]]
name = "merged"
file = "m.json"
format = "json"

[[sources.files]]
name = "export"
file = "x.csv"
format = "csv"

[merge]
precedence = ["merged", "export"]
"#,
    );

    let out = run(
        &cfg,
        vec![
            from_json(json, "merged").unwrap(),
            from_csv(csv, "export"),
        ],
        &[],
        &[],
        &NoExtractor,
        now(),
    )
    .unwrap();

    assert_eq!(out.records.len(), 1);
    let os2 = &out.records[0];
    // Snapshot ranks higher for scalars; the export fills the gaps.
    assert_eq!(os2.description, "From snapshot");
    assert_eq!(os2.category, Some(Category::Seal));
    assert_eq!(os2.industry, vec!["marine"]);
}

#[test]
fn chemistry_coupling_holds_for_every_record() {
    let csv = "\
ID,Name,Category,Industry,PDF Links,Chemistry,Chemistry Confidence\n\
ic933,ForzaBOND IC933,BOND,industrial,,,\n\
zz1,Unmarked Product 9,BOND,industrial,,,\n";
    let out = run(
        &export_only(),
        vec![from_csv(csv, "export")],
        &[],
        &[],
        &NoExtractor,
        now(),
    )
    .unwrap();

    for r in &out.records {
        assert_eq!(
            r.chemistry == "Unknown",
            r.chemistry_confidence == Confidence::None,
            "coupling violated for {}",
            r.id
        );
    }
    assert!(out
        .audit
        .unknown_chemistry
        .contains(&"zz1".to_string()));
}

#[test]
fn image_matching_fills_missing_images() {
    let images = vec!["t605.png".to_string(), "os2.jpg".into(), "ic933.jpg".into()];
    let out = run(
        &export_only(),
        vec![from_csv(EXPORT_CSV, "export")],
        &[],
        &images,
        &NoExtractor,
        now(),
    )
    .unwrap();

    let t605 = out.records.iter().find(|r| r.id == "t605").unwrap();
    let os2 = out.records.iter().find(|r| r.id == "os2").unwrap();
    assert_eq!(t605.image_url.as_deref(), Some("/product-images/t605.png"));
    assert_eq!(os2.image_url.as_deref(), Some("/product-images/os2.jpg"));
    assert_eq!(out.audit.with_image, 2);
}

#[test]
fn audit_reflects_final_state() {
    let source = from_csv(EXPORT_CSV, "export");
    let candidates = vec![candidate(
        "1. Industrial/T605/TDS/FORZA_TDS_T605.pdf",
        "T605",
        1024,
    )];
    let out = run(
        &export_only(),
        vec![source],
        &candidates,
        &[],
        &NoExtractor,
        now(),
    )
    .unwrap();

    assert_eq!(out.audit.total_products, 2);
    assert_eq!(out.audit.by_category.get("SEAL"), Some(&1));
    assert_eq!(out.audit.by_category.get("TAPE"), Some(&1));
    assert_eq!(out.audit.with_tds_link, 1);
    assert!(!out.audit.has_violations());
}
