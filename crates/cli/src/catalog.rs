//! `forza-catalog` subcommands: run, validate, link-assets, export.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};

use catalog_recon::assets::{link_documents, link_images, LinkReport};
use catalog_recon::audit::CatalogAudit;
use catalog_recon::config::CatalogConfig;
use catalog_recon::engine;
use catalog_recon::error::CatalogError;
use catalog_recon::model::ProductRecord;
use catalog_recon::normalize::{from_json, NormalizedSource};
use catalog_io::extract::PdfTextExtractor;
use catalog_io::store;
use catalog_io::walk;

use crate::exit_codes::{EXIT_CONFIG, EXIT_DUPLICATE, EXIT_ERROR, EXIT_INTEGRITY, EXIT_PARSE};
use crate::CliError;

/// Resolve the config and the directory its relative paths hang off.
/// With no explicit config the conventional defaults apply, rooted at
/// the working directory.
fn load_config(config_path: Option<PathBuf>) -> Result<(CatalogConfig, PathBuf), CliError> {
    match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| CliError::args(format!("cannot read config {}: {e}", path.display())))?;
            let config = CatalogConfig::from_toml(&text)
                .map_err(|e| CliError::with_code(EXIT_CONFIG, e.to_string()))?;
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((config, base))
        }
        None => Ok((CatalogConfig::default(), PathBuf::from("."))),
    }
}

/// Load every configured source. A missing file is skipped with a
/// warning (snapshots accumulate over time and early runs won't have
/// them all); an unreadable or unparseable file is fatal.
fn load_sources(
    config: &CatalogConfig,
    base: &Path,
) -> Result<Vec<NormalizedSource>, CliError> {
    let mut sources = Vec::new();
    for file in &config.sources.files {
        let path = base.join(&file.file);
        if !path.exists() {
            eprintln!("warning: source '{}' missing at {}, skipped", file.name, path.display());
            sources.push(NormalizedSource {
                source: file.name.clone(),
                records: Vec::new(),
                warnings: Vec::new(),
                violations: Vec::new(),
            });
            continue;
        }
        let source = store::load_source(base, file)
            .map_err(|e| CliError::with_code(EXIT_PARSE, format!("source '{}': {e}", file.name)))?;
        sources.push(source);
    }
    Ok(sources)
}

fn scan_assets(
    config: &CatalogConfig,
    base: &Path,
) -> Result<(Vec<catalog_recon::model::AssetCandidate>, Vec<String>, PathBuf), CliError> {
    let tds_root = base.join(&config.assets.tds_root);
    let candidates = if tds_root.is_dir() {
        walk::scan_document_tree(&tds_root).map_err(|e| CliError::with_code(EXIT_ERROR, e))?
    } else {
        eprintln!("warning: TDS root {} missing, no documents scanned", tds_root.display());
        Vec::new()
    };
    let images = walk::list_images(&base.join(&config.assets.image_dir))
        .map_err(|e| CliError::with_code(EXIT_ERROR, e))?;
    Ok((candidates, images, tds_root))
}

// -------------------------------------------------------------------------
// run
// -------------------------------------------------------------------------

pub fn cmd_run(
    config_path: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
    dry_run: bool,
) -> Result<(), CliError> {
    let (config, base) = load_config(config_path)?;
    let sources = load_sources(&config, &base)?;
    let (candidates, images, tds_root) = scan_assets(&config, &base)?;
    let extractor = PdfTextExtractor::new(
        tds_root,
        Duration::from_millis(config.assets.extract_timeout_ms),
    );

    let now = Utc::now();
    let out = engine::run(&config, sources, &candidates, &images, &extractor, now).map_err(
        |e| match e {
            CatalogError::DuplicateId(_) => CliError::with_code(EXIT_DUPLICATE, e.to_string()),
            other => CliError::with_code(EXIT_ERROR, other.to_string()),
        },
    )?;

    // Fatal violations never overwrite the last good store.
    if out.audit.has_violations() {
        for v in &out.audit.violations {
            eprintln!("  violation: {}: {}", v.id, v.detail);
        }
        return Err(CliError::with_code(
            EXIT_INTEGRITY,
            format!(
                "{} integrity violation(s); store not written",
                out.audit.violations.len()
            ),
        )
        .hint("resolve the conflicts in the source data and re-run"));
    }

    if !dry_run {
        let generated_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let metadata = store::store_metadata(&out.audit, &generated_at);
        let store_path = base.join(&config.output.consolidated);
        store::save_consolidated(&store_path, &out.records, metadata)
            .map_err(|e| CliError::with_code(EXIT_ERROR, e))?;
        store::save_audit(&base.join(&config.output.audit), &out.audit)
            .map_err(|e| CliError::with_code(EXIT_ERROR, e))?;
        eprintln!("wrote {}", store_path.display());
    }

    if let Some(path) = &output_file {
        store::save_audit(path, &out.audit).map_err(|e| CliError::with_code(EXIT_ERROR, e))?;
        eprintln!("wrote {}", path.display());
    }

    print_summary(&out.audit, out.touched);

    if json_output {
        let json = serde_json::to_string_pretty(&out.audit)
            .map_err(|e| CliError::with_code(EXIT_ERROR, e.to_string()))?;
        println!("{json}");
    }

    Ok(())
}

fn print_summary(audit: &CatalogAudit, touched: usize) {
    eprintln!(
        "{} products ({} touched), {} with TDS link, {} with image",
        audit.total_products, touched, audit.with_tds_link, audit.with_image
    );
    eprintln!(
        "unknown chemistry: {}, unmatched assets: {}, unmatched images: {}",
        audit.unknown_chemistry.len(),
        audit.unmatched_assets.len(),
        audit.unmatched_images.len()
    );
    for warning in &audit.warnings {
        eprintln!("  warning: {warning}");
    }
}

// -------------------------------------------------------------------------
// validate
// -------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::args(format!("cannot read config {}: {e}", config_path.display())))?;
    let config = CatalogConfig::from_toml(&text)
        .map_err(|e| CliError::with_code(EXIT_CONFIG, e.to_string()))?;

    eprintln!("config ok: {}", config.name);
    eprintln!("  sources: {}", config.sources.files.len());
    eprintln!("  resolution order: {}", config.resolution_order().join(" > "));
    eprintln!("  store: {}", config.output.consolidated);
    Ok(())
}

// -------------------------------------------------------------------------
// link-assets
// -------------------------------------------------------------------------

fn load_store(config: &CatalogConfig, base: &Path) -> Result<Vec<ProductRecord>, CliError> {
    let path = base.join(&config.output.consolidated);
    if !path.exists() {
        return Err(CliError::args(format!("store {} not found", path.display()))
            .hint("run 'forza-catalog run' first"));
    }
    let text = store::read_file_as_utf8(&path).map_err(|e| CliError::with_code(EXIT_ERROR, e))?;
    let source =
        from_json(&text, "consolidated").map_err(|e| CliError::with_code(EXIT_PARSE, e.to_string()))?;
    Ok(source.records)
}

pub fn cmd_link_assets(config_path: Option<PathBuf>, fix: bool) -> Result<(), CliError> {
    let (config, base) = load_config(config_path)?;
    let mut records = load_store(&config, &base)?;
    let before = records.clone();
    let (candidates, images, tds_root) = scan_assets(&config, &base)?;
    let extractor = PdfTextExtractor::new(
        tds_root.clone(),
        Duration::from_millis(config.assets.extract_timeout_ms),
    );

    let mut report = link_documents(&mut records, &candidates, &extractor, &config.assets);
    link_images(&mut records, &images, &config.assets, &mut report);

    if fix {
        apply_location_fixes(&mut records, &tds_root, &config, &mut report)?;
    }

    let changed: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(i, r)| before.get(*i) != Some(r))
        .map(|(i, _)| i)
        .collect();

    eprintln!(
        "{} linked, {} defaulted, {} images matched, {} records changed",
        report.linked,
        report.defaulted,
        report.images_matched,
        changed.len()
    );
    for path in &report.unmatched_assets {
        eprintln!("  unmatched asset: {path}");
    }
    for id in &report.images_unmatched {
        eprintln!("  no image match: {id}");
    }

    if !fix {
        if !changed.is_empty() {
            eprintln!("re-run with --fix to apply");
        }
        return Ok(());
    }

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    for i in &changed {
        records[*i].version += 1;
        records[*i].updated_at = now.clone();
    }

    let counts = BTreeMap::from([("consolidated".to_string(), records.len())]);
    let audit = CatalogAudit::build(&records, counts, Vec::new(), Vec::new(), Vec::new(), &report);
    let metadata = store::store_metadata(&audit, &now);
    let store_path = base.join(&config.output.consolidated);
    store::save_consolidated(&store_path, &records, metadata)
        .map_err(|e| CliError::with_code(EXIT_ERROR, e))?;
    eprintln!("wrote {}", store_path.display());
    Ok(())
}

/// Copy each product's standard document to its canonical location
/// (`<industry folder>/<ID>/TDS/FORZA_TDS_<ID>.pdf`) when it lives
/// elsewhere, and point the record at the canonical copy. Originals are
/// never deleted.
fn apply_location_fixes(
    records: &mut [ProductRecord],
    tds_root: &Path,
    config: &CatalogConfig,
    report: &mut LinkReport,
) -> Result<(), CliError> {
    for record in records.iter_mut() {
        if !record.has_tds_link {
            continue;
        }
        let Some(link) = record.standard_tds_link.clone() else {
            continue;
        };
        let Some(relative) = link.strip_prefix("/TDS/") else {
            continue;
        };

        let industry = record
            .industry
            .first()
            .map(String::as_str)
            .unwrap_or(&config.assets.default_industry);
        let folder = config.assets.folder_for_industry(industry);
        let id = record.id.to_uppercase();
        let canonical_rel = format!("{folder}/{id}/TDS/FORZA_TDS_{id}.pdf");
        if relative == canonical_rel {
            continue;
        }

        let source_path = tds_root.join(relative);
        let canonical_path = tds_root.join(&canonical_rel);
        if !source_path.is_file() {
            continue;
        }
        if !canonical_path.exists() {
            if let Some(parent) = canonical_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CliError::with_code(EXIT_ERROR, e.to_string()))?;
            }
            std::fs::copy(&source_path, &canonical_path)
                .map_err(|e| CliError::with_code(EXIT_ERROR, e.to_string()))?;
            report.warnings.push(format!("copied {relative} -> {canonical_rel}"));
        }

        let canonical_link = format!("/TDS/{canonical_rel}");
        if !record.pdf_links.contains(&canonical_link) {
            record.pdf_links.push(canonical_link.clone());
        }
        record.standard_tds_link = Some(canonical_link);
    }
    Ok(())
}

// -------------------------------------------------------------------------
// export
// -------------------------------------------------------------------------

pub fn cmd_export(config_path: Option<PathBuf>, output: Option<PathBuf>) -> Result<(), CliError> {
    let (config, base) = load_config(config_path)?;
    let records = load_store(&config, &base)?;

    let path = output.unwrap_or_else(|| base.join("data/product_detailed_export.csv"));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CliError::with_code(EXIT_ERROR, e.to_string()))?;
        }
    }
    catalog_io::export::export_csv(&records, &path)
        .map_err(|e| CliError::with_code(EXIT_ERROR, e))?;
    eprintln!("wrote {} ({} products)", path.display(), records.len());
    Ok(())
}
