// Consolidated store and raw source loading

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::Serialize;

use catalog_recon::audit::CatalogAudit;
use catalog_recon::config::{SourceFile, SourceFormat};
use catalog_recon::model::ProductRecord;
use catalog_recon::normalize::{from_csv, from_json, NormalizedSource};

/// Read a file as UTF-8, falling back to Windows-1252 (common for
/// Excel-exported CSVs) when the bytes don't decode.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Load one configured source from disk and normalize it. A missing file
/// is an error; the caller decides whether a source is optional.
pub fn load_source(base: &Path, source: &SourceFile) -> Result<NormalizedSource, String> {
    let path = base.join(&source.file);
    let text = read_file_as_utf8(&path)?;
    match source.format {
        SourceFormat::Csv => Ok(from_csv(&text, &source.name)),
        SourceFormat::Json => from_json(&text, &source.name).map_err(|e| e.to_string()),
    }
}

#[derive(Serialize)]
struct ConsolidatedStore<'a> {
    metadata: serde_json::Value,
    products: &'a [ProductRecord],
}

/// Store metadata block: run stamp plus the audit headline numbers.
pub fn store_metadata(audit: &CatalogAudit, generated_at: &str) -> serde_json::Value {
    serde_json::json!({
        "generatedAt": generated_at,
        "totalProducts": audit.total_products,
        "sourceCounts": audit.source_counts,
        "byCategory": audit.by_category,
        "byChemistry": audit.by_chemistry,
        "byConfidence": audit.by_confidence,
        "withTdsLink": audit.with_tds_link,
        "withImage": audit.with_image,
        "unmatchedAssets": audit.unmatched_assets,
        "violations": audit.violations,
    })
}

/// Write the consolidated store atomically: serialize to a sibling temp
/// file, then rename over the target. A crash mid-write leaves the
/// previous store intact and readers never observe a partial file.
pub fn save_consolidated(
    path: &Path,
    records: &[ProductRecord],
    metadata: serde_json::Value,
) -> Result<(), String> {
    let store = ConsolidatedStore {
        metadata,
        products: records,
    };
    write_json_atomic(path, &store)
}

/// Write the audit report next to the store, same discipline.
pub fn save_audit(path: &Path, audit: &CatalogAudit) -> Result<(), String> {
    write_json_atomic(path, audit)
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
    }

    let tmp = path.with_extension("tmp");
    {
        let file = File::create(&tmp).map_err(|e| format!("{}: {e}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|e| e.to_string())?;
        writer.write_all(b"\n").map_err(|e| e.to_string())?;
        writer.flush().map_err(|e| e.to_string())?;
    }
    std::fs::rename(&tmp, path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(())
}
