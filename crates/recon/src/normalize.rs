//! Source normalization: raw CSV/JSON text in, source-tagged record lists
//! out. No classification or merge decisions happen here.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::CatalogError;
use crate::model::{
    Category, Confidence, IntegrityViolation, ProductRecord, UNKNOWN_CHEMISTRY,
};

/// One normalized source: records plus everything worth surfacing about
/// how the raw text parsed.
#[derive(Debug, Clone)]
pub struct NormalizedSource {
    pub source: String,
    pub records: Vec<ProductRecord>,
    pub warnings: Vec<String>,
    pub violations: Vec<IntegrityViolation>,
}

// ---------------------------------------------------------------------------
// Delimited parser
// ---------------------------------------------------------------------------

/// Parse RFC-4180-like text into rows. Double-quoted fields may contain
/// the separator and line breaks; `""` unescapes to `"`. An unterminated
/// quote at end of input is tolerated: whatever parsed is returned with a
/// warning appended.
pub fn parse_delimited(text: &str) -> (Vec<Vec<String>>, Vec<String>) {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => {
                row.push(std::mem::take(&mut field));
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        warnings.push(format!(
            "unterminated quoted field at end of input (row {})",
            rows.len() + 1
        ));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    // Drop fully-empty trailing rows left by blank lines.
    while rows
        .last()
        .is_some_and(|r| r.iter().all(|f| f.trim().is_empty()))
    {
        rows.pop();
    }

    (rows, warnings)
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Resolved indices for the declared export columns. Missing columns are
/// reported, not fatal: dependent fields stay empty for the source.
#[derive(Debug, Default)]
pub struct ColumnMap {
    pub id: Option<usize>,
    pub name: Option<usize>,
    pub title: Option<usize>,
    pub description: Option<usize>,
    pub image_url: Option<usize>,
    pub pdf_links: Option<usize>,
    pub category: Option<usize>,
    pub product_type: Option<usize>,
    pub chemistry: Option<usize>,
    pub chemistry_confidence: Option<usize>,
    pub industry: Option<usize>,
    pub sizes: Option<usize>,
    pub benefits: Option<usize>,
    pub technical_data: Option<usize>,
}

impl ColumnMap {
    pub fn from_header(header: &[String]) -> (Self, Vec<String>) {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let map = Self {
            id: find("ID"),
            name: find("Name"),
            title: find("Title"),
            description: find("Description"),
            image_url: find("Image URL"),
            pdf_links: find("PDF Links"),
            category: find("Category"),
            product_type: find("Product Type"),
            chemistry: find("Chemistry"),
            chemistry_confidence: find("Chemistry Confidence"),
            industry: find("Industry"),
            sizes: find("Sizes"),
            benefits: find("Benefits"),
            technical_data: find("Technical Data"),
        };

        let mut warnings = Vec::new();
        for (col, present) in [
            ("ID", map.id.is_some()),
            ("Name", map.name.is_some()),
            ("PDF Links", map.pdf_links.is_some()),
            ("Category", map.category.is_some()),
            ("Industry", map.industry.is_some()),
        ] {
            if !present {
                warnings.push(format!("expected column '{col}' not found in header"));
            }
        }

        (map, warnings)
    }
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

// ---------------------------------------------------------------------------
// CSV source
// ---------------------------------------------------------------------------

pub fn from_csv(text: &str, source: &str) -> NormalizedSource {
    let (rows, mut warnings) = parse_delimited(text);
    let mut records = Vec::new();
    let mut violations = Vec::new();

    let Some(header) = rows.first() else {
        warnings.push("empty CSV source".into());
        return NormalizedSource {
            source: source.into(),
            records,
            warnings,
            violations,
        };
    };

    let (map, header_warnings) = ColumnMap::from_header(header);
    warnings.extend(header_warnings);

    for (line, row) in rows.iter().enumerate().skip(1) {
        let raw_id = cell(row, map.id).trim();
        if raw_id.is_empty() {
            warnings.push(format!("row {}: missing id, skipped", line + 1));
            continue;
        }

        let mut record = ProductRecord::blank(raw_id);
        record.name = cell(row, map.name).trim().to_string();
        record.short_name = cell(row, map.title).trim().to_string();
        record.description = cell(row, map.description).trim().to_string();
        record.product_type = cell(row, map.product_type).trim().to_string();

        let image = cell(row, map.image_url).trim();
        if !image.is_empty() {
            record.image_url = Some(image.to_string());
        }

        record.pdf_links = split_list(cell(row, map.pdf_links), ';');
        record.sizes = split_list(cell(row, map.sizes), ';');
        record.benefits = split_list(cell(row, map.benefits), ';');

        let raw_category = cell(row, map.category).trim();
        if !raw_category.is_empty() {
            match Category::parse(raw_category) {
                Some(cat) => record.category = Some(cat),
                None => violations.push(IntegrityViolation {
                    id: record.id.clone(),
                    detail: format!("invalid category '{raw_category}'"),
                }),
            }
        }

        let raw_industry = cell(row, map.industry).trim();
        if !raw_industry.is_empty() {
            record.industry = split_list(raw_industry, ';');
            if record.industry.is_empty() {
                record.industry = vec![raw_industry.to_string()];
            }
        }

        let raw_chem = cell(row, map.chemistry).trim();
        if !raw_chem.is_empty() && raw_chem != UNKNOWN_CHEMISTRY {
            record.chemistry = raw_chem.to_string();
            record.chemistry_confidence = Confidence::parse(cell(row, map.chemistry_confidence))
                .unwrap_or(Confidence::Low);
            if record.chemistry_confidence == Confidence::None {
                // Coupling invariant: a named chemistry can't carry tier None.
                record.chemistry_confidence = Confidence::Low;
            }
            record.chemistry_source = source.to_string();
        }

        record.technical_data = parse_json_map(cell(row, map.technical_data));

        records.push(record);
    }

    NormalizedSource {
        source: source.into(),
        records,
        warnings,
        violations,
    }
}

fn split_list(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Lenient embedded-JSON cell: a flat object with values stringified;
/// anything unparseable becomes an empty map.
fn parse_json_map(raw: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if raw.trim().is_empty() {
        return out;
    }
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
        for (k, v) in obj {
            out.insert(k, stringify_value(&v));
        }
    }
    out
}

fn stringify_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// JSON source
// ---------------------------------------------------------------------------

/// Accepts either a bare array of product-shaped objects or the
/// consolidated `{ metadata, products: [...] }` shape. Per-element
/// failures are skipped with a warning.
pub fn from_json(text: &str, source: &str) -> Result<NormalizedSource, CatalogError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CatalogError::JsonParse {
        source_name: source.into(),
        detail: e.to_string(),
    })?;

    let items = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => match obj.get("products") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => {
                return Err(CatalogError::JsonParse {
                    source_name: source.into(),
                    detail: "expected an array or an object with a 'products' array".into(),
                })
            }
        },
        _ => {
            return Err(CatalogError::JsonParse {
                source_name: source.into(),
                detail: "expected an array or an object with a 'products' array".into(),
            })
        }
    };

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut violations = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let Value::Object(obj) = item else {
            warnings.push(format!("element {i}: not an object, skipped"));
            continue;
        };
        let raw_id = obj.get("id").and_then(Value::as_str).unwrap_or("").trim();
        if raw_id.is_empty() {
            warnings.push(format!("element {i}: missing id, skipped"));
            continue;
        }

        let mut record = ProductRecord::blank(raw_id);
        record.name = str_field(obj, "name");
        record.short_name = str_field(obj, "shortName");
        record.description = str_field(obj, "description");
        record.product_type = str_field(obj, "productType");
        record.image_url = obj
            .get("imageUrl")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let raw_category = str_field(obj, "category");
        if !raw_category.is_empty() {
            match Category::parse(&raw_category) {
                Some(cat) => record.category = Some(cat),
                None => violations.push(IntegrityViolation {
                    id: record.id.clone(),
                    detail: format!("invalid category '{raw_category}'"),
                }),
            }
        }

        // Industry appears both as a string and as an array across
        // snapshot generations.
        record.industry = match obj.get("industry") {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        record.pdf_links = str_list(obj, "pdfLinks");
        record.sizes = str_list(obj, "sizes");
        record.benefits = str_list(obj, "benefits");
        record.search_keywords = str_list(obj, "searchKeywords");

        record.standard_tds_link = obj
            .get("standardTdsLink")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        record.has_tds_link = obj
            .get("hasTdsLink")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let chemistry = str_field(obj, "chemistry");
        if !chemistry.is_empty() && chemistry != UNKNOWN_CHEMISTRY {
            record.chemistry = chemistry;
            record.chemistry_confidence = obj
                .get("chemistryConfidence")
                .and_then(Value::as_str)
                .and_then(Confidence::parse)
                .filter(|c| *c != Confidence::None)
                .unwrap_or(Confidence::Low);
            record.chemistry_source = obj
                .get("chemistrySource")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| source.to_string());
        }

        if let Some(Value::Object(td)) = obj.get("technicalData") {
            for (k, v) in td {
                record.technical_data.insert(k.clone(), stringify_value(v));
            }
        }

        record.created_at = str_field(obj, "createdAt");
        record.updated_at = str_field(obj, "updatedAt");
        record.version = obj.get("version").and_then(Value::as_u64).unwrap_or(0);

        records.push(record);
    }

    Ok(NormalizedSource {
        source: source.into(),
        records,
        warnings,
        violations,
    })
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string()
}

fn str_list(obj: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_field_with_separator_and_escape() {
        let (rows, warnings) = parse_delimited("a,\"Hello, \"\"World\"\"\",c\n");
        assert!(warnings.is_empty());
        assert_eq!(rows, vec![vec!["a", "Hello, \"World\"", "c"]]);
    }

    #[test]
    fn quoted_field_with_embedded_newline() {
        let (rows, _) = parse_delimited("id,desc\nos2,\"line one\nline two\"\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "line one\nline two");
    }

    #[test]
    fn crlf_rows() {
        let (rows, _) = parse_delimited("a,b\r\nc,d\r\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn unterminated_quote_recovers_with_warning() {
        let (rows, warnings) = parse_delimited("a,b\nc,\"dangling");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["c", "dangling"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unterminated"));
    }

    #[test]
    fn missing_expected_column_is_reported_not_fatal() {
        let csv = "ID,Name\nos2,ForzaSEAL OS2\n";
        let normalized = from_csv(csv, "export");
        assert_eq!(normalized.records.len(), 1);
        assert!(normalized
            .warnings
            .iter()
            .any(|w| w.contains("'PDF Links'")));
        assert!(normalized.records[0].pdf_links.is_empty());
    }

    #[test]
    fn csv_row_builds_record() {
        let csv = "ID,Name,PDF Links,Category,Industry,Chemistry,Chemistry Confidence\n\
                   OS2,ForzaSEAL OS2,/TDS/a.pdf;/TDS/b.pdf,SEAL,marine,Silicone,High\n";
        let normalized = from_csv(csv, "export");
        let r = &normalized.records[0];
        assert_eq!(r.id, "os2");
        assert_eq!(r.pdf_links, vec!["/TDS/a.pdf", "/TDS/b.pdf"]);
        assert_eq!(r.category, Some(Category::Seal));
        assert_eq!(r.industry, vec!["marine"]);
        assert_eq!(r.chemistry, "Silicone");
        assert_eq!(r.chemistry_confidence, Confidence::High);
        assert_eq!(r.chemistry_source, "export");
    }

    #[test]
    fn invalid_category_is_flagged_not_coerced() {
        let csv = "ID,Name,PDF Links,Category,Industry\nx1,X,,-glue-,marine\n";
        let normalized = from_csv(csv, "export");
        assert_eq!(normalized.records[0].category, None);
        assert_eq!(normalized.violations.len(), 1);
        assert!(normalized.violations[0].detail.contains("-glue-"));
    }

    #[test]
    fn malformed_row_skipped_with_warning() {
        let csv = "ID,Name,PDF Links,Category,Industry\n,NoId,,BOND,marine\nos2,OK,,SEAL,marine\n";
        let normalized = from_csv(csv, "export");
        assert_eq!(normalized.records.len(), 1);
        assert!(normalized.warnings.iter().any(|w| w.contains("missing id")));
    }

    #[test]
    fn json_bare_array() {
        let json = r#"[{"id": "T605", "name": "ForzaTAPE T605", "category": "TAPE",
                        "industry": "industrial"}]"#;
        let normalized = from_json(json, "merged").unwrap();
        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.records[0].id, "t605");
        assert_eq!(normalized.records[0].industry, vec!["industrial"]);
    }

    #[test]
    fn json_consolidated_shape() {
        let json = r#"{"metadata": {"totalProducts": 1},
                       "products": [{"id": "os2", "industry": ["marine", "industrial"],
                                     "chemistry": "Silicone",
                                     "chemistryConfidence": "High"}]}"#;
        let normalized = from_json(json, "consolidated").unwrap();
        let r = &normalized.records[0];
        assert_eq!(r.industry, vec!["marine", "industrial"]);
        assert_eq!(r.chemistry_confidence, Confidence::High);
    }

    #[test]
    fn json_invalid_fragment_skipped() {
        let json = r#"[{"id": "os2"}, 42, {"name": "no id"}]"#;
        let normalized = from_json(json, "merged").unwrap();
        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.warnings.len(), 2);
    }

    #[test]
    fn json_top_level_garbage_is_an_error() {
        assert!(from_json("\"just a string\"", "merged").is_err());
        assert!(from_json("{not json", "merged").is_err());
    }

    #[test]
    fn named_chemistry_never_carries_tier_none() {
        let csv = "ID,Name,PDF Links,Category,Industry,Chemistry,Chemistry Confidence\n\
                   a1,A,,BOND,industrial,Epoxy,None\n";
        let normalized = from_csv(csv, "export");
        assert_eq!(normalized.records[0].chemistry_confidence, Confidence::Low);
    }
}
