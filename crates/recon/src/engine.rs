//! Pipeline orchestration: normalize -> merge -> classify -> link assets
//! -> audit, strictly staged. Each stage consumes the complete output of
//! the previous one; decisions like duplicate detection are global.
//!
//! The engine is pure: it receives pre-normalized sources, pre-scanned
//! asset candidates and the clock, and returns records plus an audit. All
//! filesystem and subprocess work lives with the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::assets::{link_documents, link_images, LinkReport, TextExtractor};
use crate::audit::CatalogAudit;
use crate::classify::classify;
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::merge::merge_sources;
use crate::model::{AssetCandidate, Confidence, ProductRecord, UNKNOWN_CHEMISTRY};
use crate::normalize::NormalizedSource;

/// Everything one run accumulates besides the records themselves.
#[derive(Debug, Default)]
pub struct RunContext {
    pub warnings: Vec<String>,
    pub link: LinkReport,
}

#[derive(Debug)]
pub struct RunOutput {
    pub records: Vec<ProductRecord>,
    pub audit: CatalogAudit,
    /// Records whose content changed this run (version bumped).
    pub touched: usize,
}

/// Source tag recorded when the rule table, not an input, decided the
/// chemistry.
const RULE_SOURCE: &str = "classification-rules";

pub fn run(
    config: &CatalogConfig,
    sources: Vec<NormalizedSource>,
    candidates: &[AssetCandidate],
    image_files: &[String],
    extractor: &dyn TextExtractor,
    now: DateTime<Utc>,
) -> Result<RunOutput, CatalogError> {
    let mut ctx = RunContext::default();
    let mut violations = Vec::new();
    let mut source_counts = BTreeMap::new();

    for source in &sources {
        source_counts.insert(source.source.clone(), source.records.len());
        ctx.warnings.extend(source.warnings.iter().cloned());
        violations.extend(source.violations.iter().cloned());
    }

    // Stage: merge.
    let merged = merge_sources(&sources, &config.resolution_order());
    let mut records = merged.records;
    ctx.warnings.extend(merged.warnings);
    violations.extend(merged.violations);

    // One record per canonical id is structural here, but a regression
    // would corrupt the store, so verify before going further.
    let mut seen = std::collections::BTreeSet::new();
    for record in &records {
        if !seen.insert(record.id.clone()) {
            return Err(CatalogError::DuplicateId(record.id.clone()));
        }
    }

    // Baseline for change detection. When the prior consolidated store is
    // fed back as the top source, an unchanged record merges to exactly
    // this state and the later stages leave it alone.
    let baseline: BTreeMap<String, ProductRecord> =
        records.iter().map(|r| (r.id.clone(), r.clone())).collect();

    // Stage: classify merged text. Rule outcomes only ever upgrade the
    // confidence tier; a High value from an input is never downgraded.
    for record in &mut records {
        let outcome = classify(&record.id, &record.name, &record.description, record.category);
        if outcome.confidence > record.chemistry_confidence {
            record.chemistry = outcome.chemistry;
            record.chemistry_confidence = outcome.confidence;
            record.chemistry_source = RULE_SOURCE.into();
        }
        if record.product_type.is_empty() && !outcome.product_type.is_empty() {
            record.product_type = outcome.product_type;
        }
    }

    // Stage: fill defaults the later stages depend on.
    for record in &mut records {
        if record.industry.is_empty() {
            record.industry.push(config.assets.default_industry.clone());
        }
    }

    // Stage: asset linking.
    let mut link = link_documents(&mut records, candidates, extractor, &config.assets);
    link_images(&mut records, image_files, &config.assets, &mut link);
    ctx.warnings.extend(std::mem::take(&mut link.warnings));
    ctx.link = link;

    // Stage: derived fields and invariant repair.
    for record in &mut records {
        extend_search_keywords(record);
        if record.chemistry == UNKNOWN_CHEMISTRY {
            record.chemistry_confidence = Confidence::None;
        } else if record.chemistry_confidence == Confidence::None {
            record.chemistry_confidence = Confidence::Low;
        }
        // A standard link always appears in pdf_links, even when it came
        // in from a snapshot that listed only the link itself.
        if let Some(link) = &record.standard_tds_link {
            if !record.pdf_links.contains(link) {
                record.pdf_links.push(link.clone());
            }
        }
    }

    // Stage: stamp versions on touched records only, so an unchanged
    // rerun reproduces the store byte for byte apart from nothing.
    let now_str = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut touched = 0;
    for record in &mut records {
        let changed = match baseline.get(&record.id) {
            Some(prior) => !content_equal(record, prior),
            None => true,
        };
        if record.created_at.is_empty() {
            record.created_at = now_str.clone();
        }
        if changed || record.updated_at.is_empty() {
            record.version += 1;
            record.updated_at = now_str.clone();
            touched += 1;
        }
    }

    let audit = CatalogAudit::build(
        &records,
        source_counts,
        merged.conflicts,
        violations,
        ctx.warnings,
        &ctx.link,
    );

    Ok(RunOutput {
        records,
        audit,
        touched,
    })
}

/// Field equality ignoring the bookkeeping stamps.
fn content_equal(a: &ProductRecord, b: &ProductRecord) -> bool {
    let strip = |r: &ProductRecord| {
        let mut r = r.clone();
        r.version = 0;
        r.created_at.clear();
        r.updated_at.clear();
        r
    };
    strip(a) == strip(b)
}

/// Append derived search keywords: id, name words, category, chemistry,
/// industries, product type. Ordered union, lowercase, no duplicates.
fn extend_search_keywords(record: &mut ProductRecord) {
    let push = |keywords: &mut Vec<String>, raw: &str| {
        let word = raw.trim().to_lowercase();
        if word.len() > 1 && !keywords.contains(&word) {
            keywords.push(word);
        }
    };

    let mut keywords = std::mem::take(&mut record.search_keywords);
    push(&mut keywords, &record.id);
    for word in record.name.split_whitespace() {
        push(&mut keywords, word);
    }
    if let Some(category) = record.category {
        push(&mut keywords, &category.to_string());
    }
    if record.chemistry != UNKNOWN_CHEMISTRY {
        push(&mut keywords, &record.chemistry);
    }
    for industry in &record.industry {
        push(&mut keywords, industry);
    }
    push(&mut keywords, &record.product_type);
    record.search_keywords = keywords;
}
