//! Merge engine: collapses N source-tagged record lists into one record
//! per canonical id.
//!
//! Scalar fields resolve by source precedence (first non-empty wins).
//! List fields union in first-seen order. Confidence-bearing fields
//! resolve by confidence ordinal instead, with precedence as tie-break.
//! Category disagreement between sources is a data-integrity error for a
//! human, never guessed.

use std::collections::BTreeMap;

use crate::model::{IntegrityViolation, MergeConflict, ProductRecord, UNKNOWN_CHEMISTRY};
use crate::normalize::NormalizedSource;

#[derive(Debug, Default)]
pub struct MergeOutput {
    pub records: Vec<ProductRecord>,
    pub conflicts: Vec<MergeConflict>,
    pub violations: Vec<IntegrityViolation>,
    pub warnings: Vec<String>,
}

/// Merge sources in the given resolution order (highest precedence
/// first). Sources missing from `order` are skipped.
pub fn merge_sources(sources: &[NormalizedSource], order: &[String]) -> MergeOutput {
    let mut out = MergeOutput::default();

    // Resolution-ordered view of the sources.
    let ordered: Vec<&NormalizedSource> = order
        .iter()
        .filter_map(|name| sources.iter().find(|s| &s.source == name))
        .collect();

    // Index records per source, keeping the first occurrence of an id
    // within a single source and warning on the rest.
    let mut per_source: Vec<(&str, BTreeMap<String, &ProductRecord>)> = Vec::new();
    for source in &ordered {
        let mut by_id: BTreeMap<String, &ProductRecord> = BTreeMap::new();
        for record in &source.records {
            if by_id.contains_key(&record.id) {
                out.warnings.push(format!(
                    "source '{}': duplicate id '{}', first occurrence kept",
                    source.source, record.id
                ));
                continue;
            }
            by_id.insert(record.id.clone(), record);
        }
        per_source.push((source.source.as_str(), by_id));
    }

    // Canonical id set in first-seen order across the precedence chain,
    // so output ordering is stable run to run.
    let mut ids: Vec<String> = Vec::new();
    for source in &ordered {
        for record in &source.records {
            if !ids.contains(&record.id) {
                ids.push(record.id.clone());
            }
        }
    }

    for id in &ids {
        let mut merged = ProductRecord::blank(id);
        let mut category_source: Option<String> = None;

        for (source_name, by_id) in &per_source {
            let Some(record) = by_id.get(id).copied() else { continue };
            fold_record(
                &mut merged,
                record,
                source_name,
                &mut category_source,
                &mut out.conflicts,
                &mut out.violations,
            );
        }

        out.records.push(merged);
    }

    out
}

/// Fold one source record into the accumulating merged record. The
/// accumulator always holds the higher-precedence state.
fn fold_record(
    merged: &mut ProductRecord,
    incoming: &ProductRecord,
    source: &str,
    category_source: &mut Option<String>,
    conflicts: &mut Vec<MergeConflict>,
    violations: &mut Vec<IntegrityViolation>,
) {
    let id = merged.id.clone();

    take_scalar(&mut merged.name, &incoming.name, &id, "name", source, conflicts);
    take_scalar(&mut merged.short_name, &incoming.short_name, &id, "shortName", source, conflicts);
    take_scalar(&mut merged.description, &incoming.description, &id, "description", source, conflicts);
    take_scalar(&mut merged.created_at, &incoming.created_at, &id, "createdAt", source, conflicts);

    if merged.image_url.is_none() {
        merged.image_url = incoming.image_url.clone();
    }

    // Category: first source wins; later disagreement is fatal input data.
    match (merged.category, incoming.category) {
        (None, Some(cat)) => {
            merged.category = Some(cat);
            *category_source = Some(source.to_string());
        }
        (Some(existing), Some(incoming_cat)) if existing != incoming_cat => {
            violations.push(IntegrityViolation {
                id: id.clone(),
                detail: format!(
                    "category conflict: {existing} (source '{}') vs {incoming_cat} (source '{source}')",
                    category_source.as_deref().unwrap_or("?")
                ),
            });
        }
        _ => {}
    }

    // Confidence-bearing group: highest tier wins across sources; ties
    // keep the higher-precedence (already-folded) value.
    if incoming.chemistry != UNKNOWN_CHEMISTRY
        && incoming.chemistry_confidence > merged.chemistry_confidence
    {
        if merged.chemistry != UNKNOWN_CHEMISTRY && merged.chemistry != incoming.chemistry {
            conflicts.push(MergeConflict {
                id: id.clone(),
                field: "chemistry".into(),
                winner: incoming.chemistry.clone(),
                winner_source: source.into(),
                loser: merged.chemistry.clone(),
                loser_source: merged.chemistry_source.clone(),
            });
        }
        merged.chemistry = incoming.chemistry.clone();
        merged.chemistry_confidence = incoming.chemistry_confidence;
        merged.chemistry_source = if incoming.chemistry_source.is_empty() {
            source.into()
        } else {
            incoming.chemistry_source.clone()
        };
    } else if incoming.chemistry != UNKNOWN_CHEMISTRY
        && merged.chemistry != UNKNOWN_CHEMISTRY
        && incoming.chemistry != merged.chemistry
    {
        conflicts.push(MergeConflict {
            id: id.clone(),
            field: "chemistry".into(),
            winner: merged.chemistry.clone(),
            winner_source: merged.chemistry_source.clone(),
            loser: incoming.chemistry.clone(),
            loser_source: source.into(),
        });
    }

    take_scalar(&mut merged.product_type, &incoming.product_type, &id, "productType", source, conflicts);

    union_into(&mut merged.industry, &incoming.industry);
    union_into(&mut merged.pdf_links, &incoming.pdf_links);
    union_into(&mut merged.sizes, &incoming.sizes);
    union_into(&mut merged.benefits, &incoming.benefits);
    union_into(&mut merged.search_keywords, &incoming.search_keywords);

    for (k, v) in &incoming.technical_data {
        if !v.is_empty() {
            merged
                .technical_data
                .entry(k.clone())
                .or_insert_with(|| v.clone());
        }
    }

    if merged.standard_tds_link.is_none() {
        merged.standard_tds_link = incoming.standard_tds_link.clone();
        merged.has_tds_link = incoming.has_tds_link;
    }

    merged.version = merged.version.max(incoming.version);
    if merged.updated_at.is_empty() {
        merged.updated_at = incoming.updated_at.clone();
    }
}

/// First non-empty value by precedence; a differing later value is
/// retained only as provenance.
fn take_scalar(
    current: &mut String,
    incoming: &str,
    id: &str,
    field: &str,
    source: &str,
    conflicts: &mut Vec<MergeConflict>,
) {
    if incoming.is_empty() {
        return;
    }
    if current.is_empty() {
        *current = incoming.to_string();
    } else if current.as_str() != incoming {
        conflicts.push(MergeConflict {
            id: id.into(),
            field: field.into(),
            winner: current.clone(),
            winner_source: String::new(),
            loser: incoming.to_string(),
            loser_source: source.into(),
        });
    }
}

/// Ordered union: append unseen values, preserving first-seen order.
fn union_into(current: &mut Vec<String>, incoming: &[String]) {
    for v in incoming {
        if !current.contains(v) {
            current.push(v.clone());
        }
    }
}
