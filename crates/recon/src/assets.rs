//! Asset linking: associates on-disk TDS documents and product images
//! with canonical product ids.
//!
//! Document matching runs filename heuristics first, then first-page text
//! extraction through the [`TextExtractor`] seam, then an id-shaped token
//! scraped from the filename. Extraction is treated as unreliable; every
//! path has a fallback. Image matching uses normalized edit distance with
//! fixed acceptance thresholds, below which a product stays unmatched and
//! is flagged rather than guessed.

use std::collections::BTreeMap;

use regex::Regex;

use crate::config::AssetsConfig;
use crate::model::{AssetCandidate, ProductRecord};

// ---------------------------------------------------------------------------
// Text extraction seam
// ---------------------------------------------------------------------------

/// First-page text extraction for a PDF on disk. Implementations shell
/// out or read caches; tests inject a fake. A failure or timeout is an
/// `Err`, after which the linker falls back to filename heuristics.
pub trait TextExtractor {
    fn first_page_text(&self, path: &str) -> Result<String, String>;
}

/// Extractor that always fails. Used when no external tool is available;
/// the linker then relies on filename heuristics alone.
pub struct NoExtractor;

impl TextExtractor for NoExtractor {
    fn first_page_text(&self, _path: &str) -> Result<String, String> {
        Err("text extraction disabled".into())
    }
}

// ---------------------------------------------------------------------------
// Link report
// ---------------------------------------------------------------------------

/// What one asset-linking pass did, for the run summary and the audit.
#[derive(Debug, Default)]
pub struct LinkReport {
    /// Products whose standard link now points at a discovered file.
    pub linked: usize,
    /// Products that received a generated default path (no file found).
    pub defaulted: usize,
    /// Products whose image was matched this pass.
    pub images_matched: usize,
    /// Product ids left without an acceptable image match.
    pub images_unmatched: Vec<String>,
    /// Candidate files that resolved to no product.
    pub unmatched_assets: Vec<String>,
    /// Extraction failures, in path order. Non-fatal.
    pub extraction_failures: Vec<String>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Token inference
// ---------------------------------------------------------------------------

struct TextPatterns {
    product_id: Regex,
    family_line: Regex,
    filename_token: Regex,
    version: Regex,
}

impl TextPatterns {
    fn compile() -> Self {
        // Literal patterns; compilation cannot fail.
        Self {
            product_id: Regex::new(r"(?i)Product\s+ID:\s*([A-Za-z]+[\s_-]?\d+[A-Za-z]*)").unwrap(),
            family_line: Regex::new(r"(?i)Forza(?:BOND|SEAL|TAPE)\s+([A-Za-z]*\d+[A-Za-z]*)")
                .unwrap(),
            filename_token: Regex::new(r"(?i)([A-Za-z]{1,4}\d{1,5}[A-Za-z]?)").unwrap(),
            version: Regex::new(r"(?i)[_\s-]V(\d+)").unwrap(),
        }
    }
}

/// Resolve a candidate file to a product id, or None.
fn resolve_candidate(
    candidate: &AssetCandidate,
    ids: &[String],
    extractor: &dyn TextExtractor,
    patterns: &TextPatterns,
    report: &mut LinkReport,
) -> Option<String> {
    let folder_token = crate::model::canonical_id(&candidate.token);
    let file_stem = file_stem(&candidate.path);
    let stem_token = crate::model::canonical_id(&file_stem);

    // Exact folder-token match.
    if ids.iter().any(|id| *id == folder_token) {
        return Some(folder_token);
    }

    // Canonical id as substring of the folder or file name. Longest id
    // first so "ic933" does not lose to "c9".
    let mut by_len: Vec<&String> = ids.iter().collect();
    by_len.sort_by_key(|id| std::cmp::Reverse(id.len()));
    for id in &by_len {
        let squashed = id.replace('-', "");
        if stem_token.contains(id.as_str())
            || folder_token.contains(id.as_str())
            || (!squashed.is_empty() && stem_token.replace('-', "").contains(&squashed))
        {
            return Some((*id).clone());
        }
    }

    // First-page text, searched with a small ordered pattern set.
    match extractor.first_page_text(&candidate.path) {
        Ok(text) => {
            for re in [&patterns.product_id, &patterns.family_line] {
                if let Some(caps) = re.captures(&text) {
                    let token = crate::model::canonical_id(&caps[1]);
                    if ids.iter().any(|id| *id == token) {
                        return Some(token);
                    }
                }
            }
            // Leading line token: the first id-shaped word of the page.
            if let Some(first_line) = text.lines().find(|l| !l.trim().is_empty()) {
                if let Some(caps) = patterns.filename_token.captures(first_line) {
                    let token = crate::model::canonical_id(&caps[1]);
                    if ids.iter().any(|id| *id == token) {
                        return Some(token);
                    }
                }
            }
        }
        Err(reason) => {
            report
                .extraction_failures
                .push(format!("{}: {reason}", candidate.path));
        }
    }

    // Last resort: an id-shaped token from the filename itself.
    for caps in patterns.filename_token.captures_iter(&file_stem) {
        let token = crate::model::canonical_id(&caps[1]);
        if ids.iter().any(|id| *id == token) {
            return Some(token);
        }
    }

    None
}

fn file_stem(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Standard-link tie-break
// ---------------------------------------------------------------------------

/// Sort key under the tie-break policy. Lower sorts first, so the best
/// candidate is the minimum: higher embedded version number wins, then a
/// distribution-copy marker, then the smaller file, then lexical path.
fn tie_break_key(
    candidate: &AssetCandidate,
    patterns: &TextPatterns,
    marker: &str,
) -> (std::cmp::Reverse<u64>, std::cmp::Reverse<bool>, u64, String) {
    let stem = file_stem(&candidate.path);
    let version = patterns
        .version
        .captures(&stem)
        .and_then(|c| c[1].parse::<u64>().ok())
        .unwrap_or(0);
    let is_distribution = !marker.is_empty() && stem.to_ascii_uppercase().contains(marker);
    (
        std::cmp::Reverse(version),
        std::cmp::Reverse(is_distribution),
        candidate.file_size,
        candidate.path.clone(),
    )
}

// ---------------------------------------------------------------------------
// Document linking
// ---------------------------------------------------------------------------

/// Web path for a candidate file relative to the TDS root.
fn web_link(relative_path: &str) -> String {
    format!("/TDS/{relative_path}")
}

/// Default TDS path for a product that has no discovered document, under
/// the industry-folder convention.
pub fn default_tds_link(record: &ProductRecord, assets: &AssetsConfig) -> String {
    let industry = record
        .industry
        .first()
        .map(String::as_str)
        .unwrap_or(&assets.default_industry);
    let folder = assets.folder_for_industry(industry);
    let id = record.id.to_uppercase();
    format!("/TDS/{folder}/{id}/TDS/FORZA_TDS_{id}.pdf")
}

/// Link discovered documents to products, in place.
///
/// Contract: one asset is never the standard link of two products, and an
/// existing standard link that points at a discovered file is only
/// replaced by a candidate that beats it under the tie-break policy.
/// Products with no discovered document get a generated default path with
/// `has_tds_link` left false.
pub fn link_documents(
    records: &mut [ProductRecord],
    candidates: &[AssetCandidate],
    extractor: &dyn TextExtractor,
    assets: &AssetsConfig,
) -> LinkReport {
    let mut report = LinkReport::default();
    let patterns = TextPatterns::compile();
    let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
    let marker = assets.distribution_marker.to_ascii_uppercase();

    // Resolve every candidate to at most one product.
    let mut per_product: BTreeMap<String, Vec<&AssetCandidate>> = BTreeMap::new();
    for candidate in candidates {
        match resolve_candidate(candidate, &ids, extractor, &patterns, &mut report) {
            Some(id) => per_product.entry(id).or_default().push(candidate),
            None => report.unmatched_assets.push(candidate.path.clone()),
        }
    }

    for record in records.iter_mut() {
        let Some(matches) = per_product.get_mut(&record.id) else {
            if record.standard_tds_link.is_none() {
                let link = default_tds_link(record, assets);
                if !record.pdf_links.contains(&link) {
                    record.pdf_links.push(link.clone());
                }
                record.standard_tds_link = Some(link);
                record.has_tds_link = false;
                report.defaulted += 1;
            }
            continue;
        };

        matches.sort_by_key(|c| tie_break_key(c, &patterns, &marker));
        let best = matches[0];
        let best_link = web_link(&best.path);

        // Keep an existing link unless the best discovered candidate is
        // strictly better. A link that matches no discovered file is a
        // stale or generated path and is always replaced.
        let keep_existing = match &record.standard_tds_link {
            Some(existing) => matches
                .iter()
                .find(|c| web_link(&c.path) == *existing)
                .map(|existing_candidate| {
                    tie_break_key(best, &patterns, &marker)
                        >= tie_break_key(existing_candidate, &patterns, &marker)
                })
                .unwrap_or(false),
            None => false,
        };

        for candidate in matches.iter() {
            let link = web_link(&candidate.path);
            if !record.pdf_links.contains(&link) {
                record.pdf_links.push(link);
            }
        }

        if !keep_existing {
            record.standard_tds_link = Some(best_link);
        }
        record.has_tds_link = true;
        report.linked += 1;
    }

    report
}

// ---------------------------------------------------------------------------
// Image matching
// ---------------------------------------------------------------------------

/// Classic Levenshtein edit distance.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Normalized similarity in 0.0..=1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Deterministic name variants tried against each image base name: the id
/// itself, hyphens stripped, underscores substituted, and the id with its
/// leading family prefix removed.
fn id_variants(id: &str) -> Vec<String> {
    let mut variants = vec![id.to_string()];
    let squashed = id.replace('-', "");
    if squashed != id {
        variants.push(squashed);
    }
    let underscored = id.replace('-', "_");
    if underscored != id {
        variants.push(underscored);
    }
    for prefix in ["forzabond-", "forzaseal-", "forzatape-", "forza-"] {
        if let Some(rest) = id.strip_prefix(prefix) {
            if !rest.is_empty() {
                variants.push(rest.to_string());
            }
        }
    }
    variants
}

/// Best image for a product id from a list of file names. Returns the
/// file name and its similarity score; acceptance is the caller's call.
pub fn best_image_match(id: &str, image_files: &[String]) -> Option<(String, f64)> {
    let variants = id_variants(id);
    let mut best: Option<(String, f64)> = None;

    for file in image_files {
        let stem = file_stem(file).to_ascii_lowercase();
        let mut score: f64 = 0.0;
        for variant in &variants {
            score = score.max(similarity(variant, &stem));
        }
        match &best {
            Some((_, best_score)) if *best_score >= score => {}
            _ => best = Some((file.clone(), score)),
        }
    }

    best
}

fn is_placeholder(url: &str, assets: &AssetsConfig) -> bool {
    let stem = file_stem(url).to_ascii_lowercase();
    assets
        .placeholder_images
        .iter()
        .any(|p| stem.contains(&p.to_ascii_lowercase()))
}

/// Match images to products missing one (or assigned a shared
/// placeholder), in place. Below-threshold products are flagged in the
/// report, never guessed.
pub fn link_images(
    records: &mut [ProductRecord],
    image_files: &[String],
    assets: &AssetsConfig,
    report: &mut LinkReport,
) {
    for record in records.iter_mut() {
        let needs_match = match &record.image_url {
            None => true,
            Some(url) => is_placeholder(url, assets),
        };
        if !needs_match {
            continue;
        }

        match best_image_match(&record.id, image_files) {
            Some((file, score)) if score >= assets.image_match_threshold => {
                // Replacing an assigned placeholder needs the stricter
                // near-direct bar; filling a blank takes the heuristic one.
                if record.image_url.is_some() && score < assets.image_direct_threshold {
                    report.images_unmatched.push(record.id.clone());
                    continue;
                }
                record.image_url = Some(format!("/product-images/{file}"));
                report.images_matched += 1;
            }
            _ => report.images_unmatched.push(record.id.clone()),
        }
    }
}
