//! Audit report: one pass over the final record set, plus everything the
//! earlier stages flagged. Persisted next to the consolidated store and
//! printed as the run summary.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::assets::LinkReport;
use crate::model::{IntegrityViolation, MergeConflict, ProductRecord, UNKNOWN_CHEMISTRY};

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAudit {
    pub total_products: usize,
    pub source_counts: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_chemistry: BTreeMap<String, usize>,
    pub by_confidence: BTreeMap<String, usize>,
    pub with_tds_link: usize,
    pub with_image: usize,
    pub unknown_chemistry: Vec<String>,
    pub unmatched_assets: Vec<String>,
    pub unmatched_images: Vec<String>,
    pub conflicts: Vec<MergeConflict>,
    pub violations: Vec<IntegrityViolation>,
    pub warnings: Vec<String>,
}

impl CatalogAudit {
    pub fn build(
        records: &[ProductRecord],
        source_counts: BTreeMap<String, usize>,
        conflicts: Vec<MergeConflict>,
        violations: Vec<IntegrityViolation>,
        warnings: Vec<String>,
        link_report: &LinkReport,
    ) -> Self {
        let mut audit = CatalogAudit {
            total_products: records.len(),
            source_counts,
            conflicts,
            violations,
            warnings,
            unmatched_assets: link_report.unmatched_assets.clone(),
            unmatched_images: link_report.images_unmatched.clone(),
            ..Default::default()
        };

        for record in records {
            let category = record
                .category
                .map(|c| c.to_string())
                .unwrap_or_else(|| "UNSET".into());
            *audit.by_category.entry(category).or_insert(0) += 1;
            *audit.by_chemistry.entry(record.chemistry.clone()).or_insert(0) += 1;
            *audit
                .by_confidence
                .entry(record.chemistry_confidence.to_string())
                .or_insert(0) += 1;
            if record.has_tds_link {
                audit.with_tds_link += 1;
            }
            if record.image_url.is_some() {
                audit.with_image += 1;
            }
            if record.chemistry == UNKNOWN_CHEMISTRY {
                audit.unknown_chemistry.push(record.id.clone());
            }
        }

        audit
    }

    /// Fatal if any integrity violation survived the run.
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Confidence};

    #[test]
    fn counts_one_pass() {
        let mut a = ProductRecord::blank("t605");
        a.category = Some(Category::Tape);
        a.chemistry = "Acrylic (incl. PSA)".into();
        a.chemistry_confidence = Confidence::High;
        a.has_tds_link = true;
        a.image_url = Some("/product-images/t605.png".into());

        let b = ProductRecord::blank("mystery");

        let mut counts = BTreeMap::new();
        counts.insert("export".to_string(), 2);
        let audit = CatalogAudit::build(
            &[a, b],
            counts,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            &LinkReport::default(),
        );
        assert_eq!(audit.total_products, 2);
        assert_eq!(audit.source_counts.get("export"), Some(&2));
        assert_eq!(audit.by_category.get("TAPE"), Some(&1));
        assert_eq!(audit.by_category.get("UNSET"), Some(&1));
        assert_eq!(audit.by_confidence.get("High"), Some(&1));
        assert_eq!(audit.by_confidence.get("None"), Some(&1));
        assert_eq!(audit.with_tds_link, 1);
        assert_eq!(audit.with_image, 1);
        assert_eq!(audit.unknown_chemistry, vec!["mystery"]);
        assert!(!audit.has_violations());
    }
}
