use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Product family. The catalog recognizes exactly three; anything else in a
/// source is an integrity violation, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Bond,
    Seal,
    Tape,
}

impl Category {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BOND" => Some(Self::Bond),
            "SEAL" => Some(Self::Seal),
            "TAPE" => Some(Self::Tape),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bond => write!(f, "BOND"),
            Self::Seal => write!(f, "SEAL"),
            Self::Tape => write!(f, "TAPE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Trust tier for a chemistry classification. Ordinal: a merge must never
/// replace a higher tier with a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "None" | "none" | "" => Some(Self::None),
            "Low" | "low" => Some(Self::Low),
            "Medium" | "medium" => Some(Self::Medium),
            "High" | "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::None
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical id
// ---------------------------------------------------------------------------

/// Normalize a raw product identifier to the canonical key used across all
/// sources: trimmed, lowercased, whitespace and underscores hyphenated.
pub fn canonical_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_hyphen = false;
    for ch in raw.trim().chars() {
        let mapped = if ch.is_whitespace() || ch == '_' { '-' } else { ch };
        if mapped == '-' {
            if last_hyphen || out.is_empty() {
                continue;
            }
            last_hyphen = true;
            out.push('-');
        } else {
            last_hyphen = false;
            for lower in mapped.to_lowercase() {
                out.push(lower);
            }
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

// ---------------------------------------------------------------------------
// Product record
// ---------------------------------------------------------------------------

pub const UNKNOWN_CHEMISTRY: &str = "Unknown";

/// One product as carried through the pipeline. Sources populate it
/// partially; the merge engine collapses per-source records into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<Category>,
    #[serde(default)]
    pub industry: Vec<String>,
    #[serde(default)]
    pub product_type: String,
    #[serde(default = "default_chemistry")]
    pub chemistry: String,
    #[serde(default)]
    pub chemistry_confidence: Confidence,
    #[serde(default)]
    pub chemistry_source: String,
    #[serde(default)]
    pub technical_data: BTreeMap<String, String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub pdf_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_tds_link: Option<String>,
    #[serde(default)]
    pub has_tds_link: bool,
    #[serde(default)]
    pub search_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub version: u64,
}

fn default_chemistry() -> String {
    UNKNOWN_CHEMISTRY.to_string()
}

impl ProductRecord {
    /// A blank record under a canonical id. Everything else empty; the
    /// chemistry/confidence pair starts at its coupled resting state.
    pub fn blank(id: &str) -> Self {
        Self {
            id: canonical_id(id),
            name: String::new(),
            short_name: String::new(),
            description: String::new(),
            category: None,
            industry: Vec::new(),
            product_type: String::new(),
            chemistry: UNKNOWN_CHEMISTRY.to_string(),
            chemistry_confidence: Confidence::None,
            chemistry_source: String::new(),
            technical_data: BTreeMap::new(),
            sizes: Vec::new(),
            benefits: Vec::new(),
            pdf_links: Vec::new(),
            standard_tds_link: None,
            has_tds_link: false,
            search_keywords: Vec::new(),
            image_url: None,
            created_at: String::new(),
            updated_at: String::new(),
            version: 0,
        }
    }

    /// Text the classifier sees: id, name and description joined.
    pub fn classification_text(&self) -> String {
        format!("{} {} {}", self.id, self.name, self.description)
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// A document discovered under the TDS tree, before it is linked to a
/// product. `token` is the loosely-inferred identifier from the folder or
/// file name; `file_size` is a deterministic tie-break signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetCandidate {
    pub path: String,
    pub industry: String,
    pub token: String,
    pub file_size: u64,
}

// ---------------------------------------------------------------------------
// Merge provenance
// ---------------------------------------------------------------------------

/// A field-level conflict the merge engine resolved. The losing value is
/// retained here only; it never reaches the output record.
#[derive(Debug, Clone, Serialize)]
pub struct MergeConflict {
    pub id: String,
    pub field: String,
    pub winner: String,
    pub winner_source: String,
    pub loser: String,
    pub loser_source: String,
}

/// A data-integrity problem that requires human resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityViolation {
    pub id: String,
    pub detail: String,
}
