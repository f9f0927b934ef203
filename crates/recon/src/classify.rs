//! Chemistry/type classification over an ordered, declarative rule table.
//!
//! Rules are evaluated top to bottom; the first matching predicate per
//! field wins. Category-derived overrides rank above keyword rules: a
//! record already in the TAPE category is pressure-sensitive acrylic by
//! definition, regardless of what its copy text mentions.

use crate::model::{Category, Confidence, UNKNOWN_CHEMISTRY};

pub const CHEM_EPOXY: &str = "Epoxy";
pub const CHEM_SILICONE: &str = "Silicone";
pub const CHEM_PSA: &str = "Acrylic (incl. PSA)";
pub const CHEM_MS_POLYMER: &str = "Modified Silane (MS Polymer/ Hybrid Polymer)";
pub const CHEM_SOLVENT: &str = "Solvent Based";
pub const CHEM_WATER: &str = "Water Based";
pub const CHEM_PU: &str = "Polyurethane (PU)";
pub const CHEM_CYANO: &str = "Cyanoacrylates";
pub const CHEM_MMA: &str = "Methacrylate/MMA";
pub const CHEM_HOT_MELT: &str = "Hot Melt";

/// Outcome of classifying one record's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub chemistry: String,
    pub confidence: Confidence,
    pub product_type: String,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            chemistry: UNKNOWN_CHEMISTRY.into(),
            confidence: Confidence::None,
            product_type: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Predicate {
    /// Canonical id starts with the prefix, and with none of the excluded
    /// longer prefixes.
    IdPrefix {
        prefix: &'static str,
        except: &'static [&'static str],
    },
    /// Any of the keywords occurs in the lowercased name+description.
    Keyword(&'static [&'static str]),
}

impl Predicate {
    fn matches(&self, id: &str, text: &str) -> bool {
        match self {
            Self::IdPrefix { prefix, except } => {
                id.starts_with(prefix) && !except.iter().any(|e| id.starts_with(e))
            }
            Self::Keyword(words) => words.iter().any(|w| text.contains(w)),
        }
    }
}

struct ChemistryRule {
    predicate: Predicate,
    chemistry: &'static str,
    confidence: Confidence,
}

struct TypeRule {
    predicate: Predicate,
    product_type: &'static str,
}

/// Ordered chemistry rules. Id-prefix rules come first at High confidence
/// (the product-code scheme is authoritative); keyword rules follow at
/// Medium. First match wins.
const CHEMISTRY_RULES: &[ChemistryRule] = &[
    ChemistryRule {
        predicate: Predicate::IdPrefix { prefix: "ic", except: &[] },
        chemistry: CHEM_EPOXY,
        confidence: Confidence::High,
    },
    ChemistryRule {
        predicate: Predicate::IdPrefix { prefix: "r", except: &[] },
        chemistry: CHEM_EPOXY,
        confidence: Confidence::High,
    },
    ChemistryRule {
        predicate: Predicate::IdPrefix { prefix: "os", except: &[] },
        chemistry: CHEM_SILICONE,
        confidence: Confidence::High,
    },
    ChemistryRule {
        predicate: Predicate::IdPrefix { prefix: "oa", except: &[] },
        chemistry: CHEM_MS_POLYMER,
        confidence: Confidence::High,
    },
    ChemistryRule {
        predicate: Predicate::IdPrefix { prefix: "t", except: &["ta"] },
        chemistry: CHEM_PSA,
        confidence: Confidence::High,
    },
    ChemistryRule {
        predicate: Predicate::IdPrefix { prefix: "h", except: &[] },
        chemistry: CHEM_SOLVENT,
        confidence: Confidence::High,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["silicone", "silicon ", "polysiloxane"]),
        chemistry: CHEM_SILICONE,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["epoxy", "epoxies", "hardener"]),
        chemistry: CHEM_EPOXY,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["ms polymer", "hybrid polymer", "modified silane", "silyl"]),
        chemistry: CHEM_MS_POLYMER,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["cyanoacrylate", "super glue", "instant adhesive"]),
        chemistry: CHEM_CYANO,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["methacrylate", "mma"]),
        chemistry: CHEM_MMA,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["polyurethane", "urethane", "isocyanate", "polyol"]),
        chemistry: CHEM_PU,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["water based", "water-based", "aqueous", "emulsion", "latex"]),
        chemistry: CHEM_WATER,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["hot melt", "hot-melt", "thermoplastic"]),
        chemistry: CHEM_HOT_MELT,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["acrylic", "acrylate", "pressure sensitive", "pressure-sensitive", "psa"]),
        chemistry: CHEM_PSA,
        confidence: Confidence::Medium,
    },
    ChemistryRule {
        predicate: Predicate::Keyword(&["solvent based", "solvent-based", "solvent"]),
        chemistry: CHEM_SOLVENT,
        confidence: Confidence::Medium,
    },
];

/// Ordered product-type rules, mirroring the product-code scheme. Longer
/// prefixes rank before their single-letter fallbacks.
const TYPE_RULES: &[TypeRule] = &[
    TypeRule {
        predicate: Predicate::IdPrefix { prefix: "ic", except: &[] },
        product_type: "Canister",
    },
    TypeRule {
        predicate: Predicate::IdPrefix { prefix: "os", except: &[] },
        product_type: "Sealant",
    },
    TypeRule {
        predicate: Predicate::IdPrefix { prefix: "oa", except: &[] },
        product_type: "Adhesive",
    },
    TypeRule {
        predicate: Predicate::IdPrefix { prefix: "t", except: &["ta"] },
        product_type: "Tape",
    },
    TypeRule {
        predicate: Predicate::IdPrefix { prefix: "r", except: &[] },
        product_type: "Resin",
    },
    TypeRule {
        predicate: Predicate::IdPrefix { prefix: "c", except: &[] },
        product_type: "Coating",
    },
    TypeRule {
        predicate: Predicate::IdPrefix { prefix: "s", except: &[] },
        product_type: "Sealant",
    },
    TypeRule {
        predicate: Predicate::IdPrefix { prefix: "a", except: &[] },
        product_type: "Adhesive",
    },
    TypeRule {
        predicate: Predicate::Keyword(&["tape", "double sided", "double-sided"]),
        product_type: "Tape",
    },
    TypeRule {
        predicate: Predicate::Keyword(&["sealant", "seal ", "joint", "gap fill"]),
        product_type: "Sealant",
    },
    TypeRule {
        predicate: Predicate::Keyword(&["coating"]),
        product_type: "Coating",
    },
    TypeRule {
        predicate: Predicate::Keyword(&["resin"]),
        product_type: "Resin",
    },
    TypeRule {
        predicate: Predicate::Keyword(&["canister", "cartridge"]),
        product_type: "Canister",
    },
    TypeRule {
        predicate: Predicate::Keyword(&["adhesive", "glue", "bond"]),
        product_type: "Adhesive",
    },
];

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Pure classification of a record's identifying text. Same input, same
/// output; no state.
pub fn classify(id: &str, name: &str, description: &str, category: Option<Category>) -> Classification {
    let id = id.trim().to_lowercase();
    let text = format!("{} {}", name, description).to_lowercase();

    // Category override outranks the rule table.
    if category == Some(Category::Tape) {
        return Classification {
            chemistry: CHEM_PSA.into(),
            confidence: Confidence::High,
            product_type: "Tape".into(),
        };
    }

    let mut out = Classification::unknown();

    for rule in CHEMISTRY_RULES {
        if rule.predicate.matches(&id, &text) {
            out.chemistry = rule.chemistry.into();
            out.confidence = rule.confidence;
            break;
        }
    }

    for rule in TYPE_RULES {
        if rule.predicate.matches(&id, &text) {
            out.product_type = rule.product_type.into();
            break;
        }
    }

    out
}
