use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::CatalogError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every path has a conventional default so each stage
/// can run as an argument-free batch job; a TOML file overrides them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub name: String,
    pub sources: SourcesConfig,
    pub assets: AssetsConfig,
    pub merge: MergeConfig,
    pub output: OutputConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            name: "Product Catalog".into(),
            sources: SourcesConfig::default(),
            assets: AssetsConfig::default(),
            merge: MergeConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One raw input: a name (referenced by the precedence list) and a file.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub file: String,
    pub format: SourceFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub files: Vec<SourceFile>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            files: vec![
                SourceFile {
                    name: "consolidated".into(),
                    file: "data/productsConsolidated.json".into(),
                    format: SourceFormat::Json,
                },
                SourceFile {
                    name: "merged".into(),
                    file: "data/productsMerged.json".into(),
                    format: SourceFormat::Json,
                },
                SourceFile {
                    name: "export".into(),
                    file: "data/product_detailed_export.csv".into(),
                    format: SourceFormat::Csv,
                },
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub tds_root: String,
    pub image_dir: String,
    /// industry label (lowercase) -> numbered folder name on disk.
    pub industry_folders: BTreeMap<String, String>,
    /// Folder used when a product's industry has no mapping.
    pub default_industry_folder: String,
    /// Industry assigned when merge leaves the set empty.
    pub default_industry: String,
    /// Shared placeholder image basenames; assignments to these count as
    /// missing and are re-matched.
    pub placeholder_images: Vec<String>,
    /// Minimum similarity for a fuzzy image match.
    pub image_match_threshold: f64,
    /// Stricter bar for replacing an already-assigned near-direct match.
    pub image_direct_threshold: f64,
    /// Upper bound for one external text-extraction call, in milliseconds.
    pub extract_timeout_ms: u64,
    /// Filename marker for distribution copies (tie-break signal).
    pub distribution_marker: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let mut industry_folders = BTreeMap::new();
        industry_folders.insert("industrial".into(), "1. Industrial".into());
        industry_folders.insert("marine".into(), "2. Marine".into());
        industry_folders.insert("transportation".into(), "3. Transportation".into());
        industry_folders.insert("composites".into(), "4. Composites".into());
        industry_folders.insert("insulation".into(), "6. Insulation".into());
        industry_folders.insert("construction".into(), "7. Construction".into());
        Self {
            tds_root: "public/TDS".into(),
            image_dir: "public/product-images".into(),
            industry_folders,
            default_industry_folder: "1. Industrial".into(),
            default_industry: "industrial".into(),
            placeholder_images: vec!["placeholder".into(), "forza-logo".into()],
            image_match_threshold: 0.6,
            image_direct_threshold: 0.7,
            extract_timeout_ms: 10_000,
            distribution_marker: "FOR EMAIL".into(),
        }
    }
}

impl AssetsConfig {
    /// Disk folder for an industry label, e.g. "marine" -> "2. Marine".
    pub fn folder_for_industry(&self, industry: &str) -> &str {
        self.industry_folders
            .get(&industry.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(&self.default_industry_folder)
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Source names, highest precedence first. Sources listed here but not
    /// present in `sources.files` are ignored; sources present but not
    /// listed rank after all listed ones, in file order.
    pub precedence: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            precedence: vec!["consolidated".into(), "merged".into(), "export".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub consolidated: String,
    pub audit: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            consolidated: "data/productsConsolidated.json".into(),
            audit: "data/catalog-audit.json".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CatalogConfig {
    pub fn from_toml(input: &str) -> Result<Self, CatalogError> {
        let config: CatalogConfig =
            toml::from_str(input).map_err(|e| CatalogError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.sources.files.is_empty() {
            return Err(CatalogError::ConfigValidation(
                "at least one source file is required".into(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for s in &self.sources.files {
            if !seen.insert(s.name.as_str()) {
                return Err(CatalogError::ConfigValidation(format!(
                    "duplicate source name '{}'",
                    s.name
                )));
            }
        }

        for name in &self.merge.precedence {
            if !self.sources.files.iter().any(|s| &s.name == name) {
                return Err(CatalogError::ConfigValidation(format!(
                    "precedence references unknown source '{name}'"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.assets.image_match_threshold)
            || !(0.0..=1.0).contains(&self.assets.image_direct_threshold)
        {
            return Err(CatalogError::ConfigValidation(
                "image thresholds must be within 0.0..=1.0".into(),
            ));
        }

        Ok(())
    }

    /// Source names in resolution order: the precedence list first, then
    /// any remaining sources in file order.
    pub fn resolution_order(&self) -> Vec<String> {
        let mut order: Vec<String> = self
            .merge
            .precedence
            .iter()
            .filter(|n| self.sources.files.iter().any(|s| &&s.name == n))
            .cloned()
            .collect();
        for s in &self.sources.files {
            if !order.contains(&s.name) {
                order.push(s.name.clone());
            }
        }
        order
    }
}
