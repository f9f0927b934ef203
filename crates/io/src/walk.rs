// Document tree scan and image directory listing

use std::path::{Path, PathBuf};

use catalog_recon::model::AssetCandidate;

/// Walk the TDS tree: root -> industry folders -> product folders ->
/// PDFs (directly or under a nested "TDS" folder). Paths in the result
/// are relative to the root with `/` separators; ordering is sorted and
/// therefore stable across runs.
pub fn scan_document_tree(root: &Path) -> Result<Vec<AssetCandidate>, String> {
    let mut candidates = Vec::new();

    for industry_dir in sorted_entries(root)? {
        if !industry_dir.is_dir() {
            continue;
        }
        let industry = dir_name(&industry_dir);
        collect_pdfs(root, &industry_dir, &industry, &industry, &mut candidates)?;
    }

    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(candidates)
}

fn collect_pdfs(
    root: &Path,
    dir: &Path,
    industry: &str,
    token: &str,
    out: &mut Vec<AssetCandidate>,
) -> Result<(), String> {
    for entry in sorted_entries(dir)? {
        if entry.is_dir() {
            let name = dir_name(&entry);
            // A nested "TDS" folder keeps the product folder's token;
            // any other folder becomes the new token.
            let next_token = if name.eq_ignore_ascii_case("tds") {
                token.to_string()
            } else {
                name
            };
            collect_pdfs(root, &entry, industry, &next_token, out)?;
        } else if has_extension(&entry, &["pdf"]) {
            let size = entry
                .metadata()
                .map_err(|e| format!("{}: {e}", entry.display()))?
                .len();
            out.push(AssetCandidate {
                path: relative_path(root, &entry),
                industry: industry.to_string(),
                token: token.to_string(),
                file_size: size,
            });
        }
    }
    Ok(())
}

/// File names (not paths) of the images in a flat directory, sorted. A
/// missing directory is an empty list, not an error.
pub fn list_images(dir: &Path) -> Result<Vec<String>, String> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = sorted_entries(dir)?
        .into_iter()
        .filter(|p| has_extension(p, &["png", "jpg", "jpeg"]))
        .map(|p| dir_name(&p))
        .collect();
    names.sort();
    Ok(names)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| format!("{}: {e}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| {
            let e = e.to_string_lossy().to_ascii_lowercase();
            extensions.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
