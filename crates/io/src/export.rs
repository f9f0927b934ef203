// CSV export of the consolidated catalog

use std::path::Path;

use catalog_recon::model::ProductRecord;

/// Export header. Column names match what the normalizer resolves, so an
/// export can be re-ingested as a source.
const HEADER: &[&str] = &[
    "ID",
    "Name",
    "Title",
    "Description",
    "Category",
    "Product Type",
    "Chemistry",
    "Chemistry Confidence",
    "Industry",
    "Sizes",
    "Benefits",
    "PDF Links",
    "Image URL",
    "Technical Data",
];

pub fn export_csv(records: &[ProductRecord], path: &Path) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    writer.write_record(HEADER).map_err(|e| e.to_string())?;

    for record in records {
        let technical_data = if record.technical_data.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&record.technical_data).map_err(|e| e.to_string())?
        };
        writer
            .write_record([
                record.id.as_str(),
                record.name.as_str(),
                record.short_name.as_str(),
                record.description.as_str(),
                &record.category.map(|c| c.to_string()).unwrap_or_default(),
                record.product_type.as_str(),
                record.chemistry.as_str(),
                &record.chemistry_confidence.to_string(),
                &record.industry.join("; "),
                &record.sizes.join("; "),
                &record.benefits.join("; "),
                &record.pdf_links.join("; "),
                record.image_url.as_deref().unwrap_or(""),
                &technical_data,
            ])
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}
