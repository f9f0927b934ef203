use std::fmt;

#[derive(Debug)]
pub enum CatalogError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty precedence, bad mapping, etc.).
    ConfigValidation(String),
    /// Invalid JSON in a source snapshot.
    JsonParse { source_name: String, detail: String },
    /// Residual duplicate ids after merge.
    DuplicateId(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::JsonParse { source_name, detail } => {
                write!(f, "source '{source_name}': invalid JSON: {detail}")
            }
            Self::DuplicateId(id) => write!(f, "duplicate canonical id: {id}"),
        }
    }
}

impl std::error::Error for CatalogError {}
