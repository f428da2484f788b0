use std::fmt;

/// Setup failures. Per-record problems never surface here; they are counted
/// in [`crate::model::Diagnostics`].
#[derive(Debug)]
pub enum LinkError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (threshold out of range, bad delimiter, etc.).
    ConfigValidation(String),
    /// A named column is not present in the extract header.
    MissingColumn { column: String },
    /// Extraction template id not registered with the extractor.
    UnknownTemplate(String),
    /// IO error (file open/read).
    Io(String),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { column } => {
                write!(f, "registration extract: missing column '{column}'")
            }
            Self::UnknownTemplate(id) => write!(f, "unknown extraction template: {id}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
