use std::fmt;

#[derive(Debug)]
pub enum FormError {
    /// Reading or writing a file failed (form store, import file, trace)
    Io { path: String, source: std::io::Error },

    /// JSON parsing failed
    JsonParse { context: String, source: serde_json::Error },

    /// JSON serialization failed
    JsonSerialize { context: String, source: serde_json::Error },

    /// YAML parsing failed (form import)
    YamlParse { context: String, source: serde_yaml::Error },

    /// No saved form with this name
    FormNotFound(String),

    /// Field id not present in the form
    UnknownField(String),

    /// Derived fields are computed and never edited directly
    ReadOnlyField(String),

    /// Option not offered by a select, radio or checkbox field
    UnknownOption { field: String, option: String },

    /// Another field already uses this id
    DuplicateFieldId(String),

    /// Field index outside the field list
    FieldIndex { index: usize, len: usize },

    /// Forms are saved under a non-empty name
    EmptyFormName,

    /// `--set`/`--check` argument that is not `key=value`
    InvalidAssignment(String),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path, source)
            }
            FormError::JsonParse { context, source } => {
                write!(f, "JSON parse error ({}): {}", context, source)
            }
            FormError::JsonSerialize { context, source } => {
                write!(f, "JSON serialize error ({}): {}", context, source)
            }
            FormError::YamlParse { context, source } => {
                write!(f, "YAML parse error ({}): {}", context, source)
            }
            FormError::FormNotFound(name) => {
                write!(f, "No saved form named '{}'", name)
            }
            FormError::UnknownField(id) => {
                write!(f, "Field '{}' not found", id)
            }
            FormError::ReadOnlyField(id) => {
                write!(f, "Field '{}' is derived and cannot be edited", id)
            }
            FormError::UnknownOption { field, option } => {
                write!(f, "Field '{}' has no option '{}'", field, option)
            }
            FormError::DuplicateFieldId(id) => {
                write!(f, "Field id '{}' is already in use", id)
            }
            FormError::FieldIndex { index, len } => {
                write!(f, "Field index {} out of range ({} fields)", index, len)
            }
            FormError::EmptyFormName => {
                write!(f, "Form name must not be empty")
            }
            FormError::InvalidAssignment(raw) => {
                write!(f, "Expected id=value, got '{}'", raw)
            }
        }
    }
}

impl std::error::Error for FormError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormError::Io { source, .. } => Some(source),
            FormError::JsonParse { source, .. } => Some(source),
            FormError::JsonSerialize { source, .. } => Some(source),
            FormError::YamlParse { source, .. } => Some(source),
            _ => None,
        }
    }
}
