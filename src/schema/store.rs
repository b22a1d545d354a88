use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::FormError;
use crate::schema::field_model::{Field, Form};

/// Saved forms, kept as one JSON array in a file. Forms are only ever
/// appended; a saved form is never rewritten.
#[derive(Debug, Clone)]
pub struct FormStore {
    path: PathBuf,
}

impl FormStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All saved forms, oldest first. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<Form>, FormError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| FormError::JsonParse {
            context: self.path.display().to_string(),
            source: e,
        })
    }

    /// Append a saved form and write the whole list back.
    pub fn append(&self, form: Form) -> Result<Vec<Form>, FormError> {
        if form.name.trim().is_empty() {
            return Err(FormError::EmptyFormName);
        }
        let mut forms = self.load()?;
        forms.push(form);

        let json = serde_json::to_string_pretty(&forms).map_err(|e| FormError::JsonSerialize {
            context: "saved forms".to_string(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;

        tracing::info!(path = %self.path.display(), total = forms.len(), "form saved");
        Ok(forms)
    }

    /// The most recently saved form with this name.
    pub fn find(&self, name: &str) -> Result<Form, FormError> {
        self.load()?
            .into_iter()
            .rev()
            .find(|f| f.name == name)
            .ok_or_else(|| FormError::FormNotFound(name.to_string()))
    }

    fn io_error(&self, source: std::io::Error) -> FormError {
        FormError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// One line per saved form: `name - created`.
pub fn summary_line(form: &Form) -> String {
    match form.created {
        Some(created) => format!("{} - {}", form.name, created.format("%Y-%m-%d %H:%M:%S")),
        None => form.name.clone(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FormFile {
    Fields(Vec<Field>),
    Form(Form),
}

/// Read a form definition for import: either a whole form or a bare field
/// list. YAML for `.yaml`/`.yml`, JSON otherwise.
pub fn read_form_file(path: &Path) -> Result<Form, FormError> {
    let content = std::fs::read_to_string(path).map_err(|e| FormError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let context = path.display().to_string();

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed: FormFile = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| FormError::YamlParse { context, source: e })?
    } else {
        serde_json::from_str(&content).map_err(|e| FormError::JsonParse { context, source: e })?
    };

    Ok(match parsed {
        FormFile::Fields(fields) => Form::draft(fields),
        FormFile::Form(form) => form,
    })
}
