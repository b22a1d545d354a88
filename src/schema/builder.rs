use chrono::Utc;
use uuid::Uuid;

use crate::error::FormError;
use crate::schema::field_model::{Field, FieldType, Form};

/// Ordered field list being edited. Saving produces a new, immutable `Form`;
/// editing a saved form starts a new builder from its fields.
#[derive(Debug, Clone, Default)]
pub struct FormBuilder {
    fields: Vec<Field>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_form(form: &Form) -> Self {
        Self {
            fields: form.fields.clone(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a blank field with a fresh id. Returns the id.
    pub fn add_field(&mut self, field_type: FieldType) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        while self.contains(&id) {
            id = Uuid::new_v4().simple().to_string();
        }
        self.fields.push(Field::new(id.clone(), field_type));
        id
    }

    /// Append a complete field, keeping its id.
    pub fn push_field(&mut self, field: Field) -> Result<(), FormError> {
        if self.contains(&field.id) {
            return Err(FormError::DuplicateFieldId(field.id));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Replace the field at `index`. The replacement may change the id only
    /// to one no other field uses.
    pub fn update_field(&mut self, index: usize, field: Field) -> Result<(), FormError> {
        let len = self.fields.len();
        if index >= len {
            return Err(FormError::FieldIndex { index, len });
        }
        let clash = self
            .fields
            .iter()
            .enumerate()
            .any(|(i, f)| i != index && f.id == field.id);
        if clash {
            return Err(FormError::DuplicateFieldId(field.id));
        }
        self.fields[index] = field;
        Ok(())
    }

    pub fn remove_field(&mut self, index: usize) -> Result<Field, FormError> {
        let len = self.fields.len();
        if index >= len {
            return Err(FormError::FieldIndex { index, len });
        }
        Ok(self.fields.remove(index))
    }

    /// Move a field by `offset` positions (-1 = up, 1 = down).
    /// Moves that would leave the list are ignored; returns whether it moved.
    pub fn move_field(&mut self, index: usize, offset: isize) -> bool {
        let Some(target) = index.checked_add_signed(offset) else {
            return false;
        };
        if index >= self.fields.len() || target >= self.fields.len() {
            return false;
        }
        let field = self.fields.remove(index);
        self.fields.insert(target, field);
        true
    }

    /// Freeze the current fields into a named form stamped with the time.
    pub fn save(&self, name: &str) -> Result<Form, FormError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FormError::EmptyFormName);
        }
        Ok(Form {
            name: name.to_string(),
            created: Some(Utc::now()),
            fields: self.fields.clone(),
        })
    }

    fn contains(&self, id: &str) -> bool {
        self.fields.iter().any(|f| f.id == id)
    }
}
