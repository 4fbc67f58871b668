//! Exam form port

use std::sync::Mutex;

use tokio::sync::watch;
use tracing::info;

use crate::state::FieldValue;

/// Kind of a form control, as far as saving and restoring cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Hidden,
}

impl FieldKind {
    /// Controls whose state is their checked flag rather than their value
    pub fn is_toggle(&self) -> bool {
        matches!(self, FieldKind::Checkbox | FieldKind::Radio)
    }
}

/// A single form control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
    pub value: String,
    pub checked: bool,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
            checked: false,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text, value)
    }

    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        Self {
            checked,
            ..Self::new(name, FieldKind::Checkbox, "on")
        }
    }

    pub fn radio(name: impl Into<String>, value: impl Into<String>, checked: bool) -> Self {
        Self {
            checked,
            ..Self::new(name, FieldKind::Radio, value)
        }
    }

    pub fn hidden(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Hidden, value)
    }

    /// The value autosave records for this control
    pub fn saved_value(&self) -> FieldValue {
        if self.kind.is_toggle() {
            FieldValue::Bool(self.checked)
        } else {
            FieldValue::String(self.value.clone())
        }
    }

    /// Apply a previously saved value to this control
    pub fn restore(&mut self, value: &FieldValue) {
        if self.kind.is_toggle() {
            self.checked = value.is_truthy();
        } else {
            self.value = value.to_string();
        }
    }
}

/// The form the exam is submitted through
pub trait HostForm: Send + Sync {
    /// All controls in document order
    fn fields(&self) -> Vec<FormField>;

    /// Restore a saved value into the control named `name`.
    /// Returns false when no such control exists.
    fn restore_field(&self, name: &str, value: &FieldValue) -> bool;

    fn append_hidden_field(&self, name: &str, value: &str);

    /// Programmatic submission
    fn submit(&self);
}

/// In-memory form whose submissions are published on a watch channel
#[derive(Debug)]
pub struct MemoryForm {
    fields: Mutex<Vec<FormField>>,
    submissions_tx: watch::Sender<u32>,
}

impl MemoryForm {
    pub fn new(fields: Vec<FormField>) -> Self {
        let (submissions_tx, _) = watch::channel(0);
        Self {
            fields: Mutex::new(fields),
            submissions_tx,
        }
    }

    /// First control named `name`
    pub fn field(&self, name: &str) -> Option<FormField> {
        self.fields
            .lock()
            .ok()?
            .iter()
            .find(|field| field.name == name)
            .cloned()
    }

    /// Simulate the exam taker editing a control
    pub fn edit<F>(&self, name: &str, editor: F) -> bool
    where
        F: FnOnce(&mut FormField),
    {
        let Ok(mut fields) = self.fields.lock() else {
            return false;
        };
        match fields.iter_mut().find(|field| field.name == name) {
            Some(field) => {
                editor(field);
                true
            }
            None => false,
        }
    }

    pub fn submission_count(&self) -> u32 {
        *self.submissions_tx.borrow()
    }

    /// Receiver that observes every submission
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.submissions_tx.subscribe()
    }
}

impl HostForm for MemoryForm {
    fn fields(&self) -> Vec<FormField> {
        self.fields
            .lock()
            .map(|fields| fields.clone())
            .unwrap_or_default()
    }

    fn restore_field(&self, name: &str, value: &FieldValue) -> bool {
        self.edit(name, |field| field.restore(value))
    }

    fn append_hidden_field(&self, name: &str, value: &str) {
        if let Ok(mut fields) = self.fields.lock() {
            fields.push(FormField::hidden(name, value));
        }
    }

    fn submit(&self) {
        self.submissions_tx.send_modify(|count| *count += 1);
        info!("Form submitted ({} total)", self.submission_count());
    }
}
