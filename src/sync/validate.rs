//! Structural checks applied to every slice received from another window.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("slice {0:?} is not synchronized")]
    NotAllowed(String),

    #[error("slice {0:?} must be an object")]
    NotAnObject(String),

    #[error("{slice}.{field}: {reason}")]
    InvalidField {
        slice: String,
        field: String,
        reason: &'static str,
    },
}

/// Shape check for the fields of one slice. The slice itself is already known to be an object.
pub type SliceValidator =
    fn(slice: &str, fields: &Map<String, Value>) -> Result<(), ValidationError>;

/// Per-slice validators. Slices without a dedicated validator only need to be objects.
#[derive(Clone)]
pub struct SliceValidators {
    validators: BTreeMap<String, SliceValidator>,
}

impl std::fmt::Debug for SliceValidators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.validators.keys()).finish()
    }
}

impl Default for SliceValidators {
    fn default() -> Self {
        let mut validators = Self::empty();
        validators.register("loading", validate_loading);
        validators.register("fileManager", validate_file_manager);
        validators.register("plots", validate_plots);
        validators.register("dda", validate_dda);
        validators
    }
}

impl SliceValidators {
    pub fn empty() -> Self {
        Self {
            validators: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, slice: impl Into<String>, validator: SliceValidator) {
        self.validators.insert(slice.into(), validator);
    }

    pub fn validate(&self, slice: &str, value: &Value) -> Result<(), ValidationError> {
        let Value::Object(fields) = value else {
            return Err(ValidationError::NotAnObject(slice.to_owned()));
        };
        match self.validators.get(slice) {
            Some(validator) => validator(slice, fields),
            None => Ok(()),
        }
    }
}

fn invalid(slice: &str, field: &str, reason: &'static str) -> ValidationError {
    ValidationError::InvalidField {
        slice: slice.to_owned(),
        field: field.to_owned(),
        reason,
    }
}

fn optional_object(
    slice: &str,
    fields: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match fields.get(field) {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(invalid(slice, field, "expected an object or null")),
    }
}

fn optional_bool(
    slice: &str,
    fields: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match fields.get(field) {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(invalid(slice, field, "expected a boolean")),
    }
}

fn optional_array(
    slice: &str,
    fields: &Map<String, Value>,
    field: &str,
) -> Result<(), ValidationError> {
    match fields.get(field) {
        None | Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(invalid(slice, field, "expected an array")),
    }
}

/// `operations` maps operation ids to operation records.
fn validate_loading(slice: &str, fields: &Map<String, Value>) -> Result<(), ValidationError> {
    match fields.get("operations") {
        None => {}
        Some(Value::Object(operations)) => {
            if !operations.values().all(Value::is_object) {
                return Err(invalid(slice, "operations", "every operation must be an object"));
            }
        }
        Some(_) => return Err(invalid(slice, "operations", "expected an object")),
    }
    optional_bool(slice, fields, "isServerReady")
}

fn validate_file_manager(slice: &str, fields: &Map<String, Value>) -> Result<(), ValidationError> {
    match fields.get("selectedChannels") {
        None => {}
        Some(Value::Array(channels)) => {
            if !channels.iter().all(Value::is_string) {
                return Err(invalid(slice, "selectedChannels", "expected channel names"));
            }
        }
        Some(_) => return Err(invalid(slice, "selectedChannels", "expected an array")),
    }
    optional_object(slice, fields, "selectedFile")?;
    optional_array(slice, fields, "currentPath")
}

fn validate_plots(slice: &str, fields: &Map<String, Value>) -> Result<(), ValidationError> {
    optional_object(slice, fields, "metadata")?;
    optional_object(slice, fields, "currentChunk")?;
    optional_bool(slice, fields, "isLoading")
}

fn validate_dda(slice: &str, fields: &Map<String, Value>) -> Result<(), ValidationError> {
    optional_object(slice, fields, "currentAnalysis")?;
    optional_array(slice, fields, "analysisHistory")?;
    optional_bool(slice, fields, "isRunning")
}
