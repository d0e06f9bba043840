//! Declarative field mappings from provider payloads to models

use crate::error::{Error, Result};
use crate::types::JsonObject;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Conversion applied to an extracted source value
pub type TransformFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Maps one source field (a dot path) onto one target model field.
///
/// Path segments index objects by key and arrays by position, so
/// `data.candles.0.4` reaches into nested arrays.
#[derive(Clone)]
pub struct ModelMapping {
    pub target_field: String,
    pub source_field: String,
    pub transform: Option<TransformFn>,
    pub default: Option<Value>,
    pub required: bool,
}

impl ModelMapping {
    /// Required mapping without a transform
    pub fn new(target_field: impl Into<String>, source_field: impl Into<String>) -> Self {
        Self {
            target_field: target_field.into(),
            source_field: source_field.into(),
            transform: None,
            default: None,
            required: true,
        }
    }

    /// Mapping that always yields `value`, for fields the payload lacks
    pub fn constant(target_field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(target_field, "").with_default(value.into())
    }

    #[must_use]
    pub fn with_transform(mut self, transform: TransformFn) -> Self {
        self.transform = Some(transform);
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn extract<'a>(&self, source: &'a Value) -> Option<&'a Value> {
        if self.source_field.is_empty() {
            return None;
        }
        self.source_field
            .split('.')
            .try_fold(source, |current, part| match current {
                Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => current.get(part),
            })
    }

    /// Resolve the target value from `source`.
    ///
    /// A missing or null source yields the default, then an error when the
    /// field is required, then `null`. The default is used verbatim and never
    /// passed through the transform.
    pub fn apply(&self, source: &Value) -> Result<Value> {
        match self.extract(source) {
            Some(value) if !value.is_null() => match self.transform {
                Some(ref transform) => transform(value).map_err(|e| {
                    Error::mapping(format!(
                        "transform failed for field '{}': {e}",
                        self.target_field
                    ))
                }),
                None => Ok(value.clone()),
            },
            _ => {
                if let Some(ref default) = self.default {
                    Ok(default.clone())
                } else if self.required {
                    Err(Error::mapping(format!(
                        "required field '{}' not found at path '{}'",
                        self.target_field, self.source_field
                    )))
                } else {
                    Ok(Value::Null)
                }
            }
        }
    }
}

impl fmt::Debug for ModelMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMapping")
            .field("target_field", &self.target_field)
            .field("source_field", &self.source_field)
            .field("has_transform", &self.transform.is_some())
            .field("default", &self.default)
            .field("required", &self.required)
            .finish()
    }
}

/// Build the target object described by `mappings`, omitting null fields
pub fn map_fields(raw: &Value, mappings: &[ModelMapping]) -> Result<JsonObject> {
    let mut object = JsonObject::new();
    for mapping in mappings {
        let value = mapping.apply(raw)?;
        if !value.is_null() {
            object.insert(mapping.target_field.clone(), value);
        }
    }
    Ok(object)
}

/// Apply `mappings` to `raw` and deserialize the result into `T`
pub fn apply_mapping<T: DeserializeOwned>(raw: &Value, mappings: &[ModelMapping]) -> Result<T> {
    let object = map_fields(raw, mappings)?;
    serde_json::from_value(Value::Object(object)).map_err(|e| {
        Error::mapping(format!(
            "failed to build {}: {e}",
            short_type_name::<T>()
        ))
    })
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
