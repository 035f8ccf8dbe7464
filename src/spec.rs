//! API spec document → in-memory Spec Store
//!
//! Deserializes an already-parsed API spec (`operations`, `templates`,
//! `contexts`, `defaults`) into typed, read-only structures.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ResolveError;

/// Placeholder name → concrete value.
pub type Context = Map<String, Value>;

/// The request half of an operation or template.
///
/// Every field is optional until the template merge; `method` and
/// `location` must be present afterwards.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub method: Option<String>,
    /// URL path, relative to the API base URL.
    pub location: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    pub body: Option<Value>,
    /// Read from `contentType` or its alias `type`. A document that sets
    /// both is rejected as a duplicate field.
    #[serde(alias = "type")]
    pub content_type: Option<String>,
    /// Callable reference (`module:name`) of a payload generator.
    pub generator: Option<String>,
}

/// The response half of an operation or template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    /// `contentType`, or `type`; not both.
    #[serde(alias = "type")]
    pub content_type: Option<String>,
    /// Callable reference (`module:name`) of a response parser.
    pub parser: Option<String>,
}

/// A reusable partial operation. Never dispatched on its own.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TemplateSpec {
    #[serde(default)]
    pub request: RequestSpec,
    #[serde(default)]
    pub response: ResponseSpec,
}

/// A named, declarative description of one HTTP call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OperationSpec {
    /// Key of the operation under `operations`.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub request: RequestSpec,
    #[serde(default)]
    pub response: ResponseSpec,
    pub template: Option<String>,
    pub context: Option<String>,
}

/// Store-wide settings from the `defaults` block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Marshal type for structured request params without a typed wrapper.
    pub structured_param_type: Option<String>,
    /// Marshal type for a structured request body without a typed wrapper.
    pub structured_body_type: Option<String>,
    /// Reinterpret whole-placeholder string substitutions as number/bool/list literals.
    pub coerce_literals: bool,
    /// Fill params whose name matches a context key before placeholder substitution.
    pub implicit_params: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            structured_param_type: None,
            structured_body_type: None,
            coerce_literals: true,
            implicit_params: false,
        }
    }
}

/// Read-only collection of operations, templates, contexts and defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpecStore {
    pub operations: BTreeMap<String, OperationSpec>,
    pub templates: BTreeMap<String, TemplateSpec>,
    pub contexts: BTreeMap<String, Context>,
    pub defaults: Defaults,
}

impl SpecStore {
    /// Build a store from a parsed API spec document.
    pub fn from_value(value: Value) -> Result<Self, ResolveError> {
        let mut store: SpecStore =
            serde_json::from_value(value).map_err(ResolveError::InvalidStore)?;
        for (name, op) in store.operations.iter_mut() {
            op.name = name.clone();
        }
        Ok(store)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }
}

/// A `{type, value}` wrapper carrying an explicit wire-format annotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypedValue<'a> {
    pub type_name: &'a str,
    pub value: &'a Value,
}

impl<'a> TypedValue<'a> {
    /// Detect a typed value by exact shape: an object whose only keys are
    /// `type` (a string) and `value`.
    pub fn detect(value: &'a Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.len() != 2 {
            return None;
        }
        let type_name = obj.get("type")?.as_str()?;
        let value = obj.get("value")?;
        Some(Self { type_name, value })
    }
}

/// Whether a value is a mapping or a sequence.
pub fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
