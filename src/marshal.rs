//! Substituted request → wire-format strings
//!
//! Params become a flat `name → string` map and the body becomes a
//! `{content_type, value}` pair. Structured values are rendered as JSON or
//! XML, chosen by a `{type, value}` wrapper or the store defaults.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ResolveError;
use crate::spec::{is_composite, Defaults, RequestSpec, TypedValue};
use crate::substitute::string_form;
use crate::xml::to_xml;

/// Content type of a body that was passed through without marshaling.
pub const PLAIN_TEXT: &str = "text/plain";

/// The two supported wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarshalType {
    Json,
    Xml,
}

impl MarshalType {
    /// Parse a declared type such as `json`, `application/xml` or
    /// `application/json; charset=utf-8`.
    pub fn parse(declared: &str) -> Result<Self, ResolveError> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "json" | "application/json" => Ok(Self::Json),
            "xml" | "application/xml" | "text/xml" => Ok(Self::Xml),
            _ => Err(ResolveError::UnsupportedMarshalType(declared.to_string())),
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    /// Render `value` in this format. `field` names the value in errors.
    pub fn render(self, value: &Value, field: &str) -> Result<String, ResolveError> {
        match self {
            Self::Json => serde_json::to_string(value).map_err(|e| ResolveError::Marshal {
                field: field.to_string(),
                message: e.to_string(),
            }),
            Self::Xml => to_xml(value),
        }
    }
}

/// A marshaled request body together with its wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarshaledBody {
    pub content_type: String,
    pub value: String,
}

/// Output of [`marshal`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarshaledRequest {
    pub params: BTreeMap<String, String>,
    pub body: Option<MarshaledBody>,
}

/// Marshal both the params and the body of a request.
pub fn marshal(
    request: &RequestSpec,
    defaults: &Defaults,
) -> Result<MarshaledRequest, ResolveError> {
    Ok(MarshaledRequest {
        params: marshal_params(request, defaults)?,
        body: marshal_body(request, defaults)?,
    })
}

/// Marshal every request param to a string.
///
/// Typed values use their own type, structured values use
/// `defaults.structured_param_type`, scalars are kept in string form.
pub fn marshal_params(
    request: &RequestSpec,
    defaults: &Defaults,
) -> Result<BTreeMap<String, String>, ResolveError> {
    let mut out = BTreeMap::new();
    for (name, value) in &request.params {
        let wire = if let Some(typed) = TypedValue::detect(value) {
            MarshalType::parse(typed.type_name)?.render(typed.value, name)?
        } else if is_composite(value) {
            let declared = defaults.structured_param_type.as_deref().ok_or_else(|| {
                ResolveError::MissingDefaultMarshalType {
                    field: format!("param {name}"),
                    setting: "structured_param_type",
                }
            })?;
            MarshalType::parse(declared)?.render(value, name)?
        } else {
            string_form(value)
        };
        tracing::trace!(param = %name, value = %wire, "marshaled param");
        out.insert(name.clone(), wire);
    }
    Ok(out)
}

/// Marshal the request body, if any.
///
/// The target is picked from a typed wrapper, then, for structured bodies,
/// the request's own content type or `defaults.structured_body_type`. A
/// scalar body without a wrapper is passed through as text, labelled with
/// the request's content type (`text/plain` when unset).
pub fn marshal_body(
    request: &RequestSpec,
    defaults: &Defaults,
) -> Result<Option<MarshaledBody>, ResolveError> {
    let body = match &request.body {
        Some(body) => body,
        None => return Ok(None),
    };

    let (declared, value) = if let Some(typed) = TypedValue::detect(body) {
        (Some(typed.type_name), typed.value)
    } else if is_composite(body) {
        let declared = request
            .content_type
            .as_deref()
            .or(defaults.structured_body_type.as_deref())
            .ok_or_else(|| ResolveError::MissingDefaultMarshalType {
                field: "body".to_string(),
                setting: "structured_body_type",
            })?;
        (Some(declared), body)
    } else {
        (None, body)
    };

    let marshaled = match declared {
        Some(declared) => {
            let target = MarshalType::parse(declared)?;
            MarshaledBody {
                content_type: target.mime().to_string(),
                value: target.render(value, "body")?,
            }
        }
        None => MarshaledBody {
            content_type: request
                .content_type
                .clone()
                .unwrap_or_else(|| PLAIN_TEXT.to_string()),
            value: string_form(value),
        },
    };
    tracing::trace!(content_type = %marshaled.content_type, "marshaled body");
    Ok(Some(marshaled))
}
