//! Operation + template → merged operation
//!
//! Materializes a fresh operation whose fields fall back to the template's
//! only where the operation leaves them unset.

use std::collections::BTreeMap;

use crate::error::ResolveError;
use crate::spec::{OperationSpec, RequestSpec, ResponseSpec, TemplateSpec};

/// Apply the operation's template, if it names one.
///
/// Operation fields win over template fields one by one; `request.params`
/// is merged key by key. Neither input is modified.
pub fn apply_template(
    op: &OperationSpec,
    templates: &BTreeMap<String, TemplateSpec>,
) -> Result<OperationSpec, ResolveError> {
    let name = match &op.template {
        Some(name) => name,
        None => return Ok(op.clone()),
    };

    let template = templates
        .get(name)
        .ok_or_else(|| ResolveError::TemplateNotFound { name: name.clone() })?;

    tracing::trace!(operation = %op.name, template = %name, "applying template");

    Ok(OperationSpec {
        name: op.name.clone(),
        request: overlay_request(&op.request, &template.request),
        response: overlay_response(&op.response, &template.response),
        template: op.template.clone(),
        context: op.context.clone(),
    })
}

fn overlay_request(own: &RequestSpec, base: &RequestSpec) -> RequestSpec {
    let mut params = base.params.clone();
    for (key, value) in &own.params {
        params.insert(key.clone(), value.clone());
    }

    RequestSpec {
        method: own.method.clone().or_else(|| base.method.clone()),
        location: own.location.clone().or_else(|| base.location.clone()),
        params,
        body: own.body.clone().or_else(|| base.body.clone()),
        content_type: own
            .content_type
            .clone()
            .or_else(|| base.content_type.clone()),
        generator: own.generator.clone().or_else(|| base.generator.clone()),
    }
}

fn overlay_response(own: &ResponseSpec, base: &ResponseSpec) -> ResponseSpec {
    ResponseSpec {
        content_type: own
            .content_type
            .clone()
            .or_else(|| base.content_type.clone()),
        parser: own.parser.clone().or_else(|| base.parser.clone()),
    }
}
