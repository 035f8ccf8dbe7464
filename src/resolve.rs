//! Raw operation → resolved, wire-ready operation
//!
//! Runs the stages in order: template merge, placeholder substitution,
//! marshaling, callable binding. Every call builds a fresh value; the
//! store and registry are only borrowed.

use std::collections::BTreeMap;
use std::fmt;

use crate::callable::{CallableRegistry, RequestGenerator, ResponseParser};
use crate::error::ResolveError;
use crate::marshal::{marshal, MarshaledBody, PLAIN_TEXT};
use crate::spec::{Context, OperationSpec, RequestSpec, SpecStore};
use crate::substitute::{substitute_params, substitute_with, SubstituteOptions};
use crate::template::apply_template;

/// The request half of a resolved operation.
#[derive(Clone)]
pub struct ResolvedRequest {
    pub method: String,
    pub location: String,
    pub params: BTreeMap<String, String>,
    pub body: Option<MarshaledBody>,
    pub content_type: Option<String>,
    pub generator: Option<RequestGenerator>,
}

/// The response half of a resolved operation.
#[derive(Clone)]
pub struct ResolvedResponse {
    pub content_type: Option<String>,
    pub parser: Option<ResponseParser>,
}

/// A fully resolved operation, ready to hand to an HTTP executor.
#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    pub name: String,
    pub request: ResolvedRequest,
    pub response: ResolvedResponse,
}

impl fmt::Debug for ResolvedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedRequest")
            .field("method", &self.method)
            .field("location", &self.location)
            .field("params", &self.params)
            .field("body", &self.body)
            .field("content_type", &self.content_type)
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

impl fmt::Debug for ResolvedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedResponse")
            .field("content_type", &self.content_type)
            .field("parser", &self.parser.is_some())
            .finish()
    }
}

/// Resolves operations from one store against one callable registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a SpecStore,
    registry: &'a CallableRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a SpecStore, registry: &'a CallableRegistry) -> Self {
        Self { store, registry }
    }

    /// Resolve the named operation.
    ///
    /// `params` are ad hoc context values; they win over the operation's
    /// named context.
    pub fn resolve(
        &self,
        name: &str,
        params: Option<&Context>,
    ) -> Result<ResolvedOperation, ResolveError> {
        let op = self
            .store
            .operation(name)
            .ok_or_else(|| ResolveError::OperationNotFound {
                name: name.to_string(),
            })?;
        self.resolve_operation(op, params)
    }

    /// Resolve an operation that does not have to live in the store.
    pub fn resolve_operation(
        &self,
        op: &OperationSpec,
        params: Option<&Context>,
    ) -> Result<ResolvedOperation, ResolveError> {
        let merged = apply_template(op, &self.store.templates)?;
        let context = self.build_context(&merged, params)?;
        tracing::debug!(
            operation = %merged.name,
            template = ?merged.template,
            context_keys = context.len(),
            "resolving operation"
        );

        let request = self.substitute_request(&merged.request, &context)?;
        let marshaled = marshal(&request, &self.store.defaults)?;

        let method = required(&merged, request.method.as_deref(), "method")?;
        let location = required(&merged, request.location.as_deref(), "location")?;

        let parser = merged
            .response
            .parser
            .as_deref()
            .map(|reference| self.registry.resolve_parser(reference))
            .transpose()?;
        let generator = request
            .generator
            .as_deref()
            .map(|reference| self.registry.resolve_generator(reference))
            .transpose()?;

        let body = match (marshaled.body, generator, request.generator.as_deref()) {
            (None, Some(generate), Some(reference)) => {
                let payload = generate(&context).map_err(|source| ResolveError::Generator {
                    reference: reference.to_string(),
                    source,
                })?;
                Some(MarshaledBody {
                    content_type: request
                        .content_type
                        .clone()
                        .unwrap_or_else(|| PLAIN_TEXT.to_string()),
                    value: payload,
                })
            }
            (body, _, _) => body,
        };

        tracing::debug!(
            operation = %merged.name,
            %method,
            %location,
            params = marshaled.params.len(),
            has_body = body.is_some(),
            "operation resolved"
        );

        Ok(ResolvedOperation {
            name: merged.name.clone(),
            request: ResolvedRequest {
                method,
                location,
                params: marshaled.params,
                body,
                content_type: request.content_type,
                generator,
            },
            response: ResolvedResponse {
                content_type: merged.response.content_type,
                parser,
            },
        })
    }

    fn build_context(
        &self,
        op: &OperationSpec,
        params: Option<&Context>,
    ) -> Result<Context, ResolveError> {
        let mut context = match &op.context {
            Some(name) => self
                .store
                .contexts
                .get(name)
                .cloned()
                .ok_or_else(|| ResolveError::ContextNotFound { name: name.clone() })?,
            None => Context::new(),
        };
        if let Some(params) = params {
            for (key, value) in params {
                context.insert(key.clone(), value.clone());
            }
        }
        Ok(context)
    }

    fn substitute_request(
        &self,
        request: &RequestSpec,
        context: &Context,
    ) -> Result<RequestSpec, ResolveError> {
        let defaults = &self.store.defaults;
        let options = SubstituteOptions::from(defaults);

        let params =
            substitute_params(&request.params, context, options, defaults.implicit_params)?;
        let body = request
            .body
            .as_ref()
            .map(|body| substitute_with(body, context, options))
            .transpose()?;

        Ok(RequestSpec {
            params,
            body,
            ..request.clone()
        })
    }
}

fn required(
    op: &OperationSpec,
    value: Option<&str>,
    field: &'static str,
) -> Result<String, ResolveError> {
    value
        .map(str::to_string)
        .ok_or_else(|| ResolveError::MissingField {
            operation: op.name.clone(),
            field,
        })
}
