//! `module:name` references → bound functions
//!
//! Response parsers and request generators are registered up front in a
//! [`CallableRegistry`]; specs refer to them by string and the resolver
//! swaps the string for the function pointer.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;

use crate::error::{CallableErrorKind, ParseError, ResolveError};
use crate::spec::Context;
use crate::xml::from_xml;

/// Module path of the parsers registered by [`CallableRegistry::with_builtins`].
pub const BUILTIN_PARSERS: &str = "httpreverse.parsers";

/// Turns a raw response body into a structured value.
pub type ResponseParser = fn(&str) -> Result<Value, ParseError>;

/// Renders a wire-ready request payload from the resolution context.
pub type RequestGenerator = fn(&Context) -> Result<String, ParseError>;

/// A registered function.
#[derive(Clone, Copy)]
pub enum Callable {
    Parser(ResponseParser),
    Generator(RequestGenerator),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parser(_) => f.write_str("Callable::Parser"),
            Self::Generator(_) => f.write_str("Callable::Generator"),
        }
    }
}

/// A parsed `module:name` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallableRef<'a> {
    pub module: &'a str,
    pub name: &'a str,
}

impl<'a> CallableRef<'a> {
    pub fn parse(reference: &'a str) -> Result<Self, ResolveError> {
        match reference.split_once(':') {
            Some((module, name)) if !module.trim().is_empty() && !name.trim().is_empty() => {
                Ok(Self {
                    module: module.trim(),
                    name: name.trim(),
                })
            }
            _ => Err(ResolveError::callable(CallableErrorKind::BadFormat, reference)),
        }
    }
}

/// Static lookup table from module path and export name to function.
#[derive(Debug, Clone, Default)]
pub struct CallableRegistry {
    modules: HashMap<String, BTreeMap<String, Callable>>,
}

impl CallableRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `httpreverse.parsers:parse_json` and
    /// `httpreverse.parsers:parse_xml`.
    pub fn with_builtins() -> Self {
        Self::new()
            .register_parser(BUILTIN_PARSERS, "parse_json", parse_json)
            .register_parser(BUILTIN_PARSERS, "parse_xml", parse_xml)
    }

    pub fn register_parser(
        self,
        module: impl Into<String>,
        name: impl Into<String>,
        parser: ResponseParser,
    ) -> Self {
        self.register(module, name, Callable::Parser(parser))
    }

    pub fn register_generator(
        self,
        module: impl Into<String>,
        name: impl Into<String>,
        generator: RequestGenerator,
    ) -> Self {
        self.register(module, name, Callable::Generator(generator))
    }

    /// Register a callable, replacing any previous one under the same name.
    pub fn register(
        mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        callable: Callable,
    ) -> Self {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(name.into(), callable);
        self
    }

    /// Look up a `module:name` reference.
    pub fn resolve(&self, reference: &str) -> Result<Callable, ResolveError> {
        let parsed = CallableRef::parse(reference)?;
        let module = self
            .modules
            .get(parsed.module)
            .ok_or_else(|| ResolveError::callable(CallableErrorKind::ModuleNotFound, reference))?;
        module
            .get(parsed.name)
            .copied()
            .ok_or_else(|| ResolveError::callable(CallableErrorKind::NameNotFound, reference))
    }

    pub fn resolve_parser(&self, reference: &str) -> Result<ResponseParser, ResolveError> {
        match self.resolve(reference)? {
            Callable::Parser(parser) => Ok(parser),
            Callable::Generator(_) => Err(ResolveError::callable(
                CallableErrorKind::KindMismatch,
                reference,
            )),
        }
    }

    pub fn resolve_generator(&self, reference: &str) -> Result<RequestGenerator, ResolveError> {
        match self.resolve(reference)? {
            Callable::Generator(generator) => Ok(generator),
            Callable::Parser(_) => Err(ResolveError::callable(
                CallableErrorKind::KindMismatch,
                reference,
            )),
        }
    }
}

/// Parse a JSON response body.
pub fn parse_json(response: &str) -> Result<Value, ParseError> {
    serde_json::from_str(response).map_err(ParseError::Json)
}

/// Parse an XML response body into a single-root mapping.
pub fn parse_xml(response: &str) -> Result<Value, ParseError> {
    from_xml(response)
}
