//! Declarative operation specs for undocumented and legacy HTTP APIs.
//!
//! An API is described as named operations, reusable templates, named
//! contexts and defaults. Resolving an operation merges its template,
//! substitutes `$placeholders` from a context, marshals params and body to
//! JSON or XML, and binds the response parser / request generator named by
//! `module:name` references.
//!
//! # Usage
//!
//! ```no_run
//! use httpreverse::{dispatch, CallableRegistry, Resolver, SpecStore};
//! use reqwest::blocking::Client;
//! use serde_json::json;
//!
//! let store = SpecStore::from_value(json!({
//!     "operations": {
//!         "list-rooms": {
//!             "request": { "method": "GET", "location": "/rooms", "params": { "size": "$size" } },
//!             "response": { "parser": "httpreverse.parsers:parse_json" },
//!             "context": "rooms"
//!         }
//!     },
//!     "contexts": { "rooms": { "size": "double" } }
//! }))
//! .unwrap();
//!
//! let registry = CallableRegistry::with_builtins();
//! let op = Resolver::new(&store, &registry).resolve("list-rooms", None).unwrap();
//!
//! let rooms = dispatch(&Client::new(), "http://localhost:8080", None, &op).unwrap();
//! ```

pub mod callable;
pub mod dispatch;
pub mod error;
pub mod marshal;
pub mod resolve;
pub mod spec;
pub mod substitute;
pub mod template;
pub mod xml;

pub use callable::{
    parse_json, parse_xml, Callable, CallableRef, CallableRegistry, RequestGenerator,
    ResponseParser,
};
pub use dispatch::{build_request, dispatch, Credentials};
pub use error::{CallableErrorKind, DispatchError, ParseError, ResolveError};
pub use marshal::{marshal, marshal_body, marshal_params, MarshalType, MarshaledBody};
pub use resolve::{ResolvedOperation, ResolvedRequest, ResolvedResponse, Resolver};
pub use spec::{
    Context, Defaults, OperationSpec, RequestSpec, ResponseSpec, SpecStore, TemplateSpec,
    TypedValue,
};
pub use substitute::{substitute, substitute_with, SubstituteOptions};
pub use template::apply_template;

// Re-export dependencies for downstream crates
pub use reqwest;
pub use serde_json;
