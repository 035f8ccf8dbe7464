//! End-to-end resolution against a hotel reservation API spec.

use httpreverse::{
    apply_template, marshal_body, parse_xml, substitute, CallableErrorKind, CallableRegistry,
    Context, Defaults, ParseError, RequestSpec, ResolveError, Resolver, SpecStore,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn hotel_api() -> SpecStore {
    SpecStore::from_value(json!({
        "templates": {
            "hotel": {
                "request": {
                    "method": "GET",
                    "location": "/api/rooms",
                    "params": { "format": "json", "size": "$size" }
                },
                "response": { "type": "application/json", "parser": "httpreverse.parsers:parse_json" }
            }
        },
        "contexts": {
            "doubles": { "size": "double", "customers": ["John Doe", "Jane Doe"] },
            "suites": { "size": "suite", "customers": ["Mary Major"] }
        },
        "operations": {
            "list-doublerooms": {
                "template": "hotel",
                "context": "doubles",
                "request": { "params": { "size": "$size" } }
            },
            "list-suites": {
                "template": "hotel",
                "context": "suites"
            },
            "add-reservation": {
                "template": "hotel",
                "context": "doubles",
                "request": {
                    "method": "POST",
                    "location": "/api/reservations",
                    "body": { "size": "$size", "customers": "$customers" }
                }
            }
        },
        "defaults": { "structured_body_type": "json", "structured_param_type": "json" }
    }))
    .unwrap()
}

fn ctx(value: Value) -> Context {
    value.as_object().cloned().unwrap()
}

#[test]
fn operation_fields_take_precedence_over_template() {
    let store = hotel_api();
    let registry = CallableRegistry::with_builtins();
    let op = Resolver::new(&store, &registry)
        .resolve("add-reservation", None)
        .unwrap();

    assert_eq!(op.request.method, "POST");
    assert_eq!(op.request.location, "/api/reservations");
    assert_eq!(op.request.params.get("format").map(String::as_str), Some("json"));
}

#[test]
fn operations_sharing_a_template_do_not_contaminate_each_other() {
    let store = hotel_api();
    let template_before = store.templates["hotel"].clone();
    let registry = CallableRegistry::with_builtins();
    let resolver = Resolver::new(&store, &registry);

    let doubles = resolver.resolve("list-doublerooms", None).unwrap();
    let suites = resolver.resolve("list-suites", None).unwrap();
    let doubles_again = resolver.resolve("list-doublerooms", None).unwrap();

    assert_eq!(doubles.request.params["size"], "double");
    assert_eq!(suites.request.params["size"], "suite");
    assert_eq!(doubles_again.request.params, doubles.request.params);
    assert_eq!(store.templates["hotel"], template_before);
    assert_eq!(store.templates["hotel"].request.params["size"], "$size");
}

#[test]
fn template_merge_then_substitution_preserves_body_types() {
    let store = hotel_api();
    let merged = apply_template(&store.operations["add-reservation"], &store.templates).unwrap();
    let context = ctx(json!({ "size": "double", "customers": ["John Doe", "Jane Doe"] }));

    let body = substitute(merged.request.body.as_ref().unwrap(), &context).unwrap();

    assert_eq!(body, Value::Object(context));
}

#[test]
fn whole_value_substitution_keeps_list() {
    let context = ctx(json!({ "customers": ["John Doe", "Jane Doe"] }));
    let body = substitute(&json!("$customers"), &context).unwrap();
    assert_eq!(body, json!(["John Doe", "Jane Doe"]));
}

#[test]
fn embedded_substitution_yields_string() {
    let context = ctx(json!({ "first": "John", "last": "Doe" }));
    let value = substitute(&json!({ "name": "$first $last" }), &context).unwrap();
    assert_eq!(value, json!({ "name": "John Doe" }));
}

#[test]
fn missing_parameter_aborts_resolution() {
    let store = hotel_api();
    let registry = CallableRegistry::with_builtins();
    let mut op = store.operations["list-suites"].clone();
    op.context = None;

    let err = Resolver::new(&store, &registry)
        .resolve_operation(&op, Some(&ctx(json!({ "customers": [] }))))
        .unwrap_err();

    assert!(matches!(err, ResolveError::MissingContextParameter(ref name) if name == "size"));
}

fn typed_body(declared: &str, value: &Value) -> RequestSpec {
    serde_json::from_value(json!({ "body": { "type": declared, "value": value } })).unwrap()
}

#[test]
fn marshaled_body_round_trips_through_json_and_xml() {
    let original = json!({ "root": { "size": "double", "customer": ["John", "Jane"] } });

    let as_json = marshal_body(&typed_body("json", &original), &Defaults::default())
        .unwrap()
        .unwrap();
    let parsed: Value = serde_json::from_str(&as_json.value).unwrap();
    assert_eq!(parsed, original);

    let as_xml = marshal_body(&typed_body("xml", &original), &Defaults::default())
        .unwrap()
        .unwrap();
    assert_eq!(parse_xml(&as_xml.value).unwrap(), original);
}

#[test]
fn unsupported_marshal_type_is_rejected() {
    let request: RequestSpec = serde_json::from_value(json!({
        "body": { "type": "text/plain", "value": { "root": {} } }
    }))
    .unwrap();
    let err = marshal_body(&request, &Defaults::default()).unwrap_err();
    assert!(matches!(err, ResolveError::UnsupportedMarshalType(ref t) if t == "text/plain"));
}

#[test]
fn callable_references_resolve_through_registry() {
    fn parse_upper(text: &str) -> Result<Value, ParseError> {
        Ok(Value::String(text.to_uppercase()))
    }

    let registry =
        CallableRegistry::new().register_parser("mypkg.responses", "parseJson", parse_upper);

    let parser = registry.resolve_parser("mypkg.responses:parseJson").unwrap();
    assert_eq!(parser("ok").unwrap(), json!("OK"));

    match registry.resolve("mypkg.responses:missing").unwrap_err() {
        ResolveError::CallableReference { kind, reference } => {
            assert_eq!(kind, CallableErrorKind::NameNotFound);
            assert_eq!(reference, "mypkg.responses:missing");
        }
        other => panic!("expected callable error, got {other}"),
    }
}

#[test]
fn resolved_body_is_marshaled_with_default_type() {
    let store = hotel_api();
    let registry = CallableRegistry::with_builtins();
    let op = Resolver::new(&store, &registry)
        .resolve("add-reservation", None)
        .unwrap();

    let body = op.request.body.unwrap();
    assert_eq!(body.content_type, "application/json");
    let parsed: Value = serde_json::from_str(&body.value).unwrap();
    assert_eq!(
        parsed,
        json!({ "size": "double", "customers": ["John Doe", "Jane Doe"] })
    );
}

#[test]
fn resolver_is_shareable_across_threads() {
    let store = hotel_api();
    let registry = CallableRegistry::with_builtins();
    let resolver = Resolver::new(&store, &registry);

    std::thread::scope(|scope| {
        let handles: Vec<_> = ["list-doublerooms", "list-suites"]
            .into_iter()
            .map(|name| scope.spawn(move || resolver.resolve(name, None).unwrap()))
            .collect();
        let sizes: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().request.params["size"].clone())
            .collect();
        assert_eq!(sizes, vec!["double".to_string(), "suite".to_string()]);
    });
}
