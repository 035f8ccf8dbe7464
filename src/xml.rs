//! Value ⇄ XML text
//!
//! A mapping with a single key is a document whose root tag is that key.
//! Nested mappings become child elements, lists repeat the enclosing tag,
//! `@name` keys are attributes and `#text` is the element text. Tag and
//! attribute names must be valid XML names.
//!
//! Parsing returns all text as strings, and the round trip is lossy in a
//! few shapes: a one-element list comes back as its single item, an empty
//! list disappears, and an empty string comes back as `null`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::error::{ParseError, ResolveError};
use crate::substitute::string_form;

/// Serialize a single-root mapping as an XML document.
pub fn to_xml(value: &Value) -> Result<String, ResolveError> {
    let (root, content) = match value.as_object() {
        Some(obj) if obj.len() == 1 => obj.iter().next().ok_or(ResolveError::XmlRoot)?,
        _ => return Err(ResolveError::XmlRoot),
    };
    if content.is_array() {
        return Err(ResolveError::XmlRoot);
    }

    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| write_error(root, e))?;
    write_element(&mut writer, root, content)?;

    String::from_utf8(writer.into_inner()).map_err(|e| write_error(root, e))
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    value: &Value,
) -> Result<(), ResolveError> {
    check_name(tag, tag)?;
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, tag, item)?;
            }
            Ok(())
        }
        Value::Null => emit(writer, tag, Event::Empty(BytesStart::new(tag))),
        Value::Object(map) => {
            let mut start = BytesStart::new(tag);
            let mut text = None;
            let mut children = Vec::new();
            for (key, item) in map {
                if let Some(attr) = key.strip_prefix('@') {
                    check_name(tag, attr)?;
                    start.push_attribute((attr, string_form(item).as_str()));
                } else if key == "#text" {
                    text = Some(string_form(item));
                } else {
                    children.push((key, item));
                }
            }

            if text.is_none() && children.is_empty() {
                return emit(writer, tag, Event::Empty(start));
            }
            emit(writer, tag, Event::Start(start))?;
            if let Some(text) = text {
                emit(writer, tag, Event::Text(BytesText::new(&text)))?;
            }
            for (key, item) in children {
                write_element(writer, key, item)?;
            }
            emit(writer, tag, Event::End(BytesEnd::new(tag)))
        }
        scalar => {
            let text = string_form(scalar);
            emit(writer, tag, Event::Start(BytesStart::new(tag)))?;
            emit(writer, tag, Event::Text(BytesText::new(&text)))?;
            emit(writer, tag, Event::End(BytesEnd::new(tag)))
        }
    }
}

// XML `Name` production, restricted to letters and digits for the
// non-ASCII ranges.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':');
    first_ok && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

fn check_name(tag: &str, name: &str) -> Result<(), ResolveError> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(write_error(tag, format!("invalid XML name {name:?}")))
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, tag: &str, event: Event<'_>) -> Result<(), ResolveError> {
    writer.write_event(event).map_err(|e| write_error(tag, e))
}

fn write_error(tag: &str, err: impl std::fmt::Display) -> ResolveError {
    ResolveError::Marshal {
        field: tag.to_string(),
        message: err.to_string(),
    }
}

struct Frame {
    tag: String,
    fields: Map<String, Value>,
    text: String,
}

/// Parse an XML document into a single-key mapping, inverse of [`to_xml`].
///
/// Text content is always returned as strings; repeated child tags are
/// collected into a list.
pub fn from_xml(text: &str) -> Result<Value, ParseError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event().map_err(read_error)? {
            Event::Start(e) => stack.push(open_frame(&e)?),
            Event::Empty(e) => {
                let frame = open_frame(&e)?;
                close_frame(frame, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&t.unescape().map_err(read_error)?);
                }
            }
            Event::CData(c) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ParseError::Xml("unexpected closing tag".to_string()))?;
                close_frame(frame, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(frame) = stack.last() {
        return Err(ParseError::Xml(format!("unclosed element <{}>", frame.tag)));
    }
    let (tag, value) = root.ok_or_else(|| ParseError::Xml("no root element".to_string()))?;
    let mut doc = Map::new();
    doc.insert(tag, value);
    Ok(Value::Object(doc))
}

fn open_frame(start: &BytesStart<'_>) -> Result<Frame, ParseError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut fields = Map::new();
    for attr in start.attributes() {
        let attr = attr.map_err(read_error)?;
        let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
        let value = attr.unescape_value().map_err(read_error)?.into_owned();
        fields.insert(key, Value::String(value));
    }
    Ok(Frame {
        tag,
        fields,
        text: String::new(),
    })
}

fn close_frame(
    frame: Frame,
    stack: &mut [Frame],
    root: &mut Option<(String, Value)>,
) -> Result<(), ParseError> {
    let Frame {
        tag,
        mut fields,
        text,
    } = frame;

    let value = if fields.is_empty() {
        if text.is_empty() {
            Value::Null
        } else {
            Value::String(text)
        }
    } else {
        if !text.is_empty() {
            fields.insert("#text".to_string(), Value::String(text));
        }
        Value::Object(fields)
    };

    match stack.last_mut() {
        Some(parent) => {
            insert_child(&mut parent.fields, tag, value);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some((tag, value));
            Ok(())
        }
        None => Err(ParseError::Xml("multiple root elements".to_string())),
    }
}

fn insert_child(fields: &mut Map<String, Value>, tag: String, value: Value) {
    match fields.get_mut(&tag) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(tag, value);
        }
    }
}

fn read_error(err: impl std::fmt::Display) -> ParseError {
    ParseError::Xml(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_xml_uses_single_key_as_root() {
        let xml = to_xml(&json!({ "room": { "size": "double" } })).unwrap();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="utf-8"?><room><size>double</size></room>"#
        );
    }

    #[test]
    fn to_xml_repeats_tag_for_lists() {
        let xml = to_xml(&json!({ "root": { "customer": ["John", "Jane"] } })).unwrap();
        assert!(xml.ends_with("<root><customer>John</customer><customer>Jane</customer></root>"));
    }

    #[test]
    fn to_xml_writes_attributes_text_and_empty_elements() {
        let xml = to_xml(&json!({
            "room": { "@id": 7, "#text": "suite", "note": null }
        }))
        .unwrap();
        assert!(xml.ends_with(r#"<room id="7">suite<note/></room>"#), "got: {xml}");
    }

    #[test]
    fn to_xml_escapes_text() {
        let xml = to_xml(&json!({ "q": "a < b & c" })).unwrap();
        assert!(xml.ends_with("<q>a &lt; b &amp; c</q>"), "got: {xml}");
    }

    #[test]
    fn to_xml_rejects_documents_without_single_root() {
        for value in [
            json!({ "a": 1, "b": 2 }),
            json!({}),
            json!(["a"]),
            json!("text"),
            json!({ "a": [1, 2] }),
        ] {
            assert!(matches!(to_xml(&value), Err(ResolveError::XmlRoot)));
        }
    }

    #[test]
    fn to_xml_rejects_invalid_element_names() {
        for key in ["first name", "1st", "", "a<b"] {
            let mut inner = Map::new();
            inner.insert(key.to_string(), json!("x"));
            let value = json!({ "root": Value::Object(inner) });
            match to_xml(&value) {
                Err(ResolveError::Marshal { field, message }) => {
                    assert_eq!(field, key);
                    assert!(message.contains("invalid XML name"), "got: {message}");
                }
                other => panic!("expected marshal error for {key:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn to_xml_rejects_invalid_root_and_attribute_names() {
        let err = to_xml(&json!({ "bad root": "x" })).unwrap_err();
        assert!(matches!(err, ResolveError::Marshal { ref field, .. } if field == "bad root"));

        let err = to_xml(&json!({ "room": { "@data id": 1 } })).unwrap_err();
        assert!(matches!(err, ResolveError::Marshal { ref field, .. } if field == "room"));
    }

    #[test]
    fn to_xml_accepts_names_with_dots_dashes_and_prefixes() {
        let value = json!({ "soap:Envelope": { "x-id": "1", "a.b": "2", "@xmlns:soap": "urn:x" } });
        let xml = to_xml(&value).unwrap();
        assert_eq!(from_xml(&xml).unwrap(), value);
    }

    #[test]
    fn round_trip_flattens_short_lists_and_empty_strings() {
        let original = json!({ "root": { "one": ["only"], "none": [], "empty": "" } });
        let parsed = from_xml(&to_xml(&original).unwrap()).unwrap();
        assert_eq!(parsed, json!({ "root": { "one": "only", "empty": null } }));
    }

    #[test]
    fn from_xml_collects_repeated_tags() {
        let value = from_xml("<root><c>1</c><c>2</c><c>3</c><d/></root>").unwrap();
        assert_eq!(value, json!({ "root": { "c": ["1", "2", "3"], "d": null } }));
    }

    #[test]
    fn from_xml_reads_attributes_and_text() {
        let value = from_xml(r#"<?xml version="1.0"?><room id="7">suite</room>"#).unwrap();
        assert_eq!(value, json!({ "room": { "@id": "7", "#text": "suite" } }));
    }

    #[test]
    fn from_xml_round_trips_to_xml_output() {
        let original = json!({ "root": { "size": "double", "customer": ["John", "Jane"] } });
        let parsed = from_xml(&to_xml(&original).unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn from_xml_rejects_malformed_documents() {
        assert!(from_xml("<a><b></a>").is_err());
        assert!(from_xml("<a>").is_err());
        assert!(from_xml("").is_err());
        assert!(from_xml("<a/><b/>").is_err());
    }
}
