//! Record classification.
//!
//! Resolution is a single ordered decision table over (payload shape, value
//! class, index), not open dispatch: serialized-record unwrapping first, then
//! the explicit tag table, then shape rules, then the fallback. Adding a rule
//! means adding an arm here.

use crate::element::{Element, ElementError, ElementKind};
use serde_json::Value;

/// Explicit value-class tag -> kind. Tags not in this table fall through to
/// shape classification with the tag preserved on the element.
static CLASS_TAGS: phf::Map<&'static str, ElementKind> = phf::phf_map! {
    "HL" => ElementKind::HintPreload,
    "HC" => ElementKind::HintConfig,
    "I" => ElementKind::Module,
    "T" => ElementKind::Text,
    "E" => ElementKind::Error,
};

/// Classify a decoded payload into a typed element.
///
/// `value_class` is the uppercase tag read from the stream, if any; `index`
/// is the record's position in the outer tree, `None` for nested payloads.
/// An unclassifiable payload is fatal at index 0 and degrades to
/// [`ElementKind::Raw`] with a warning everywhere else.
pub fn resolve(
    value: Value,
    value_class: Option<&str>,
    index: Option<u64>,
) -> Result<Element, ElementError> {
    // A previously serialized element round-trips back through the resolver.
    let value = match value {
        Value::Object(map) if is_serialized_record(&map) => return resolve_serialized(map),
        other => other,
    };

    if let Some(class) = value_class {
        if let Some(&kind) = CLASS_TAGS.get(class) {
            return Element::new(kind, value, Some(class.to_string()), index);
        }
    }

    let kind = match classify_shape(&value, index) {
        Some(kind) => kind,
        None => {
            if index == Some(0) {
                return Err(ElementError::MissingRootType);
            }
            tracing::warn!(
                ?index,
                value_class,
                "unclassifiable flight record, falling back to raw element"
            );
            ElementKind::Raw
        }
    };
    Element::new(kind, value, value_class.map(str::to_string), index)
}

/// Force a specific variant by name, bypassing tag and shape classification.
/// Used when rebuilding a previously dumped tree. The payload is still
/// validated against the variant's shape contract.
pub fn resolve_as(
    name: &str,
    value: Value,
    value_class: Option<&str>,
    index: Option<u64>,
) -> Result<Element, ElementError> {
    let kind = ElementKind::from_name(name)?;
    Element::new(kind, value, value_class.map(str::to_string), index)
}

/// Shape-based classification. Rule order matters: flight 4-tuples split
/// before the generic sequence rule, and the index-0 mapping rule applies
/// only to the root record. Returns `None` for payloads that match no rule.
fn classify_shape(value: &Value, index: Option<u64>) -> Option<ElementKind> {
    match value {
        Value::Array(items) => {
            if let Some(reference) = flight_object(items) {
                if reference.starts_with('$') {
                    // Split data-family objects by the fourth slot.
                    return Some(match &items[3] {
                        Value::Object(map) if map.contains_key("buildId") => {
                            ElementKind::RscPayload
                        }
                        Value::Object(map) if map.len() == 1 && map.contains_key("children") => {
                            ElementKind::DataParent
                        }
                        _ => ElementKind::Data,
                    });
                }
                return Some(ElementKind::HtmlElement);
            }
            if items.len() == 3
                && items.iter().all(Value::is_string)
                && items[2].as_str() == Some("d")
            {
                return Some(ElementKind::UrlQuery);
            }
            Some(ElementKind::DataContainer)
        }
        Value::Null => Some(ElementKind::EmptyData),
        Value::Object(_) if index == Some(0) => Some(ElementKind::RscPayload),
        Value::String(s) if s.starts_with('$') => Some(ElementKind::SpecialData),
        _ => None,
    }
}

/// A flight object is a 4-tuple `["$", string, string-or-null, _]`; returns
/// the second slot (the tag or `$`-reference) when the frame matches.
fn flight_object(items: &[Value]) -> Option<&str> {
    if items.len() != 4 {
        return None;
    }
    if items[0].as_str() != Some("$") {
        return None;
    }
    if !(items[2].is_string() || items[2].is_null()) {
        return None;
    }
    items[1].as_str()
}

/// Mapping carrying exactly the canonical serialized-element fields.
fn is_serialized_record(map: &serde_json::Map<String, Value>) -> bool {
    let canonical = ["value", "value_class", "index"];
    if !canonical.iter().all(|key| map.contains_key(*key)) {
        return false;
    }
    let expected = 3 + usize::from(map.contains_key("variant_name"));
    map.len() == expected
}

fn resolve_serialized(mut map: serde_json::Map<String, Value>) -> Result<Element, ElementError> {
    let inner = map.remove("value").unwrap_or(Value::Null);
    let class = map
        .remove("value_class")
        .and_then(|v| v.as_str().map(str::to_string));
    let index = map.remove("index").and_then(|v| v.as_u64());
    let variant = map
        .remove("variant_name")
        .and_then(|v| v.as_str().map(str::to_string));
    match variant {
        Some(name) => resolve_as(&name, inner, class.as_deref(), index),
        None => resolve(inner, class.as_deref(), index),
    }
}
