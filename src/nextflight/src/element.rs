//! Typed flight-data elements.
//!
//! Every decoded record resolves to an [`Element`]: the raw JSON payload plus
//! the classification assigned by the resolver. Elements are immutable once
//! constructed; construction validates the payload against the variant's
//! shape contract and fails fast on mismatch. Composite variants
//! ([`ElementKind::DataContainer`], [`ElementKind::DataParent`]) own their
//! resolved children by value.

use crate::resolve;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors from element construction and variant lookup.
#[derive(Debug, Error)]
pub enum ElementError {
    /// The payload does not satisfy the variant's shape contract.
    #[error("{kind} payload has the wrong shape: {detail}")]
    Shape { kind: ElementKind, detail: String },

    /// A forced or filtered variant name is not in the variant table.
    #[error("unknown element variant: {0}")]
    UnknownVariant(String),

    /// The mandatory index-0 payload could not be classified.
    #[error("root record (index 0) could not be classified")]
    MissingRootType,
}

/// Classification of a decoded record.
///
/// The set is closed: classification is an ordered decision table over
/// (value class, shape, index), not open dispatch. `Raw` is the untyped
/// fallback for non-root payloads that match no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    HintPreload,
    HintConfig,
    Module,
    Text,
    Data,
    EmptyData,
    SpecialData,
    HtmlElement,
    DataContainer,
    DataParent,
    UrlQuery,
    RscPayload,
    Error,
    Raw,
}

/// Variant name -> kind, used by forced deserialization and query filters.
static KIND_NAMES: phf::Map<&'static str, ElementKind> = phf::phf_map! {
    "HintPreload" => ElementKind::HintPreload,
    "HintConfig" => ElementKind::HintConfig,
    "Module" => ElementKind::Module,
    "Text" => ElementKind::Text,
    "Data" => ElementKind::Data,
    "EmptyData" => ElementKind::EmptyData,
    "SpecialData" => ElementKind::SpecialData,
    "HTMLElement" => ElementKind::HtmlElement,
    "DataContainer" => ElementKind::DataContainer,
    "DataParent" => ElementKind::DataParent,
    "URLQuery" => ElementKind::UrlQuery,
    "RSCPayload" => ElementKind::RscPayload,
    "Error" => ElementKind::Error,
    "Raw" => ElementKind::Raw,
};

impl ElementKind {
    /// Canonical variant name, as used in serialized records and filters.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HintPreload => "HintPreload",
            Self::HintConfig => "HintConfig",
            Self::Module => "Module",
            Self::Text => "Text",
            Self::Data => "Data",
            Self::EmptyData => "EmptyData",
            Self::SpecialData => "SpecialData",
            Self::HtmlElement => "HTMLElement",
            Self::DataContainer => "DataContainer",
            Self::DataParent => "DataParent",
            Self::UrlQuery => "URLQuery",
            Self::RscPayload => "RSCPayload",
            Self::Error => "Error",
            Self::Raw => "Raw",
        }
    }

    /// Look up a kind by its canonical name.
    pub fn from_name(name: &str) -> Result<Self, ElementError> {
        KIND_NAMES
            .get(name)
            .copied()
            .ok_or_else(|| ElementError::UnknownVariant(name.to_string()))
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = ElementError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Wire generation of an RSC payload record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RscVersion {
    /// Legacy flight 4-tuple carrying `content["buildId"]`.
    Old,
    /// Current mapping form carrying the `"b"` key.
    New,
}

/// Owned children of a composite element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Children {
    None,
    /// DataContainer: one resolved element per raw sub-value, in order.
    Items(Vec<Element>),
    /// DataParent: the resolved `children` payload.
    Child(Box<Element>),
}

/// One decoded flight record.
///
/// Carries the raw JSON payload, the optional value-class tag from the
/// stream (`None` when classification was shape-based), the record's index
/// in the outer tree (`None` for nested payloads), and the resolved kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    value: Value,
    value_class: Option<String>,
    index: Option<u64>,
    kind: ElementKind,
    children: Children,
}

/// Flat serialized form of an [`Element`].
///
/// Round-trips through the resolver: feeding a record back through
/// [`Element::from_record`] reconstructs an equivalent element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub value: Value,
    pub value_class: Option<String>,
    pub index: Option<u64>,
    #[serde(
        default,
        rename = "variant_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub variant: Option<String>,
}

fn shape(kind: ElementKind, detail: impl Into<String>) -> ElementError {
    ElementError::Shape {
        kind,
        detail: detail.into(),
    }
}

impl Element {
    /// Construct an element of the given kind, validating the payload
    /// against the kind's shape contract. Composite kinds resolve their
    /// children here; a child that violates its own contract fails the
    /// whole construction.
    pub fn new(
        kind: ElementKind,
        value: Value,
        value_class: Option<String>,
        index: Option<u64>,
    ) -> Result<Self, ElementError> {
        validate(kind, &value)?;
        let children = build_children(kind, &value)?;
        Ok(Self {
            value,
            value_class,
            index,
            kind,
            children,
        })
    }

    /// The raw decoded payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The value-class tag carried from the stream, if any.
    pub fn value_class(&self) -> Option<&str> {
        self.value_class.as_deref()
    }

    /// The record's index in the outer tree; `None` for nested payloads.
    pub fn index(&self) -> Option<u64> {
        self.index
    }

    /// The resolved classification.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    // HintPreload / HTMLElement accessors

    /// Preload href (HintPreload) or element href (HTMLElement).
    pub fn href(&self) -> Option<&str> {
        match self.kind {
            ElementKind::HintPreload => self.value.get(0)?.as_str(),
            ElementKind::HtmlElement => self.value.get(2)?.as_str(),
            _ => None,
        }
    }

    /// Preload resource type, e.g. `"style"` or `"font"`.
    pub fn type_name(&self) -> Option<&str> {
        match self.kind {
            ElementKind::HintPreload => self.value.get(1)?.as_str(),
            _ => None,
        }
    }

    /// Attribute mapping of a HintPreload or HTMLElement payload.
    pub fn attrs(&self) -> Option<&Map<String, Value>> {
        match self.kind {
            ElementKind::HintPreload => self.value.get(2)?.as_object(),
            ElementKind::HtmlElement => self.value.get(3)?.as_object(),
            _ => None,
        }
    }

    /// HTML tag name of an HTMLElement payload.
    pub fn tag(&self) -> Option<&str> {
        match self.kind {
            ElementKind::HtmlElement => self.value.get(1)?.as_str(),
            _ => None,
        }
    }

    // HintConfig accessors

    /// Config target URL.
    pub fn url(&self) -> Option<&str> {
        match self.kind {
            ElementKind::HintConfig => self.value.get(0)?.as_str(),
            _ => None,
        }
    }

    /// Raw config string.
    pub fn config_string(&self) -> Option<&str> {
        match self.kind {
            ElementKind::HintConfig => self.value.get(1)?.as_str(),
            _ => None,
        }
    }

    // Module accessors; both the tuple and the mapping form are supported.

    fn module_field(&self, pos: usize, key: &str) -> Option<&Value> {
        if self.kind != ElementKind::Module {
            return None;
        }
        match &self.value {
            Value::Array(items) => items.get(pos),
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Numeric module id.
    pub fn module_id(&self) -> Option<i64> {
        self.module_field(0, "id")?.as_i64()
    }

    /// Chunk-name -> path mapping. The tuple form stores chunks as a flat
    /// alternating [name, path, ...] sequence; pairs are zipped here.
    pub fn module_chunks(&self) -> Option<BTreeMap<String, String>> {
        let chunks = self.module_field(1, "chunks")?;
        match chunks {
            Value::Object(map) => Some(
                map.iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect(),
            ),
            Value::Array(items) => {
                let mut out = BTreeMap::new();
                let mut it = items.iter();
                while let (Some(name), Some(path)) = (it.next(), it.next()) {
                    out.insert(name.as_str()?.to_string(), path.as_str()?.to_string());
                }
                Some(out)
            }
            _ => None,
        }
    }

    /// Exported module name, e.g. `"default"`.
    pub fn module_name(&self) -> Option<&str> {
        self.module_field(2, "name")?.as_str()
    }

    /// Whether the module is flagged async. Absent means false.
    pub fn is_async(&self) -> bool {
        self.module_field(3, "async")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    // Text / Data accessors

    /// Literal text of a Text record.
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            ElementKind::Text => self.value.as_str(),
            _ => None,
        }
    }

    /// Fourth slot of a Data payload; `None` when the slot is null.
    pub fn content(&self) -> Option<&Value> {
        match self.kind {
            ElementKind::Data => match self.value.get(3) {
                Some(Value::Null) | None => None,
                other => other,
            },
            _ => None,
        }
    }

    // Composite accessors

    /// Resolved children of a DataContainer, in payload order.
    pub fn elements(&self) -> Option<&[Element]> {
        match &self.children {
            Children::Items(items) => Some(items),
            _ => None,
        }
    }

    /// Resolved `children` payload of a DataParent.
    pub fn children(&self) -> Option<&Element> {
        match &self.children {
            Children::Child(child) => Some(child),
            _ => None,
        }
    }

    // URLQuery accessors

    /// Query parameter key.
    pub fn key(&self) -> Option<&str> {
        match self.kind {
            ElementKind::UrlQuery => self.value.get(0)?.as_str(),
            _ => None,
        }
    }

    /// Query parameter value.
    pub fn val(&self) -> Option<&str> {
        match self.kind {
            ElementKind::UrlQuery => self.value.get(1)?.as_str(),
            _ => None,
        }
    }

    // RSCPayload accessors

    /// Which wire generation this RSC payload uses.
    pub fn version(&self) -> Option<RscVersion> {
        if self.kind != ElementKind::RscPayload {
            return None;
        }
        match &self.value {
            Value::Array(_) => Some(RscVersion::Old),
            Value::Object(_) => Some(RscVersion::New),
            _ => None,
        }
    }

    /// The deployment build id carried by an RSC payload.
    pub fn build_id(&self) -> Option<&str> {
        match self.version()? {
            RscVersion::Old => self.value.get(3)?.get("buildId")?.as_str(),
            RscVersion::New => self.value.get("b")?.as_str(),
        }
    }

    // Error accessors

    /// Server error digest.
    pub fn digest(&self) -> Option<&str> {
        match self.kind {
            ElementKind::Error => self.value.get("digest")?.as_str(),
            _ => None,
        }
    }

    /// Serialize to the flat record form.
    pub fn to_record(&self) -> ElementRecord {
        ElementRecord {
            value: self.value.clone(),
            value_class: self.value_class.clone(),
            index: self.index,
            variant: Some(self.kind.name().to_string()),
        }
    }

    /// Rebuild an element from a flat record. A `variant` tag forces that
    /// kind; without one the record goes through normal classification.
    pub fn from_record(record: ElementRecord) -> Result<Self, ElementError> {
        match record.variant {
            Some(name) => resolve::resolve_as(
                &name,
                record.value,
                record.value_class.as_deref(),
                record.index,
            ),
            None => resolve::resolve(record.value, record.value_class.as_deref(), record.index),
        }
    }
}

fn is_string_or_null(value: &Value) -> bool {
    value.is_string() || value.is_null()
}

/// Check a payload against a kind's shape contract.
fn validate(kind: ElementKind, value: &Value) -> Result<(), ElementError> {
    match kind {
        ElementKind::HintPreload => {
            let items = value
                .as_array()
                .ok_or_else(|| shape(kind, "expected a sequence"))?;
            if !(2..=3).contains(&items.len()) {
                return Err(shape(kind, format!("expected 2-3 entries, got {}", items.len())));
            }
            if !items[0].is_string() || !items[1].is_string() {
                return Err(shape(kind, "href and type must be strings"));
            }
            if let Some(attrs) = items.get(2) {
                if !attrs.is_object() {
                    return Err(shape(kind, "attrs must be a mapping"));
                }
            }
        }
        ElementKind::HintConfig => {
            let items = value
                .as_array()
                .ok_or_else(|| shape(kind, "expected a sequence"))?;
            if items.len() != 2 || !items[0].is_string() || !items[1].is_string() {
                return Err(shape(kind, "expected [url, config] strings"));
            }
        }
        ElementKind::Module => validate_module(value)?,
        ElementKind::Text => {
            if !value.is_string() {
                return Err(shape(kind, "expected a string"));
            }
        }
        ElementKind::Data => {
            let items = flight_tuple(kind, value)?;
            match &items[3] {
                Value::Null | Value::Object(_) => {}
                _ => return Err(shape(kind, "content must be a mapping or null")),
            }
        }
        ElementKind::EmptyData => {
            if !value.is_null() {
                return Err(shape(kind, "expected null"));
            }
        }
        ElementKind::SpecialData => {
            let s = value
                .as_str()
                .ok_or_else(|| shape(kind, "expected a string"))?;
            if !s.starts_with('$') {
                return Err(shape(kind, "expected a $-prefixed string"));
            }
        }
        ElementKind::HtmlElement => {
            let items = flight_tuple(kind, value)?;
            if !items[3].is_object() {
                return Err(shape(kind, "attrs must be a mapping"));
            }
        }
        ElementKind::DataContainer => {
            if !value.is_array() {
                return Err(shape(kind, "expected a sequence"));
            }
        }
        ElementKind::DataParent => {
            let items = flight_tuple(kind, value)?;
            let map = items[3]
                .as_object()
                .ok_or_else(|| shape(kind, "fourth slot must be a mapping"))?;
            if map.len() != 1 || !map.contains_key("children") {
                return Err(shape(kind, "fourth slot must hold exactly the children key"));
            }
        }
        ElementKind::UrlQuery => {
            let items = value
                .as_array()
                .ok_or_else(|| shape(kind, "expected a sequence"))?;
            if items.len() != 3 || !items.iter().all(Value::is_string) {
                return Err(shape(kind, "expected three strings"));
            }
            if items[2].as_str() != Some("d") {
                return Err(shape(kind, "third entry must be \"d\""));
            }
        }
        ElementKind::RscPayload => match value {
            Value::Object(map) => {
                if !map.get("b").is_some_and(Value::is_string) {
                    return Err(shape(kind, "mapping form requires a string \"b\" key"));
                }
            }
            Value::Array(_) => {
                let items = flight_tuple(kind, value)?;
                let content = items[3]
                    .as_object()
                    .ok_or_else(|| shape(kind, "legacy content must be a mapping"))?;
                if !content.get("buildId").is_some_and(Value::is_string) {
                    return Err(shape(kind, "legacy content requires a string buildId"));
                }
            }
            _ => return Err(shape(kind, "expected a mapping or a legacy 4-tuple")),
        },
        ElementKind::Error => {
            let map = value
                .as_object()
                .ok_or_else(|| shape(kind, "expected a mapping"))?;
            if !map.contains_key("digest") {
                return Err(shape(kind, "expected a digest key"));
            }
        }
        ElementKind::Raw => {}
    }
    Ok(())
}

/// Common flight 4-tuple frame: `["$", string, string-or-null, _]`.
fn flight_tuple(kind: ElementKind, value: &Value) -> Result<&Vec<Value>, ElementError> {
    let items = value
        .as_array()
        .ok_or_else(|| shape(kind, "expected a sequence"))?;
    if items.len() != 4 {
        return Err(shape(kind, format!("expected 4 entries, got {}", items.len())));
    }
    if items[0].as_str() != Some("$") {
        return Err(shape(kind, "first entry must be \"$\""));
    }
    if !items[1].is_string() {
        return Err(shape(kind, "second entry must be a string"));
    }
    if !is_string_or_null(&items[2]) {
        return Err(shape(kind, "third entry must be a string or null"));
    }
    Ok(items)
}

fn validate_module(value: &Value) -> Result<(), ElementError> {
    let kind = ElementKind::Module;
    match value {
        Value::Array(items) => {
            if !(3..=4).contains(&items.len()) {
                return Err(shape(kind, format!("expected 3-4 entries, got {}", items.len())));
            }
            if items[0].as_i64().is_none() {
                return Err(shape(kind, "module id must be an integer"));
            }
            if !items[1].is_object() && !items[1].is_array() {
                return Err(shape(kind, "chunks must be a mapping or sequence"));
            }
            if !items[2].is_string() {
                return Err(shape(kind, "module name must be a string"));
            }
            if let Some(flag) = items.get(3) {
                if !flag.is_boolean() {
                    return Err(shape(kind, "async flag must be a boolean"));
                }
            }
        }
        Value::Object(map) => {
            if !map.get("id").is_some_and(|v| v.as_i64().is_some()) {
                return Err(shape(kind, "mapping form requires an integer id"));
            }
            if let Some(chunks) = map.get("chunks") {
                if !chunks.is_object() && !chunks.is_array() {
                    return Err(shape(kind, "chunks must be a mapping or sequence"));
                }
            }
            if let Some(name) = map.get("name") {
                if !name.is_string() {
                    return Err(shape(kind, "module name must be a string"));
                }
            }
            if let Some(flag) = map.get("async") {
                if !flag.is_boolean() {
                    return Err(shape(kind, "async flag must be a boolean"));
                }
            }
        }
        _ => return Err(shape(kind, "expected a sequence or mapping")),
    }
    Ok(())
}

/// Resolve owned children for composite kinds.
fn build_children(kind: ElementKind, value: &Value) -> Result<Children, ElementError> {
    match kind {
        ElementKind::DataContainer => {
            let items = value.as_array().expect("validated as a sequence");
            let resolved = items
                .iter()
                .map(|item| resolve::resolve(item.clone(), None, None))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Children::Items(resolved))
        }
        ElementKind::DataParent => {
            // Present and non-null per the shape contract checked above.
            let child_value = value
                .get(3)
                .and_then(|slot| slot.get("children"))
                .cloned()
                .unwrap_or(Value::Null);
            let child = resolve::resolve(child_value, None, None)?;
            Ok(Children::Child(Box::new(child)))
        }
        _ => Ok(Children::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_name_roundtrip() {
        for name in ["HintPreload", "HTMLElement", "URLQuery", "RSCPayload", "Raw"] {
            let kind = ElementKind::from_name(name).unwrap();
            assert_eq!(kind.name(), name);
        }
    }

    #[test]
    fn test_unknown_kind_name() {
        let err = ElementKind::from_name("Bogus").unwrap_err();
        assert!(matches!(err, ElementError::UnknownVariant(name) if name == "Bogus"));
    }

    #[test]
    fn test_hint_preload_accessors() {
        let e = Element::new(
            ElementKind::HintPreload,
            json!(["/a.css", "style"]),
            Some("HL".to_string()),
            Some(0),
        )
        .unwrap();
        assert_eq!(e.href(), Some("/a.css"));
        assert_eq!(e.type_name(), Some("style"));
        assert!(e.attrs().is_none());
    }

    #[test]
    fn test_hint_preload_with_attrs() {
        let e = Element::new(
            ElementKind::HintPreload,
            json!(["/f.woff2", "font", {"crossOrigin": ""}]),
            None,
            None,
        )
        .unwrap();
        assert!(e.attrs().unwrap().contains_key("crossOrigin"));
    }

    #[test]
    fn test_hint_preload_rejects_bad_shape() {
        let err = Element::new(ElementKind::HintPreload, json!(["/a.css"]), None, None);
        assert!(err.is_err());
        let err = Element::new(ElementKind::HintPreload, json!(["/a.css", 2]), None, None);
        assert!(err.is_err());
    }

    #[test]
    fn test_module_tuple_form() {
        let e = Element::new(
            ElementKind::Module,
            json!([39275, ["177", "static/chunks/app/layout.js"], "default", true]),
            Some("I".to_string()),
            Some(1),
        )
        .unwrap();
        assert_eq!(e.module_id(), Some(39275));
        assert_eq!(e.module_name(), Some("default"));
        assert!(e.is_async());
        let chunks = e.module_chunks().unwrap();
        assert_eq!(
            chunks.get("177").map(String::as_str),
            Some("static/chunks/app/layout.js")
        );
    }

    #[test]
    fn test_module_mapping_form() {
        let e = Element::new(
            ElementKind::Module,
            json!({"id": 7, "chunks": {"app": "static/chunks/app.js"}, "name": "default"}),
            None,
            None,
        )
        .unwrap();
        assert_eq!(e.module_id(), Some(7));
        assert!(!e.is_async());
        assert_eq!(
            e.module_chunks().unwrap().get("app").map(String::as_str),
            Some("static/chunks/app.js")
        );
    }

    #[test]
    fn test_module_rejects_missing_id() {
        let err = Element::new(ElementKind::Module, json!({"chunks": {}}), None, None);
        assert!(err.is_err());
    }

    #[test]
    fn test_url_query_contract() {
        let e = Element::new(ElementKind::UrlQuery, json!(["k", "v", "d"]), None, Some(2)).unwrap();
        assert_eq!(e.key(), Some("k"));
        assert_eq!(e.val(), Some("v"));

        let err = Element::new(ElementKind::UrlQuery, json!(["k", "v", "x"]), None, None);
        assert!(err.is_err());
    }

    #[test]
    fn test_rsc_payload_new_form() {
        let e = Element::new(ElementKind::RscPayload, json!({"b": "XYZ"}), None, Some(0)).unwrap();
        assert_eq!(e.version(), Some(RscVersion::New));
        assert_eq!(e.build_id(), Some("XYZ"));
    }

    #[test]
    fn test_rsc_payload_legacy_form() {
        let e = Element::new(
            ElementKind::RscPayload,
            json!(["$", "$L1", null, {"buildId": "XYZ"}]),
            None,
            Some(0),
        )
        .unwrap();
        assert_eq!(e.version(), Some(RscVersion::Old));
        assert_eq!(e.build_id(), Some("XYZ"));
    }

    #[test]
    fn test_rsc_payload_rejects_missing_build_id() {
        let err = Element::new(ElementKind::RscPayload, json!({"a": 1}), None, Some(0));
        assert!(err.is_err());
    }

    #[test]
    fn test_data_content_nullable() {
        let e = Element::new(
            ElementKind::Data,
            json!(["$", "$L5", null, {"profile": {}}]),
            None,
            Some(5),
        )
        .unwrap();
        assert!(e.content().unwrap().get("profile").is_some());

        let empty = Element::new(ElementKind::Data, json!(["$", "$L5", null, null]), None, None)
            .unwrap();
        assert!(empty.content().is_none());
    }

    #[test]
    fn test_html_element_requires_attrs_mapping() {
        let e = Element::new(
            ElementKind::HtmlElement,
            json!(["$", "link", "/style.css", {"rel": "stylesheet"}]),
            None,
            None,
        )
        .unwrap();
        assert_eq!(e.tag(), Some("link"));
        assert_eq!(e.href(), Some("/style.css"));
        assert!(e.attrs().unwrap().contains_key("rel"));

        let err = Element::new(
            ElementKind::HtmlElement,
            json!(["$", "div", null, null]),
            None,
            None,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_error_digest() {
        let e = Element::new(
            ElementKind::Error,
            json!({"digest": "NEXT_NOT_FOUND"}),
            Some("E".to_string()),
            Some(9),
        )
        .unwrap();
        assert_eq!(e.digest(), Some("NEXT_NOT_FOUND"));
    }

    #[test]
    fn test_container_resolves_children() {
        let e = Element::new(
            ElementKind::DataContainer,
            json!([
                ["$", "div", null, {"className": "a"}],
                ["$", "span", null, {"className": "b"}]
            ]),
            None,
            Some(3),
        )
        .unwrap();
        let children = e.elements().unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.kind() == ElementKind::HtmlElement));
        assert!(children.iter().all(|c| c.index().is_none()));
    }

    #[test]
    fn test_parent_resolves_child_element() {
        let e = Element::new(
            ElementKind::DataParent,
            json!(["$", "$L2", null, {"children": ["$", "$L3", null, {"profile": {}}]}]),
            None,
            Some(2),
        )
        .unwrap();
        let child = e.children().unwrap();
        assert_eq!(child.kind(), ElementKind::Data);
        assert!(child.content().unwrap().get("profile").is_some());
    }

    #[test]
    fn test_record_roundtrip() {
        let e = Element::new(
            ElementKind::HintPreload,
            json!(["/a.css", "style"]),
            Some("HL".to_string()),
            Some(0),
        )
        .unwrap();
        let back = Element::from_record(e.to_record()).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_record_roundtrip_composites() {
        // Children are rebuilt from the raw payload, so composites must come
        // back equal too.
        let container = Element::new(
            ElementKind::DataContainer,
            json!([["$", "div", null, {}], null, "$Sref"]),
            None,
            Some(4),
        )
        .unwrap();
        assert_eq!(Element::from_record(container.to_record()).unwrap(), container);

        let parent = Element::new(
            ElementKind::DataParent,
            json!(["$", "$L2", null, {"children": ["$", "$L3", null, null]}]),
            None,
            Some(2),
        )
        .unwrap();
        assert_eq!(Element::from_record(parent.to_record()).unwrap(), parent);
    }

    #[test]
    fn test_record_roundtrip_through_json() {
        // The flat record form survives a serde dump and reload.
        let e = Element::new(ElementKind::RscPayload, json!({"b": "XYZ"}), None, Some(0)).unwrap();
        let dumped = serde_json::to_string(&e.to_record()).unwrap();
        let reloaded: ElementRecord = serde_json::from_str(&dumped).unwrap();
        assert_eq!(Element::from_record(reloaded).unwrap(), e);
    }

    #[test]
    fn test_resolver_consumes_dumped_record_value() {
        // A dumped record fed back as a plain JSON value unwraps through the
        // resolver (round-trip without the explicit record type).
        let e = Element::new(
            ElementKind::Text,
            json!("hi"),
            Some("T".to_string()),
            Some(1),
        )
        .unwrap();
        let dumped = serde_json::to_value(e.to_record()).unwrap();
        let back = resolve::resolve(dumped, None, None).unwrap();
        assert_eq!(back, e);
    }
}
