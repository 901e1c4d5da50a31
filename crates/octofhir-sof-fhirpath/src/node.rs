//! Views into JSON FHIR documents
//!
//! A [`Node`] is one item of a FHIRPath collection. Nodes reached by
//! navigating a document borrow from it; values computed during evaluation
//! (the boolean of a comparison, a joined string) are owned.

use serde_json::{Map, Value};
use std::borrow::Cow;

/// Keys a FHIR `Reference` element may carry
const REFERENCE_KEYS: &[&str] = &["reference", "type", "identifier", "display", "id", "extension"];

/// FHIR primitive types, as they appear as choice-element suffixes
const PRIMITIVE_TYPES: &[(&str, &str)] = &[
    ("Base64Binary", "base64Binary"),
    ("Boolean", "boolean"),
    ("Canonical", "canonical"),
    ("Code", "code"),
    ("Date", "date"),
    ("DateTime", "dateTime"),
    ("Decimal", "decimal"),
    ("Id", "id"),
    ("Instant", "instant"),
    ("Integer", "integer"),
    ("Integer64", "integer64"),
    ("Markdown", "markdown"),
    ("Oid", "oid"),
    ("PositiveInt", "positiveInt"),
    ("String", "string"),
    ("Time", "time"),
    ("UnsignedInt", "unsignedInt"),
    ("Uri", "uri"),
    ("Url", "url"),
    ("Uuid", "uuid"),
];

/// FHIR complex data types allowed as choice-element suffixes
const COMPLEX_TYPES: &[&str] = &[
    "Address",
    "Age",
    "Annotation",
    "Attachment",
    "Availability",
    "CodeableConcept",
    "CodeableReference",
    "Coding",
    "ContactDetail",
    "ContactPoint",
    "Contributor",
    "Count",
    "DataRequirement",
    "Distance",
    "Dosage",
    "Duration",
    "Expression",
    "ExtendedContactDetail",
    "HumanName",
    "Identifier",
    "Meta",
    "Money",
    "ParameterDefinition",
    "Period",
    "Quantity",
    "Range",
    "Ratio",
    "RatioRange",
    "Reference",
    "RelatedArtifact",
    "SampledData",
    "Signature",
    "Timing",
    "TriggerDefinition",
    "UsageContext",
];

/// String-valued FHIR primitives, all encoded as JSON strings
pub(crate) const STRING_TYPES: &[&str] = &[
    "string",
    "code",
    "id",
    "uri",
    "url",
    "canonical",
    "oid",
    "uuid",
    "markdown",
    "base64Binary",
    "date",
    "dateTime",
    "instant",
    "time",
];

/// Integer-valued FHIR primitives
pub(crate) const INTEGER_TYPES: &[&str] = &["integer", "positiveInt", "unsignedInt", "integer64"];

/// One item of a FHIRPath collection
#[derive(Debug, Clone, PartialEq)]
pub struct Node<'a> {
    value: Cow<'a, Value>,
    /// Type taken from a choice-element suffix (`valueQuantity` -> `Quantity`)
    type_hint: Option<&'static str>,
}

impl<'a> Node<'a> {
    /// Wrap a value borrowed from a document
    pub fn borrowed(value: &'a Value) -> Self {
        Self {
            value: Cow::Borrowed(value),
            type_hint: None,
        }
    }

    /// Wrap a computed value
    pub fn owned(value: Value) -> Self {
        Self {
            value: Cow::Owned(value),
            type_hint: None,
        }
    }

    /// Computed boolean
    pub fn boolean(value: bool) -> Self {
        Self::owned(Value::Bool(value))
    }

    /// Computed string
    pub fn string(value: impl Into<String>) -> Self {
        Self::owned(Value::String(value.into()))
    }

    /// Computed integer
    pub fn integer(value: i64) -> Self {
        Self::owned(Value::from(value))
    }

    pub(crate) fn with_type_hint(mut self, hint: &'static str) -> Self {
        self.type_hint = Some(hint);
        self
    }

    /// The underlying JSON value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The JSON value with the document lifetime, if this node borrows it
    pub fn as_borrowed(&self) -> Option<&'a Value> {
        match &self.value {
            Cow::Borrowed(value) => Some(*value),
            Cow::Owned(_) => None,
        }
    }

    /// Take the JSON value out of the node, cloning borrowed values
    pub fn into_value(self) -> Value {
        self.value.into_owned()
    }

    /// Detach the node from the document it borrows
    pub fn into_owned<'b>(self) -> Node<'b> {
        Node {
            value: Cow::Owned(self.value.into_owned()),
            type_hint: self.type_hint,
        }
    }

    /// Whether this node is exactly `value` (same location in the same document)
    pub fn is_same(&self, value: &Value) -> bool {
        self.as_borrowed().is_some_and(|own| std::ptr::eq(own, value))
    }

    /// FHIR type name of the node
    ///
    /// Without structure definitions the type is read off the JSON shape:
    /// primitives by their JSON kind, resources by `resourceType`, and
    /// reference-shaped objects as `Reference`. Choice elements keep the
    /// type named by their suffix.
    pub fn fhir_type(&self) -> &str {
        if let Some(hint) = self.type_hint {
            return hint;
        }
        match self.value() {
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Value::Number(_) => "decimal",
            Value::Object(map) => match map.get("resourceType") {
                Some(Value::String(resource_type)) => resource_type.as_str(),
                _ if is_reference_shape(map) => "Reference",
                _ => "Element",
            },
            Value::Array(_) => "Collection",
            Value::Null => "null",
        }
    }

    /// Boolean-typed node
    pub fn is_boolean(&self) -> bool {
        self.value().is_boolean()
    }

    /// Boolean value, if the node is boolean-typed
    pub fn as_bool(&self) -> Option<bool> {
        self.value().as_bool()
    }

    /// String value, if the node is a JSON string
    pub fn as_str(&self) -> Option<&str> {
        self.value().as_str()
    }

    /// Whether the node is a FHIR resource (an object carrying `resourceType`)
    pub fn is_resource(&self) -> bool {
        self.type_hint.is_none()
            && self
                .value()
                .get("resourceType")
                .is_some_and(Value::is_string)
    }

    /// Whether the node is a FHIR `Reference`
    pub fn is_reference(&self) -> bool {
        self.fhir_type() == "Reference"
    }

    /// Element carrying nothing but `id` and extensions
    ///
    /// Such an element has no type of its own to read from its shape; a
    /// Reference with only a data-absent-reason extension looks like this.
    pub fn is_bare_element(&self) -> bool {
        match self.value() {
            Value::Object(map) => map
                .keys()
                .filter(|key| !key.starts_with('_'))
                .all(|key| key == "id" || key == "extension"),
            _ => false,
        }
    }

    /// Primitive (non-object) node
    pub fn is_primitive(&self) -> bool {
        !matches!(self.value(), Value::Object(_) | Value::Array(_) | Value::Null)
    }

    /// Whether the node is of the named FHIR or System type
    ///
    /// `FHIR.` prefixes are ignored and `System.String` style names are
    /// matched against the FHIR primitive they map to. Untagged JSON strings
    /// and integers match any FHIR primitive carried in that JSON kind.
    pub fn is_type(&self, type_name: &str) -> bool {
        let wanted = normalize_type_name(type_name);
        let actual = self.fhir_type();
        if actual == wanted {
            return true;
        }
        if self.is_resource() {
            return matches!(wanted.as_str(), "Resource" | "DomainResource");
        }
        if self.type_hint.is_some() {
            return false;
        }
        match self.value() {
            Value::String(_) => STRING_TYPES.contains(&wanted.as_str()),
            Value::Number(n) if n.is_i64() || n.is_u64() => {
                INTEGER_TYPES.contains(&wanted.as_str()) || wanted == "decimal"
            }
            _ => false,
        }
    }

    /// Child nodes reached through the element `name`
    ///
    /// Arrays are flattened and JSON nulls dropped. When `name` is absent
    /// the choice elements `name[x]` are returned, tagged with their type.
    pub fn children(&self, name: &str) -> Vec<Node<'a>> {
        match &self.value {
            Cow::Borrowed(value) => element_children(*value, name),
            Cow::Owned(value) => element_children(value, name)
                .into_iter()
                .map(Node::into_owned)
                .collect(),
        }
    }

    /// All child nodes, in document order
    pub fn all_children(&self) -> Vec<Node<'a>> {
        match &self.value {
            Cow::Borrowed(value) => every_child(*value),
            Cow::Owned(value) => every_child(value)
                .into_iter()
                .map(Node::into_owned)
                .collect(),
        }
    }
}

/// Whether an object looks like a FHIR `Reference`
/// Primitive extensions (`_display`, `_reference`) do not count against the shape
fn is_reference_shape(map: &Map<String, Value>) -> bool {
    let has_reference_field = ["reference", "type", "identifier", "display"]
        .iter()
        .any(|key| map.contains_key(*key));
    has_reference_field
        && map
            .keys()
            .filter(|key| !key.starts_with('_'))
            .all(|key| REFERENCE_KEYS.contains(&key.as_str()))
}

/// `FHIR.Quantity` -> `Quantity`, `System.String` -> `string`
fn normalize_type_name(type_name: &str) -> String {
    if let Some(name) = type_name.strip_prefix("FHIR.") {
        return name.to_string();
    }
    if let Some(name) = type_name.strip_prefix("System.") {
        let mut chars = name.chars();
        return match chars.next() {
            Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
            None => String::new(),
        };
    }
    type_name.to_string()
}

/// FHIR type named by a choice suffix, `None` when the suffix is not a type
pub(crate) fn choice_type_name(suffix: &str) -> Option<&'static str> {
    PRIMITIVE_TYPES
        .iter()
        .find(|(choice, _)| *choice == suffix)
        .map(|(_, name)| *name)
        .or_else(|| COMPLEX_TYPES.iter().find(|name| **name == suffix).copied())
}

fn flatten<'b>(value: &'b Value) -> Vec<Node<'b>> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(Node::borrowed)
            .collect(),
        Value::Null => Vec::new(),
        other => vec![Node::borrowed(other)],
    }
}

fn element_children<'b>(value: &'b Value, name: &str) -> Vec<Node<'b>> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    if let Some(child) = map.get(name) {
        return flatten(child);
    }

    let mut choices = Vec::new();
    for (key, child) in map {
        let Some(suffix) = key.strip_prefix(name) else {
            continue;
        };
        if let Some(type_name) = choice_type_name(suffix) {
            choices.extend(
                flatten(child)
                    .into_iter()
                    .map(|node| node.with_type_hint(type_name)),
            );
        }
    }
    choices
}

fn every_child(value: &Value) -> Vec<Node<'_>> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !key.starts_with('_') && key.as_str() != "resourceType")
            .flat_map(|(key, child)| {
                let hint = key
                    .char_indices()
                    .find(|(_, c)| c.is_ascii_uppercase())
                    .and_then(|(index, _)| choice_type_name(&key[index..]));
                flatten(child).into_iter().map(move |node| match hint {
                    Some(type_name) => node.with_type_hint(type_name),
                    None => node,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}
