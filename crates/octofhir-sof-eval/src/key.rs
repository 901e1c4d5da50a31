//! Resource and reference keys
//!
//! A key identifies a resource as `[base/]Type/id[/_history/version]`.
//! Keys are read either from a resource (`resourceType` + `id`) or from the
//! `reference` string of a `Reference` element.

use serde_json::Value;
use std::fmt;

/// Identity of a resource, or of the target of a reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    /// Resource type, when known
    pub resource_type: Option<String>,
    /// Logical id (`#id` for contained resources, the whole URN for `urn:` references)
    pub id: String,
    /// Version from a `_history` segment or `meta.versionId`
    pub version: Option<String>,
    /// Server base of an absolute reference
    pub base_url: Option<String>,
}

impl ResourceKey {
    /// Key of a resource; `None` when it has no `id`
    pub fn from_resource(resource: &Value) -> Option<Self> {
        let id = resource.get("id")?.as_str()?.trim();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            resource_type: resource
                .get("resourceType")
                .and_then(Value::as_str)
                .map(str::to_string),
            id: id.to_string(),
            version: resource
                .pointer("/meta/versionId")
                .and_then(Value::as_str)
                .map(str::to_string),
            base_url: None,
        })
    }

    /// Key of the target of a `Reference` element
    ///
    /// The `reference` string decides the key; the element's `type` fills
    /// in a resource type the string does not carry. References without a
    /// `reference` string (identifier-only or display-only) have no key.
    pub fn from_reference(reference: &Value) -> Option<Self> {
        let mut key = Self::parse(reference.get("reference")?.as_str()?)?;
        if key.resource_type.is_none() {
            key.resource_type = reference
                .get("type")
                .and_then(Value::as_str)
                .and_then(|t| t.rsplit('/').next())
                .filter(|t| !t.is_empty())
                .map(str::to_string);
        }
        Some(key)
    }

    /// Parse a reference string
    ///
    /// Conditional references (`Patient?identifier=...`) have no key.
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() || reference.contains('?') {
            return None;
        }
        if reference.starts_with('#') || reference.starts_with("urn:") {
            return Some(Self::bare(reference));
        }

        let segments: Vec<&str> = reference.split('/').collect();
        let (segments, version) = match segments.as_slice() {
            [rest @ .., "_history", version] if rest.len() >= 2 => (rest, Some(version.to_string())),
            all => (all, None),
        };

        match segments {
            [] => None,
            [.., ""] => None,
            [id] => Some(Self::bare(id)),
            [base @ .., resource_type, id] => {
                if !resource_type.starts_with(|c: char| c.is_ascii_uppercase()) {
                    return Some(Self::bare(id));
                }
                Some(Self {
                    resource_type: Some(resource_type.to_string()),
                    id: id.to_string(),
                    version,
                    base_url: (!base.is_empty()).then(|| base.join("/")),
                })
            }
        }
    }

    fn bare(id: &str) -> Self {
        Self {
            resource_type: None,
            id: id.to_string(),
            version: None,
            base_url: None,
        }
    }

    /// The id part alone
    pub fn id_part(&self) -> &str {
        &self.id
    }

    /// Whether the key names a resource of the given type
    pub fn is_type(&self, resource_type: &str) -> bool {
        self.resource_type.as_deref() == Some(resource_type)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(base) = &self.base_url {
            write!(f, "{}/", base)?;
        }
        if let Some(resource_type) = &self.resource_type {
            write!(f, "{}/", resource_type)?;
        }
        write!(f, "{}", self.id)?;
        if let Some(version) = &self.version {
            write!(f, "/_history/{}", version)?;
        }
        Ok(())
    }
}
