//! ViewDefinition structures
//!
//! The model is immutable once built: definitions loaded from JSON are
//! validated on the way in, and programmatic definitions are assembled with
//! the `with_*` methods before being handed to an applicator.

use octofhir_sof_fhirpath::FhirVersion;
use once_cell::sync::Lazy;
use regex::Regex;

/// Type name inferred for `getResourceKey()` and `getReferenceKey()` columns
pub const ID_TYPE: &str = "id";

static RESOURCE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*getResourceKey\(\s*\)\s*$").expect("valid regex"));

static REFERENCE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?P<prefix>.*\S)\s*\.\s*)?getReferenceKey\(\s*(?:'(?P<quoted>[A-Za-z]*)'|(?P<bare>[A-Za-z]+))?\s*\)\s*$",
    )
    .expect("valid regex")
});

// ============================================================================
// View Definition
// ============================================================================

/// A SQL-on-FHIR view over one resource type
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    /// Canonical URL
    pub url: Option<String>,
    /// Computer-friendly name
    pub name: Option<String>,
    /// Human-friendly title
    pub title: Option<String>,
    /// Publication status
    pub status: Option<String>,
    /// Free text description
    pub description: Option<String>,
    /// Resource type the view applies to
    pub resource: String,
    /// FHIR release paths are evaluated under
    pub fhir_version: FhirVersion,
    /// Top-level selects, cross-joined
    pub select: Vec<Select>,
    /// Filters, all of which must hold
    pub where_clauses: Vec<Where>,
}

impl ViewDefinition {
    /// Create an empty view over `resource`
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            url: None,
            name: None,
            title: None,
            status: None,
            description: None,
            resource: resource.into(),
            fhir_version: FhirVersion::default(),
            select: Vec::new(),
            where_clauses: Vec::new(),
        }
    }

    /// Set the view name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the FHIR release
    pub fn with_version(mut self, version: FhirVersion) -> Self {
        self.fhir_version = version;
        self
    }

    /// Append a top-level select
    pub fn with_select(mut self, select: Select) -> Self {
        self.select.push(select);
        self
    }

    /// Append a `where` filter
    pub fn with_where(mut self, path: impl Into<String>) -> Self {
        self.where_clauses.push(Where::new(path));
        self
    }

    /// Output column names, in output order
    ///
    /// `unionAll` contributes the columns of its first branch.
    pub fn column_names(&self) -> Vec<&str> {
        self.select
            .iter()
            .flat_map(Select::column_names)
            .collect()
    }
}

/// A `where` filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Where {
    /// FHIRPath expression yielding a single boolean
    pub path: String,
    pub description: Option<String>,
}

impl Where {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: None,
        }
    }
}

// ============================================================================
// Select
// ============================================================================

/// Iteration directive of a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// One output per matched element; no match yields no rows
    ForEach(String),
    /// Like `ForEach`, but no match yields a single row of nulls
    ForEachOrNull(String),
}

impl Iteration {
    /// Path selecting the elements to iterate
    pub fn path(&self) -> &str {
        match self {
            Iteration::ForEach(path) | Iteration::ForEachOrNull(path) => path,
        }
    }

    /// Whether an empty match produces a null row
    pub fn is_or_null(&self) -> bool {
        matches!(self, Iteration::ForEachOrNull(_))
    }
}

/// One unit of a view producing zero or more rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    /// `forEach` / `forEachOrNull`, if any
    pub iteration: Option<Iteration>,
    /// Columns evaluated against each iterated element
    pub columns: Vec<Column>,
    /// Nested selects, cross-joined with the columns
    pub select: Vec<Select>,
    /// Alternative branches whose rows are concatenated
    pub union_all: Vec<Select>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over the elements matched by `path`
    pub fn for_each(mut self, path: impl Into<String>) -> Self {
        self.iteration = Some(Iteration::ForEach(path.into()));
        self
    }

    /// Iterate over the elements matched by `path`, keeping a null row
    pub fn for_each_or_null(mut self, path: impl Into<String>) -> Self {
        self.iteration = Some(Iteration::ForEachOrNull(path.into()));
        self
    }

    /// Append a column
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a nested select
    pub fn with_select(mut self, select: Select) -> Self {
        self.select.push(select);
        self
    }

    /// Append a `unionAll` branch
    pub fn with_union(mut self, branch: Select) -> Self {
        self.union_all.push(branch);
        self
    }

    /// Output column names of this select, in output order
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        names.extend(self.select.iter().flat_map(Select::column_names));
        if let Some(first) = self.union_all.first() {
            names.extend(first.column_names());
        }
        names
    }
}

// ============================================================================
// Column
// ============================================================================

/// How a column's values are extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPath {
    /// Ordinary FHIRPath expression
    Plain(String),
    /// `getResourceKey()`
    ResourceKey,
    /// `[prefix.]getReferenceKey([type])`
    ReferenceKey {
        prefix: Option<String>,
        resource_type: Option<String>,
    },
}

impl ColumnPath {
    /// Classify a column path
    pub fn parse(path: &str) -> Self {
        if RESOURCE_KEY.is_match(path) {
            return ColumnPath::ResourceKey;
        }
        if let Some(caps) = REFERENCE_KEY.captures(path) {
            let resource_type = caps
                .name("quoted")
                .or_else(|| caps.name("bare"))
                .map(|m| m.as_str())
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            return ColumnPath::ReferenceKey {
                prefix: caps.name("prefix").map(|m| m.as_str().to_string()),
                resource_type,
            };
        }
        ColumnPath::Plain(path.to_string())
    }

    /// Whether the path is one of the key extractions
    pub fn is_special(&self) -> bool {
        !matches!(self, ColumnPath::Plain(_))
    }
}

/// An output column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Output name, unique within the view
    pub name: String,
    /// Path as written
    pub path: String,
    /// Classified path
    pub kind: ColumnPath,
    pub description: Option<String>,
    /// Type declared by the author
    pub declared_type: Option<String>,
    /// Collection flag declared by the author
    pub collection: bool,
    /// Type inferred from a key extraction path
    pub inferred_type: Option<&'static str>,
    /// Collection flag inferred from a key extraction path
    pub inferred_collection: Option<bool>,
}

impl Column {
    /// Create a column, classifying its path
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let kind = ColumnPath::parse(&path);
        let (inferred_type, inferred_collection) = match kind {
            ColumnPath::ResourceKey => (Some(ID_TYPE), Some(false)),
            ColumnPath::ReferenceKey { .. } => (Some(ID_TYPE), None),
            ColumnPath::Plain(_) => (None, None),
        };
        Self {
            name: name.into(),
            path,
            kind,
            description: None,
            declared_type: None,
            collection: false,
            inferred_type,
            inferred_collection,
        }
    }

    /// Declare the column type
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.declared_type = Some(type_name.into());
        self
    }

    /// Declare the column collection-valued
    pub fn as_collection(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Declared type, or the inferred one
    pub fn type_name(&self) -> Option<&str> {
        self.declared_type.as_deref().or(self.inferred_type)
    }

    /// Declared or inferred as a collection
    pub fn is_collection(&self) -> bool {
        self.collection || self.inferred_collection == Some(true)
    }
}
