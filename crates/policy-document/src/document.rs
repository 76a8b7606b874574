//! The document tree.

use crate::error::DocumentError;
use crate::path;
use std::collections::BTreeMap;

/// String-keyed mapping. Sorted so that serialisation is deterministic.
pub type Mapping = BTreeMap<String, Document>;

/// A structured document: the closed set of shapes a policy template or a
/// watched Kubernetes object may take.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Document {
    /// Explicit null, also the value of a freshly created path segment
    #[default]
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// String scalar
    String(String),
    /// Ordered sequence
    Sequence(Vec<Document>),
    /// String-keyed mapping
    Mapping(Mapping),
}

impl Document {
    /// Parses a YAML document.
    pub fn from_yaml_str(input: &str) -> Result<Self, DocumentError> {
        let value: serde_yaml::Value = serde_yaml::from_str(input)?;
        Self::try_from(value)
    }

    /// Parses a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self, DocumentError> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Self::try_from(value)
    }

    /// Converts the document into a `serde_json::Value`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    /// True for an explicit null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer value, if this is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The items, if this is a sequence.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Document]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// The entries, if this is a mapping.
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key when the document is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Follows a path of mapping keys. An empty path returns `self`.
    #[must_use]
    pub fn get_path(&self, segments: &[&str]) -> Option<&Document> {
        segments
            .iter()
            .try_fold(self, |current, segment| current.get(segment))
    }

    /// Sets the value at a path of mapping keys.
    ///
    /// Missing or null intermediate segments are created as empty mappings.
    /// Any other non-mapping value along the way is an error and leaves the
    /// document unchanged.
    pub fn set_path(&mut self, segments: &[&str], value: Document) -> Result<(), DocumentError> {
        let Some((last, parents)) = segments.split_last() else {
            return Err(DocumentError::EmptyPath);
        };

        // Check first so a failed set never leaves half-created mappings behind.
        let mut probe = Some(&*self);
        for (depth, segment) in parents.iter().enumerate() {
            match probe {
                Some(Self::Null) | None => break,
                Some(Self::Mapping(map)) => probe = map.get(*segment),
                Some(_) => return Err(not_a_mapping(segments, depth)),
            }
        }
        if let Some(doc) = probe {
            if !matches!(doc, Self::Null | Self::Mapping(_)) {
                return Err(not_a_mapping(segments, parents.len()));
            }
        }

        let mut current = self;
        for (depth, segment) in parents.iter().enumerate() {
            let map = current
                .ensure_mapping()
                .ok_or_else(|| not_a_mapping(segments, depth))?;
            current = map.entry((*segment).to_owned()).or_default();
        }
        current
            .ensure_mapping()
            .ok_or_else(|| not_a_mapping(segments, parents.len()))?
            .insert((*last).to_owned(), value);
        Ok(())
    }

    fn ensure_mapping(&mut self) -> Option<&mut Mapping> {
        if self.is_null() {
            *self = Self::Mapping(Mapping::new());
        }
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }
}

fn not_a_mapping(segments: &[&str], depth: usize) -> DocumentError {
    let segment = if depth == 0 {
        "document root".to_owned()
    } else {
        path::render(&segments[..depth])
    };
    DocumentError::NotAMapping {
        path: path::render(segments),
        segment,
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<Document>> for Document {
    fn from(value: Vec<Document>) -> Self {
        Self::Sequence(value)
    }
}

impl From<Mapping> for Document {
    fn from(value: Mapping) -> Self {
        Self::Mapping(value)
    }
}

impl<K: Into<String>> FromIterator<(K, Document)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, Document)>>(iter: T) -> Self {
        Self::Mapping(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
