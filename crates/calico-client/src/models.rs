//! Identity of a downstream policy object

use crate::error::CalicoError;
use policy_document::Document;
use std::fmt;

/// `(namespace, name)` pair shared by an upstream policy and its mirror.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    /// Namespace of both objects
    pub namespace: String,
    /// Name of both objects
    pub name: String,
}

impl ObjectKey {
    /// Builds a key from its parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reads `metadata.namespace` and `metadata.name` from a document.
    pub fn from_document(doc: &Document) -> Result<Self, CalicoError> {
        let field = |name: &str| {
            doc.get_path(&["metadata", name])
                .and_then(Document::as_str)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| CalicoError::InvalidDocument(format!("metadata.{name} is missing or not a string")))
        };
        Ok(Self::new(field("namespace")?, field("name")?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Downstream operation, used to classify API errors and in the mock call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// POST of a new object
    Create,
    /// PUT over the live object
    Replace,
    /// DELETE by key
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Replace => "replace",
            Self::Delete => "delete",
        })
    }
}
