//! Conversions between [`Document`] and the `serde_json` / `serde_yaml` value trees.

use crate::document::{Document, Mapping};
use crate::error::DocumentError;
use crate::path::{join_index, join_key};

impl TryFrom<serde_json::Value> for Document {
    type Error = DocumentError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        from_json(value, "")
    }
}

impl TryFrom<serde_yaml::Value> for Document {
    type Error = DocumentError;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        from_yaml(value, "")
    }
}

impl From<&Document> for serde_json::Value {
    fn from(doc: &Document) -> Self {
        match doc {
            Document::Null => Self::Null,
            Document::Bool(b) => Self::Bool(*b),
            Document::Int(i) => Self::from(*i),
            Document::String(s) => Self::String(s.clone()),
            Document::Sequence(items) => Self::Array(items.iter().map(Self::from).collect()),
            Document::Mapping(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

fn from_json(value: serde_json::Value, path: &str) -> Result<Document, DocumentError> {
    use serde_json::Value;

    Ok(match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(b),
        Value::Number(n) => Document::Int(integer(n.as_i64(), n.is_f64(), path)?),
        Value::String(s) => Document::String(s),
        Value::Array(items) => Document::Sequence(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| from_json(item, &join_index(path, i)))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Document::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let child = from_json(v, &join_key(path, &k))?;
                    Ok((k, child))
                })
                .collect::<Result<Mapping, DocumentError>>()?,
        ),
    })
}

fn from_yaml(value: serde_yaml::Value, path: &str) -> Result<Document, DocumentError> {
    use serde_yaml::Value;

    Ok(match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(b),
        Value::Number(n) => Document::Int(integer(n.as_i64(), n.is_f64(), path)?),
        Value::String(s) => Document::String(s),
        Value::Sequence(items) => Document::Sequence(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| from_yaml(item, &join_index(path, i)))
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                let Value::String(key) = k else {
                    return Err(DocumentError::UnsupportedKey {
                        path: path.to_owned(),
                    });
                };
                let child = from_yaml(v, &join_key(path, &key))?;
                out.insert(key, child);
            }
            Document::Mapping(out)
        }
        Value::Tagged(_) => {
            return Err(DocumentError::UnsupportedScalar {
                path: path.to_owned(),
                kind: "tagged",
            });
        }
    })
}

fn integer(value: Option<i64>, is_float: bool, path: &str) -> Result<i64, DocumentError> {
    value.ok_or_else(|| DocumentError::UnsupportedScalar {
        path: path.to_owned(),
        kind: if is_float { "float" } else { "out-of-range integer" },
    })
}
