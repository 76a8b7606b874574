//! Label selector model.
//!
//! Mirrors the `podSelector` of a Kubernetes `NetworkPolicy`. The operator is
//! kept as the raw string so that unknown operators are reported by
//! [`translate`](crate::translate()) rather than lost during parsing.

use crate::error::SelectorError;
use policy_document::path::{join_index, join_key};
use policy_document::{Document, Mapping};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// A Kubernetes label selector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Exact-match labels
    #[serde(default)]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// Set-based requirements, in order
    #[serde(default)]
    pub match_expressions: Option<Vec<Requirement>>,
}

/// A single `matchExpressions` entry.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Requirement {
    /// Label key
    pub key: String,

    /// Operator as written (`In`, `NotIn`, `Exists`, `DoesNotExist`)
    pub operator: String,

    /// Values for set operators; must be absent for existence operators
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

/// Operators understood by the translator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    /// Value is in the set
    In,
    /// Value is not in the set, or the label is absent
    NotIn,
    /// Label is present
    Exists,
    /// Label is absent
    DoesNotExist,
}

impl Operator {
    /// Parses an operator name; `None` for anything unknown.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "In" => Some(Self::In),
            "NotIn" => Some(Self::NotIn),
            "Exists" => Some(Self::Exists),
            "DoesNotExist" => Some(Self::DoesNotExist),
            _ => None,
        }
    }

    /// The operator's name as written in a selector.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "In",
            Self::NotIn => "NotIn",
            Self::Exists => "Exists",
            Self::DoesNotExist => "DoesNotExist",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Requirement {
    /// Convenience constructor.
    #[must_use]
    pub fn new(key: impl Into<String>, operator: impl Into<String>, values: Option<Vec<&str>>) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            values: values.map(|values| values.into_iter().map(str::to_owned).collect()),
        }
    }
}

impl LabelSelector {
    /// Reads a selector out of a document tree.
    ///
    /// Absent or null clauses mean "no constraint". Any shape mismatch is
    /// reported as [`SelectorError::MalformedSelector`] naming the offending
    /// path relative to the selector.
    pub fn from_document(doc: &Document) -> Result<Self, SelectorError> {
        let map = doc.as_mapping().ok_or_else(|| {
            SelectorError::malformed("selector", format!("expected a mapping, found {}", doc.kind_name()))
        })?;
        Self::from_mapping(map)
    }

    /// Reads a selector out of an already-unwrapped mapping.
    pub fn from_mapping(map: &Mapping) -> Result<Self, SelectorError> {
        Ok(Self {
            match_labels: present(map, "matchLabels").map(parse_match_labels).transpose()?,
            match_expressions: present(map, "matchExpressions")
                .map(parse_match_expressions)
                .transpose()?,
        })
    }

    /// True when the selector carries no clause at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.match_labels.as_ref().is_none_or(BTreeMap::is_empty)
            && self.match_expressions.as_ref().is_none_or(Vec::is_empty)
    }
}

fn present<'a>(map: &'a Mapping, key: &str) -> Option<&'a Document> {
    map.get(key).filter(|doc| !doc.is_null())
}

fn expected(path: &str, what: &str, found: &Document) -> SelectorError {
    SelectorError::malformed(path, format!("expected {what}, found {}", found.kind_name()))
}

fn parse_match_labels(doc: &Document) -> Result<BTreeMap<String, String>, SelectorError> {
    let path = "matchLabels";
    let map = doc.as_mapping().ok_or_else(|| expected(path, "a mapping", doc))?;
    map.iter()
        .map(|(key, value)| {
            let value = value
                .as_str()
                .ok_or_else(|| expected(&join_key(path, key), "a string", value))?;
            Ok((key.clone(), value.to_owned()))
        })
        .collect()
}

fn parse_match_expressions(doc: &Document) -> Result<Vec<Requirement>, SelectorError> {
    let path = "matchExpressions";
    let items = doc.as_sequence().ok_or_else(|| expected(path, "a sequence", doc))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_requirement(item, &join_index(path, i)))
        .collect()
}

fn parse_requirement(doc: &Document, path: &str) -> Result<Requirement, SelectorError> {
    let map = doc.as_mapping().ok_or_else(|| expected(path, "a mapping", doc))?;
    let key = required_string(map, path, "key")?;
    let operator = required_string(map, path, "operator")?;

    let values = match map.get("values") {
        None => None,
        // Null stands in for an absent list, except where no list is allowed at all
        Some(Document::Null) => match Operator::parse(&operator) {
            Some(Operator::Exists | Operator::DoesNotExist) => Some(Vec::new()),
            _ => None,
        },
        Some(values) => {
            let values_path = join_key(path, "values");
            let items = values
                .as_sequence()
                .ok_or_else(|| expected(&values_path, "a sequence", values))?;
            let strings = items
                .iter()
                .enumerate()
                .map(|(j, item)| {
                    item.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| expected(&join_index(&values_path, j), "a string", item))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(strings)
        }
    };

    Ok(Requirement { key, operator, values })
}

fn required_string(map: &Mapping, path: &str, field: &str) -> Result<String, SelectorError> {
    let field_path = join_key(path, field);
    let doc = present(map, field).ok_or_else(|| SelectorError::malformed(&field_path, "missing"))?;
    doc.as_str()
        .map(str::to_owned)
        .ok_or_else(|| expected(&field_path, "a string", doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Document {
        Document::from_json_str(json).expect("valid test JSON")
    }

    fn malformed_path(json: &str) -> String {
        match LabelSelector::from_document(&doc(json)) {
            Err(SelectorError::MalformedSelector { path, .. }) => path,
            other => panic!("expected MalformedSelector, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_selector() {
        let selector = LabelSelector::from_document(&doc("{}")).expect("parses");
        assert_eq!(selector, LabelSelector::default());
        assert!(selector.is_empty());
    }

    #[test]
    fn test_null_clauses_are_absent() {
        let selector =
            LabelSelector::from_document(&doc(r#"{"matchLabels": null, "matchExpressions": null}"#))
                .expect("parses");
        assert!(selector.match_labels.is_none());
        assert!(selector.match_expressions.is_none());
    }

    #[test]
    fn test_parses_both_clauses() {
        let selector = LabelSelector::from_document(&doc(
            r#"{
                "matchLabels": {"tier": "prod"},
                "matchExpressions": [
                    {"key": "app", "operator": "In", "values": ["email", "chat"]},
                    {"key": "canary", "operator": "DoesNotExist"}
                ]
            }"#,
        ))
        .expect("parses");

        assert_eq!(
            selector.match_labels,
            Some([("tier".to_string(), "prod".to_string())].into())
        );
        assert_eq!(
            selector.match_expressions,
            Some(vec![
                Requirement::new("app", "In", Some(vec!["email", "chat"])),
                Requirement::new("canary", "DoesNotExist", None),
            ])
        );
        assert!(!selector.is_empty());
    }

    #[test]
    fn test_document_and_serde_agree() {
        let json = r#"{"matchLabels": {"a": "1"}, "matchExpressions": [{"key": "b", "operator": "Exists"}]}"#;
        let from_doc = LabelSelector::from_document(&doc(json)).expect("parses");
        let from_serde: LabelSelector = serde_json::from_str(json).expect("deserializes");
        assert_eq!(from_doc, from_serde);
    }

    #[test]
    fn test_unknown_operator_is_kept_verbatim() {
        let selector = LabelSelector::from_document(&doc(
            r#"{"matchExpressions": [{"key": "app", "operator": "Foo"}]}"#,
        ))
        .expect("parses; the translator rejects the operator");
        assert_eq!(
            selector.match_expressions.as_deref().map(|e| e[0].operator.as_str()),
            Some("Foo")
        );
    }

    #[test]
    fn test_malformed_paths() {
        assert_eq!(malformed_path("[]"), "selector");
        assert_eq!(malformed_path(r#"{"matchLabels": ["app"]}"#), "matchLabels");
        assert_eq!(malformed_path(r#"{"matchLabels": {"app": 3}}"#), "matchLabels.app");
        assert_eq!(malformed_path(r#"{"matchExpressions": {"key": "a"}}"#), "matchExpressions");
        assert_eq!(malformed_path(r#"{"matchExpressions": ["a"]}"#), "matchExpressions[0]");
        assert_eq!(
            malformed_path(r#"{"matchExpressions": [{"key": "a", "operator": "Exists"}, {"operator": "In"}]}"#),
            "matchExpressions[1].key"
        );
        assert_eq!(
            malformed_path(r#"{"matchExpressions": [{"key": "a", "operator": 1}]}"#),
            "matchExpressions[0].operator"
        );
        assert_eq!(
            malformed_path(r#"{"matchExpressions": [{"key": "a", "operator": "In", "values": "b"}]}"#),
            "matchExpressions[0].values"
        );
        assert_eq!(
            malformed_path(r#"{"matchExpressions": [{"key": "a", "operator": "In", "values": ["b", true]}]}"#),
            "matchExpressions[0].values[1]"
        );
    }

    #[test]
    fn test_operator_parse() {
        for op in [Operator::In, Operator::NotIn, Operator::Exists, Operator::DoesNotExist] {
            assert_eq!(Operator::parse(op.as_str()), Some(op));
            assert_eq!(op.to_string(), op.as_str());
        }
        assert_eq!(Operator::parse("in"), None);
        assert_eq!(Operator::parse("Foo"), None);
    }
}
