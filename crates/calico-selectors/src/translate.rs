//! Label selector to Calico selector translation.

use crate::error::SelectorError;
use crate::selector::{LabelSelector, Operator, Requirement};
use policy_document::Document;

/// Escapes a value for use inside a single-quoted Calico selector literal.
///
/// Backslashes are escaped before quotes so that the quote escapes are not
/// themselves doubled.
#[must_use]
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Translates a label selector into a Calico selector expression.
///
/// `matchLabels` clauses come first, in key order, followed by
/// `matchExpressions` in the order given. An empty selector yields `""`.
pub fn translate(selector: &LabelSelector) -> Result<String, SelectorError> {
    let mut clauses = Vec::new();

    if let Some(labels) = &selector.match_labels {
        clauses.extend(
            labels
                .iter()
                .map(|(key, value)| format!("{key} == '{}'", escape(value))),
        );
    }

    if let Some(expressions) = &selector.match_expressions {
        for (index, requirement) in expressions.iter().enumerate() {
            clauses.push(requirement_clause(index, requirement)?);
        }
    }

    Ok(clauses.join(" && "))
}

/// Reads a selector from a document tree and translates it.
pub fn translate_document(doc: &Document) -> Result<String, SelectorError> {
    translate(&LabelSelector::from_document(doc)?)
}

fn requirement_clause(index: usize, requirement: &Requirement) -> Result<String, SelectorError> {
    let operator =
        Operator::parse(&requirement.operator).ok_or_else(|| SelectorError::InvalidOperator {
            index,
            operator: requirement.operator.clone(),
        })?;
    let key = &requirement.key;

    match operator {
        Operator::In | Operator::NotIn => {
            let values = requirement
                .values
                .as_ref()
                .ok_or(SelectorError::MissingValues { index, operator })?;
            let set = values
                .iter()
                .map(|value| format!("'{}'", escape(value)))
                .collect::<Vec<_>>()
                .join(", ");
            let keyword = if operator == Operator::In { "in" } else { "not in" };
            Ok(format!("{key} {keyword} {{{set}}}"))
        }
        Operator::Exists | Operator::DoesNotExist => {
            if requirement.values.is_some() {
                return Err(SelectorError::UnexpectedValues { index, operator });
            }
            let negation = if operator == Operator::Exists { "" } else { "!" };
            Ok(format!("{negation}has({key})"))
        }
    }
}
