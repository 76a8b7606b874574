//! Selector translation errors

use crate::selector::Operator;
use thiserror::Error;

/// Errors that can occur when reading or translating a label selector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The raw selector does not have the expected shape
    #[error("malformed selector at {path}: {reason}")]
    MalformedSelector {
        /// Rendered path of the offending element, e.g. `matchExpressions[1].values[0]`
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// An operator outside `In`, `NotIn`, `Exists`, `DoesNotExist`
    #[error("unexpected value for matchExpressions[{index}].operator: {operator:?}")]
    InvalidOperator {
        /// Position of the requirement in `matchExpressions`
        index: usize,
        /// The operator as given
        operator: String,
    },

    /// `In` / `NotIn` without a `values` list
    #[error("matchExpressions[{index}] is missing values for operator {operator}")]
    MissingValues {
        /// Position of the requirement in `matchExpressions`
        index: usize,
        /// The set operator
        operator: Operator,
    },

    /// `Exists` / `DoesNotExist` with a `values` list
    #[error("unexpected matchExpressions[{index}].values for operator {operator}")]
    UnexpectedValues {
        /// Position of the requirement in `matchExpressions`
        index: usize,
        /// The existence operator
        operator: Operator,
    },
}

impl SelectorError {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSelector {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
