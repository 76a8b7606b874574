//! Calico Selectors
//!
//! Translates Kubernetes label selectors (`matchLabels` plus
//! `matchExpressions`) into the textual selector language used by Calico
//! policies.
//!
//! # Example
//!
//! ```
//! use calico_selectors::{translate, LabelSelector, Requirement};
//!
//! # fn example() -> Result<(), calico_selectors::SelectorError> {
//! let selector = LabelSelector {
//!     match_labels: Some([("tier".to_string(), "prod".to_string())].into()),
//!     match_expressions: Some(vec![Requirement::new("app", "NotIn", Some(vec!["chat"]))]),
//! };
//!
//! assert_eq!(translate(&selector)?, "tier == 'prod' && app not in {'chat'}");
//! # Ok(())
//! # }
//! ```
//!
//! # Translation rules
//!
//! - `matchLabels` entries become `key == 'value'`, in key order
//! - `In` / `NotIn` become `key in {'a', 'b'}` / `key not in {'a', 'b'}`
//! - `Exists` / `DoesNotExist` become `has(key)` / `!has(key)`
//! - clauses are joined with ` && `; an empty selector yields `""`, which
//!   Calico treats as matching everything
//! - values are escaped backslash first, then single quote

pub mod error;
pub mod selector;
pub mod translate;

pub use error::SelectorError;
pub use selector::{LabelSelector, Operator, Requirement};
pub use translate::{escape, translate, translate_document};
