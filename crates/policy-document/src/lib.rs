//! Policy Documents
//!
//! A closed, strongly-typed tree for the loosely structured objects the
//! controller handles: the Calico policy template loaded from YAML and the
//! `NetworkPolicy` objects received from the Kubernetes watch.
//!
//! # Example
//!
//! ```
//! use policy_document::Document;
//!
//! # fn example() -> Result<(), policy_document::DocumentError> {
//! let template = Document::from_yaml_str(
//!     "apiVersion: projectcalico.org/v3\nkind: NetworkPolicy\nspec:\n  order: 100\n",
//! )?;
//!
//! let mut policy = template.clone();
//! policy.set_path(&["spec", "selector"], Document::from("app == 'email'"))?;
//!
//! assert_eq!(
//!     policy.get_path(&["spec", "selector"]).and_then(Document::as_str),
//!     Some("app == 'email'"),
//! );
//! assert!(template.get_path(&["spec", "selector"]).is_none());
//! # Ok(())
//! # }
//! ```
//!
//! Only null, booleans, integers, strings, sequences and string-keyed
//! mappings are representable. Anything else is rejected when converting
//! from `serde_json` or `serde_yaml`, so cloning a `Document` is total.

mod convert;
pub mod document;
pub mod error;
pub mod path;

pub use document::{Document, Mapping};
pub use error::DocumentError;
