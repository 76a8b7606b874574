//! The downstream policy template.
//!
//! Loaded once at startup. Every materialization clones it, so the shared
//! instance is never written to.

use crate::error::{ControllerError, TemplateError};
use kube::core::GroupVersionKind;
use policy_document::Document;
use std::path::Path;
use tracing::info;

/// A validated policy template and the downstream kind it produces.
#[derive(Debug, Clone)]
pub struct PolicyTemplate {
    document: Document,
    gvk: GroupVersionKind,
}

impl PolicyTemplate {
    /// Reads and validates the template at `path`.
    pub fn load(path: &Path) -> Result<Self, ControllerError> {
        let wrap = |source: TemplateError| ControllerError::Template {
            path: path.to_path_buf(),
            source,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
        let document = Document::from_yaml_str(&contents).map_err(|e| wrap(e.into()))?;
        let template = Self::from_document(document).map_err(wrap)?;
        info!(
            "Loaded policy template {} ({}/{} {})",
            path.display(),
            template.gvk.group,
            template.gvk.version,
            template.gvk.kind
        );
        Ok(template)
    }

    /// Validates an already-parsed template.
    ///
    /// The root must be a mapping with string `apiVersion` and `kind`;
    /// `metadata` and `spec`, when present, must be mappings.
    pub fn from_document(document: Document) -> Result<Self, TemplateError> {
        if document.as_mapping().is_none() {
            return Err(TemplateError::Invalid(format!(
                "template must be a mapping, found {}",
                document.kind_name()
            )));
        }
        let field = |name: &str| {
            document
                .get(name)
                .and_then(Document::as_str)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| TemplateError::Invalid(format!("template needs a string {name}")))
        };
        let gvk = parse_gvk(field("apiVersion")?, field("kind")?)?;

        for name in ["metadata", "spec"] {
            match document.get(name) {
                None | Some(Document::Null | Document::Mapping(_)) => {}
                Some(other) => {
                    return Err(TemplateError::Invalid(format!(
                        "template {name} must be a mapping, found {}",
                        other.kind_name()
                    )));
                }
            }
        }

        Ok(Self { document, gvk })
    }

    /// The template tree.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Group, version and kind of the objects this template produces.
    #[must_use]
    pub fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }
}

fn parse_gvk(api_version: &str, kind: &str) -> Result<GroupVersionKind, TemplateError> {
    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    };
    if version.is_empty() || version.contains('/') {
        return Err(TemplateError::Invalid(format!("malformed apiVersion {api_version:?}")));
    }
    Ok(GroupVersionKind::gvk(group, version, kind))
}
