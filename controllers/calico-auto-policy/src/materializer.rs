//! Builds a downstream Calico policy from an upstream NetworkPolicy.

use crate::error::MaterializeError;
use calico_client::ObjectKey;
use calico_selectors::translate_document;
use policy_document::{Document, Mapping};

/// Produces a fresh downstream document: a clone of `template` whose
/// `spec.selector` is the translation of the upstream `spec.podSelector`.
///
/// The template itself is never modified. A non-mapping `spec` in the
/// template is replaced by one holding only the selector.
pub fn materialize(upstream: &Document, template: &Document) -> Result<Document, MaterializeError> {
    let spec = upstream
        .get("spec")
        .filter(|spec| spec.as_mapping().is_some())
        .ok_or(MaterializeError::MissingField { path: "spec" })?;
    let pod_selector = spec
        .get("podSelector")
        .filter(|selector| selector.as_mapping().is_some())
        .ok_or(MaterializeError::MissingField { path: "spec.podSelector" })?;

    let selector = translate_document(pod_selector)?;

    let mut policy = template.clone();
    if policy.get("spec").is_some_and(|spec| spec.as_mapping().is_none()) {
        policy.set_path(&["spec"], Document::Mapping(Mapping::new()))?;
    }
    policy.set_path(&["spec", "selector"], Document::String(selector))?;
    Ok(policy)
}

/// Stamps `metadata.namespace` and `metadata.name` so the downstream object
/// shares the upstream object's identity.
pub fn stamp_identity(policy: &mut Document, key: &ObjectKey) -> Result<(), MaterializeError> {
    policy.set_path(&["metadata", "namespace"], key.namespace.as_str().into())?;
    policy.set_path(&["metadata", "name"], key.name.as_str().into())?;
    Ok(())
}
