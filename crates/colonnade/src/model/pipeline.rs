//! Lifecycle pipeline steps shared by save and remove.

use super::Document;
use crate::error::ValidationError;
use crate::schema::{HookError, HookEvent, PreHook};

/// Run every validator in field order. The first failure aborts.
pub(crate) fn validate(doc: &Document) -> Result<(), ValidationError> {
    for (field, validators) in doc.schema().validators() {
        let value = doc.value(field);
        if let Some(failed) = validators.iter().find(|v| !v.check(value)) {
            return Err(ValidationError::new(field.clone(), failed.message()));
        }
    }
    Ok(())
}

/// Run pre hooks for `event` in registration order, stopping at the first error.
pub(crate) async fn run_pre(doc: &mut Document, event: HookEvent) -> Result<(), HookError> {
    let hooks: Vec<PreHook> = doc.schema().pre_hooks(event).to_vec();
    for hook in hooks {
        hook(&mut *doc).await?;
    }
    Ok(())
}

/// Notify post hooks for `event`.
pub(crate) fn run_post(doc: &Document, event: HookEvent) {
    for hook in doc.schema().post_hooks(event) {
        hook(doc);
    }
}
