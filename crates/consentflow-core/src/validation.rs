//! Structural checks on consent drafts.
//!
//! Validation is shallow: it rejects drafts that could never
//! be submitted (no grantee, unnamed categories). Whether each declared
//! credential can actually be shared is the resolver's job.

use crate::error::{CoreError, Result};
use crate::terms::ConsentTermsDraft;
use crate::types::Did;

/// Validate a draft before materialization.
pub fn validate_draft(draft: &ConsentTermsDraft) -> Result<()> {
    Did::parse(draft.grantee.as_str())?;

    if draft.terms.categories.keys().any(|category| category.is_blank()) {
        return Err(CoreError::EmptyCategory);
    }

    if let Some(uri) = draft
        .terms
        .categories
        .values()
        .flat_map(|terms| terms.shared.iter())
        .find(|uri| uri.is_blank())
    {
        return Err(CoreError::InvalidDraft(format!(
            "blank credential reference {uri:?}"
        )));
    }

    Ok(())
}
