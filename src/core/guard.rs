use crate::{error::CheckInError, record::CheckInDraft};

use super::roster::Roster;

/// Returns true when `identifier` is already in the working set.
pub fn is_duplicate(working_set: &Roster, identifier: &str) -> bool {
    working_set.contains(identifier)
}

/// Rejects `draft` with [`CheckInError::DuplicateIdentifier`] if its identifier
/// is already checked in.
pub fn admit(working_set: &Roster, draft: &CheckInDraft) -> Result<(), CheckInError> {
    if is_duplicate(working_set, &draft.identifier) {
        return Err(CheckInError::DuplicateIdentifier(draft.identifier.clone()));
    }
    Ok(())
}
