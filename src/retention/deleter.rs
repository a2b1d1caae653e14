use super::{DeletionSet, join_names};
use crate::cluster::{ClusterClient, ClusterResult};

/// What a bulk delete did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing to delete; no request was sent.
    Noop,
    /// The cluster acknowledged deletion of this many indices.
    Deleted(usize),
}

/// Delete every index in `names` with one request.
///
/// The batch either succeeds as a whole or the call fails; there is no
/// per-index fallback.
pub async fn delete_indices(
    client: &dyn ClusterClient,
    names: &DeletionSet,
) -> ClusterResult<DeleteOutcome> {
    if names.is_empty() {
        return Ok(DeleteOutcome::Noop);
    }

    tracing::info!(
        count = names.len(),
        indices = %join_names(names.iter()),
        "Deleting indices"
    );

    client.delete_indices(&names.to_vec()).await?;

    Ok(DeleteOutcome::Deleted(names.len()))
}
