use crate::backend::BackendError;
use crate::view::ViewId;
use thiserror::Error;

/// Errors returned by view tree operations.
///
/// Programming errors (zero sizes, moving the root, reparenting a top-level view) are not
/// represented here; they panic.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no such view: {0:?}")]
    NoSuchView(ViewId),
    #[error("view {0:?} has an unrealized parent")]
    UnrealizedParent(ViewId),
    #[error("view {0:?} has no parent")]
    NoParent(ViewId),
    #[error("view {0:?} is not realized")]
    NotRealized(ViewId),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
