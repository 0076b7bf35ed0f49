use thiserror::Error;

/// Why awaiting a [`Belief`](crate::Belief) did not produce a value.
///
/// Rejections travel through `then` chains as plain `E`; this type only shows
/// up at the `.await` boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwaitError<E> {
    #[error("belief was rejected")]
    Rejected(E),
    /// Every settler was dropped while the belief was still pending.
    #[error("belief was abandoned before it settled")]
    Abandoned,
}

impl<E> AwaitError<E> {
    /// The rejection reason, if there was one.
    pub fn rejection(self) -> Option<E> {
        match self {
            AwaitError::Rejected(reason) => Some(reason),
            AwaitError::Abandoned => None,
        }
    }
}
