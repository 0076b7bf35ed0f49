use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::belief::Shared;
use crate::AwaitError;

/// Waits for a [`Belief`](crate::Belief) to settle. Any number of these may
/// wait on the same belief; each gets its own copy of the outcome.
///
/// # Examples
///
/// ```
/// use belief::Belief;
/// use futures::executor::block_on;
/// use std::thread;
/// let belief = Belief::<(), String>::new(|settler| {
///     thread::spawn(move || settler.reject(String::from("💥")));
/// });
/// let other = belief.settled();
/// let task1 = thread::spawn(move || block_on(belief.settled()));
/// let task2 = thread::spawn(move || block_on(other));
/// assert!(task1.join().expect("The task1 thread has panicked").is_err());
/// assert!(task2.join().expect("The task2 thread has panicked").is_err());
/// ```
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Settled<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Settled<T, E> {
    pub(crate) fn new(shared: Arc<Shared<T, E>>) -> Self {
        Self { shared }
    }
}

impl<T, E> Clone for Settled<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Future for Settled<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, AwaitError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.shared.lock();
        if let Some(outcome) = inner.outcome() {
            return Poll::Ready(outcome.map_err(AwaitError::Rejected));
        }
        if inner.settlers == 0 {
            return Poll::Ready(Err(AwaitError::Abandoned));
        }
        // Several tasks may wait on one belief, so every waker is kept.
        inner.add_waker(cx.waker());
        Poll::Pending
    }
}
