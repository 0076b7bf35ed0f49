use std::fmt;
use std::sync::Arc;
use std::task::Waker;

use crate::belief::Shared;
use crate::schedule::{Inline, Schedule};
use crate::{Belief, Item};

/// The write side of a [`Belief`].
///
/// Only the first of `resolve`, `reject` or `adopt` takes effect; anything
/// after that is silently ignored. Clones settle the same belief. Once every
/// settler of a pending belief is gone the belief is abandoned.
///
/// # Examples
///
/// ```
/// use belief::{Belief, Status};
/// let belief = Belief::<&str, &str>::new(|settler| {
///     settler.reject("💥");
///     settler.resolve("🍓");
/// });
/// assert_eq!(belief.status(), Status::Rejected);
/// assert_eq!(belief.peek(), Some(Err("💥")));
/// ```
pub struct Settler<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Settler<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// The settler created together with its belief. It is already counted.
    pub(crate) fn first(shared: Arc<Shared<T, E>>) -> Self {
        Self { shared }
    }

    pub fn resolve(&self, value: T) {
        self.shared.settle(Ok(value), false)
    }

    pub fn reject(&self, reason: E) {
        self.shared.settle(Err(reason), false)
    }

    /// Settles the same way `other` eventually does. From here on this
    /// settler's own `resolve` and `reject` are ignored.
    ///
    /// ```
    /// use belief::Belief;
    /// let outer = Belief::<i32, ()>::new(|settler| settler.adopt(Belief::resolve(7)));
    /// assert_eq!(outer.peek(), Some(Ok(7)));
    /// ```
    pub fn adopt(&self, other: Belief<T, E>) {
        if Arc::ptr_eq(&self.shared, &other.shared) {
            tracing::warn!("a belief cannot follow itself, leaving it pending");
            return;
        }
        {
            let mut inner = self.shared.lock();
            if !inner.is_pending() || inner.following {
                tracing::debug!("adoption ignored, belief is no longer open");
                return;
            }
            inner.following = true;
        }
        let target = self.clone();
        other.subscribe(Box::new(move |outcome| target.shared.settle(outcome, true)));
    }

    /// Resolves with a plain item or adopts a pending one.
    pub fn settle(&self, item: Item<T, E>) {
        match item {
            Item::Plain(value) => self.resolve(value),
            Item::Pending(other) => self.adopt(other),
        }
    }
}

/// Runs `callback` on `input` and settles `target` with what it returns. A
/// returned belief is followed; an `Err` rejects.
///
/// Every call site that turns a continuation's return value into a settlement
/// goes through here.
pub(crate) fn resolve_with<A, U, E, F>(callback: F, input: A, target: Settler<U, E>)
where
    U: Clone + Send + 'static,
    E: Clone + Send + 'static,
    F: FnOnce(A) -> Result<Item<U, E>, E>,
{
    match callback(input) {
        Ok(item) => target.settle(item),
        Err(fault) => target.reject(fault),
    }
}

impl<T, E> Clone for Settler<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        self.shared.lock().settlers += 1;
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Drop for Settler<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// The last settler of a pending belief abandons it: queued continuations
    /// are dropped and anyone awaiting it is woken.
    fn drop(&mut self) {
        let (reactions, wakers) = {
            let mut inner = self.shared.lock();
            inner.settlers -= 1;
            if inner.settlers > 0 || !inner.is_pending() {
                return;
            }
            inner.abandon()
        };
        tracing::debug!(dropped = reactions.len(), "belief abandoned while pending");
        // Dropping a reaction drops the settler of its child, which may be the
        // last one too. Going through `Inline` keeps that cascade off the stack.
        if !reactions.is_empty() {
            Inline.schedule(Box::new(move || drop(reactions)));
        }
        wakers.into_iter().for_each(Waker::wake);
    }
}

impl<T, E> fmt::Debug for Settler<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settler").finish_non_exhaustive()
    }
}
