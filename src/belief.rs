use std::fmt;
use std::future::IntoFuture;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::Waker;

use crate::settler::{resolve_with, Settler};
use crate::{AwaitError, Config, Item, Settled};

/// A continuation waiting on a settlement. It receives the outcome by value.
pub(crate) type Reaction<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

/// Where a belief is in its single pending -> settled transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

pub(crate) struct Inner<T, E> {
    state: State<T, E>,
    reactions: Vec<Reaction<T, E>>,
    wakers: Vec<Waker>,
    /// Live `Settler` handles. Zero while pending means nobody can settle us.
    pub(crate) settlers: usize,
    /// Set once the belief has been told to follow another one.
    pub(crate) following: bool,
    /// Set while `settle` is still handing reactions to the scheduler.
    dispatching: bool,
}

impl<T: Clone, E: Clone> Inner<T, E> {
    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending)
    }

    pub(crate) fn outcome(&self) -> Option<Result<T, E>> {
        match &self.state {
            State::Pending => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    pub(crate) fn add_waker(&mut self, waker: &Waker) {
        if !self.wakers.iter().any(|known| known.will_wake(waker)) {
            self.wakers.push(waker.clone());
        }
    }

    /// Empties the queues of a belief nobody can settle any more.
    pub(crate) fn abandon(&mut self) -> (Vec<Reaction<T, E>>, Vec<Waker>) {
        (mem::take(&mut self.reactions), mem::take(&mut self.wakers))
    }
}

pub(crate) struct Shared<T, E> {
    inner: Mutex<Inner<T, E>>,
    pub(crate) config: Config,
}

impl<T, E> Shared<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        // Every write is a single assignment, so a poisoned lock still holds
        // a consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The one place a belief leaves `Pending`. The first call wins; later
    /// calls are ignored. While following another belief only that belief's
    /// outcome (`from_followed`) is accepted.
    pub(crate) fn settle(&self, outcome: Result<T, E>, from_followed: bool) {
        let mut batch = {
            let mut inner = self.lock();
            if !inner.is_pending() || (inner.following && !from_followed) {
                tracing::debug!(
                    following = inner.following,
                    "settlement ignored, belief is no longer open"
                );
                return;
            }
            inner.state = match &outcome {
                Ok(value) => State::Fulfilled(value.clone()),
                Err(reason) => State::Rejected(reason.clone()),
            };
            inner.dispatching = true;
            mem::take(&mut inner.reactions)
        };
        tracing::trace!(
            fulfilled = outcome.is_ok(),
            reactions = batch.len(),
            "belief settled"
        );
        // Reactions registered while we dispatch join the next batch, behind
        // everything registered before them.
        let wakers = loop {
            for reaction in batch {
                let outcome = outcome.clone();
                self.config
                    .scheduler
                    .schedule(Box::new(move || reaction(outcome)));
            }
            let mut inner = self.lock();
            batch = mem::take(&mut inner.reactions);
            if batch.is_empty() {
                inner.dispatching = false;
                break mem::take(&mut inner.wakers);
            }
        };
        for waker in wakers {
            waker.wake();
        }
    }

    /// Queues `reaction` while pending or while a settlement is still being
    /// dispatched, dispatches it right away otherwise.
    pub(crate) fn react(&self, reaction: Reaction<T, E>) {
        let mut inner = self.lock();
        let outcome = inner.outcome();
        match outcome {
            Some(_) if inner.dispatching => inner.reactions.push(reaction),
            Some(outcome) => {
                drop(inner);
                self.config
                    .scheduler
                    .schedule(Box::new(move || reaction(outcome)));
            }
            None if inner.settlers == 0 => {
                drop(inner);
                tracing::trace!("continuation dropped, belief is abandoned");
                // Dropping the reaction releases the settler of any child.
                drop(reaction);
            }
            None => inner.reactions.push(reaction),
        }
    }
}

/// A value that is settled exactly once, either fulfilled with a `T` or
/// rejected with an `E`.
///
/// `Belief` is a handle: clones refer to the same shared state. Chaining with
/// [`then`](Belief::then) and friends always creates a new belief.
///
/// # Examples
///
/// ```
/// use belief::{Belief, Item};
/// use futures::executor::block_on;
/// use std::thread;
///
/// let belief = Belief::<String, String>::new(|settler| {
///     thread::spawn(move || settler.resolve(String::from("🍓")));
/// });
/// let shout = belief.and_then(|fruit| Ok(Item::Plain(format!("{fruit}!"))));
/// assert_eq!(block_on(shout.settled()), Ok(String::from("🍓!")));
/// ```
pub struct Belief<T, E> {
    pub(crate) shared: Arc<Shared<T, E>>,
}

impl<T, E> Belief<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a belief and hands its settler to `init` right away.
    pub fn new<F>(init: F) -> Self
    where
        F: FnOnce(Settler<T, E>) + Send + 'static,
    {
        Config::default().belief(init)
    }

    /// A belief without an initializer. It never settles.
    pub fn pending() -> Self {
        Config::default().pending()
    }

    pub fn resolve(value: T) -> Self {
        Config::default().resolve(value)
    }

    pub fn reject(reason: E) -> Self {
        Config::default().reject(reason)
    }

    /// Joins plain values and beliefs into one belief of all their values, in
    /// input order. Rejects with the first rejection to arrive.
    ///
    /// ```
    /// use belief::{Belief, Item};
    /// let all = Belief::<i32, ()>::all(vec![
    ///     Item::from(Belief::resolve(1)),
    ///     Item::Plain(2),
    ///     Item::from(Belief::resolve(3)),
    /// ]);
    /// assert_eq!(all.peek(), Some(Ok(vec![1, 2, 3])));
    /// ```
    pub fn all<I>(items: I) -> Belief<Vec<T>, E>
    where
        I: IntoIterator<Item = Item<T, E>>,
    {
        Config::default().all(items)
    }

    pub(crate) fn with_settler(config: Config) -> (Self, Settler<T, E>) {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: State::Pending,
                reactions: Vec::new(),
                wakers: Vec::new(),
                settlers: 1,
                following: false,
                dispatching: false,
            }),
            config,
        });
        let settler = Settler::first(shared.clone());
        (Self { shared }, settler)
    }

    pub(crate) fn subscribe(&self, reaction: Reaction<T, E>) {
        self.shared.react(reaction)
    }

    /// Registers both continuations and returns the belief that settles with
    /// whichever one runs.
    ///
    /// A continuation returns `Ok(Item::Plain(u))` to fulfill the child,
    /// `Ok(Item::Pending(b))` to make the child follow `b`, or `Err(e)` to
    /// reject it.
    pub fn then<U, F, R>(&self, on_fulfill: F, on_reject: R) -> Belief<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Item<U, E>, E> + Send + 'static,
        R: FnOnce(E) -> Result<Item<U, E>, E> + Send + 'static,
    {
        let (child, settler) = Belief::with_settler(self.shared.config.clone());
        tracing::trace!("continuation registered");
        self.subscribe(Box::new(move |outcome| match outcome {
            Ok(value) => resolve_with(on_fulfill, value, settler),
            Err(reason) => resolve_with(on_reject, reason, settler),
        }));
        child
    }

    /// `then` with only a fulfillment continuation. Rejections pass through.
    pub fn and_then<U, F>(&self, on_fulfill: F) -> Belief<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Item<U, E>, E> + Send + 'static,
    {
        self.then(on_fulfill, Err)
    }

    /// `then` with only a rejection continuation. Values pass through.
    pub fn catch<R>(&self, on_reject: R) -> Self
    where
        R: FnOnce(E) -> Result<Item<T, E>, E> + Send + 'static,
    {
        self.then(|value| Ok(Item::Plain(value)), on_reject)
    }

    /// `then` with neither continuation: a child that settles like `self`.
    pub fn fork(&self) -> Self {
        self.then(|value| Ok(Item::Plain(value)), Err)
    }

    pub fn status(&self) -> Status {
        match self.shared.lock().state {
            State::Pending => Status::Pending,
            State::Fulfilled(_) => Status::Fulfilled,
            State::Rejected(_) => Status::Rejected,
        }
    }

    /// The outcome, if settled.
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.shared.lock().outcome()
    }

    /// Pending with no settler left, so it will never settle.
    pub fn is_abandoned(&self) -> bool {
        let inner = self.shared.lock();
        inner.is_pending() && inner.settlers == 0
    }

    /// A future that completes when this belief settles.
    pub fn settled(&self) -> Settled<T, E> {
        Settled::new(self.shared.clone())
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Whether both handles refer to the same belief.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T, E> Clone for Belief<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> From<Item<T, E>> for Belief<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Fulfills with a plain value or follows a belief, never nesting one
    /// belief inside another.
    fn from(item: Item<T, E>) -> Self {
        Config::default().settled(item)
    }
}

impl<T, E> IntoFuture for Belief<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, AwaitError<E>>;
    type IntoFuture = Settled<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        self.settled()
    }
}

impl<T, E> fmt::Debug for Belief<T, E>
where
    T: fmt::Debug,
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = f.debug_struct("Belief");
        match &inner.state {
            State::Pending => out.field("state", &"pending"),
            State::Fulfilled(value) => out.field("fulfilled", value),
            State::Rejected(reason) => out.field("rejected", reason),
        };
        out.field("queued", &inner.reactions.len()).finish()
    }
}
