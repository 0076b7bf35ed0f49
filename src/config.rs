use std::fmt;
use std::sync::Arc;

use crate::schedule::{Inline, Schedule};
use crate::{Belief, Item, Settler};

/// How beliefs built from this configuration run their work.
///
/// A belief keeps the configuration it was built with and passes it on to
/// every child created by `then`, `catch`, `map` and `fork`.
#[derive(Clone)]
pub struct Config {
    pub(crate) deferred_start: bool,
    pub(crate) scheduler: Arc<dyn Schedule>,
}

impl Config {
    /// Synchronous initializers, continuations run inline.
    pub fn new() -> Self {
        Self {
            deferred_start: false,
            scheduler: Arc::new(Inline),
        }
    }

    /// Hand the initializer to the scheduler instead of calling it right away.
    pub fn deferred_start(mut self, deferred: bool) -> Self {
        self.deferred_start = deferred;
        self
    }

    pub fn scheduler(mut self, scheduler: impl Schedule + 'static) -> Self {
        self.scheduler = Arc::new(scheduler);
        self
    }

    pub fn shared_scheduler(mut self, scheduler: Arc<dyn Schedule>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn is_deferred_start(&self) -> bool {
        self.deferred_start
    }

    /// Builds a belief and runs `init` with its settler, either now or on the
    /// scheduler depending on `deferred_start`.
    pub fn belief<T, E, F>(&self, init: F) -> Belief<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
        F: FnOnce(Settler<T, E>) + Send + 'static,
    {
        let (belief, settler) = Belief::with_settler(self.clone());
        if self.deferred_start {
            self.scheduler.schedule(Box::new(move || init(settler)));
        } else {
            init(settler);
        }
        belief
    }

    /// A belief with no initializer. It stays pending forever.
    pub fn pending<T, E>(&self) -> Belief<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        Belief::with_settler(self.clone()).0
    }

    pub fn resolve<T, E>(&self, value: T) -> Belief<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        self.settled(Item::Plain(value))
    }

    pub fn reject<T, E>(&self, reason: E) -> Belief<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        let (belief, settler) = Belief::with_settler(self.clone());
        settler.reject(reason);
        belief
    }

    /// Fulfills with a plain item, or follows a pending one.
    pub fn settled<T, E>(&self, item: Item<T, E>) -> Belief<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        let (belief, settler) = Belief::with_settler(self.clone());
        settler.settle(item);
        belief
    }

    pub fn all<T, E, I>(&self, items: I) -> Belief<Vec<T>, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
        I: IntoIterator<Item = Item<T, E>>,
    {
        crate::all::gather(self, items)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("deferred_start", &self.deferred_start)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::{Item, Status, TickQueue};
    use std::sync::Arc;

    #[test]
    fn default_is_synchronous() {
        let config = Config::default();
        assert!(!config.is_deferred_start());
        let belief = config.belief::<i32, (), _>(|settler| settler.resolve(1));
        assert_eq!(belief.peek(), Some(Ok(1)));
    }

    #[test]
    fn deferred_start_waits_for_a_tick() {
        let ticks = TickQueue::new();
        let config = Config::new().deferred_start(true).scheduler(ticks.clone());
        let belief = config.belief::<i32, (), _>(|settler| settler.resolve(1));
        assert_eq!(belief.status(), Status::Pending);
        assert_eq!(ticks.len(), 1);
        ticks.run_until_idle();
        assert_eq!(belief.peek(), Some(Ok(1)));
    }

    #[test]
    fn children_inherit_the_scheduler() {
        let ticks = TickQueue::new();
        let config = Config::new().scheduler(ticks.clone());
        let child = config
            .resolve::<i32, ()>(1)
            .and_then(|n| Ok(Item::Plain(n + 1)))
            .and_then(|n| Ok(Item::Plain(n + 1)));
        assert_eq!(child.status(), Status::Pending);
        assert_eq!(ticks.run_until_idle(), 2);
        assert_eq!(child.peek(), Some(Ok(3)));
    }

    #[test]
    fn shared_scheduler_is_used_as_is() {
        let ticks = TickQueue::new();
        let config = Config::new().shared_scheduler(Arc::new(ticks.clone()));
        let all = config.all::<i32, (), _>(vec![Item::from(config.resolve(1)), Item::Plain(2)]);
        assert_eq!(all.status(), Status::Pending);
        ticks.run_until_idle();
        assert_eq!(all.peek(), Some(Ok(vec![1, 2])));
    }

    #[test]
    fn pending_never_settles() {
        let belief = Config::new().pending::<i32, ()>();
        assert_eq!(belief.status(), Status::Pending);
        assert!(belief.is_abandoned());
    }
}
