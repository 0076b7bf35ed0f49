//! The "run this later" capability handed to beliefs.
//!
//! A belief never decides on its own when continuations run. It hands every
//! continuation (and, with `deferred_start`, its initializer) to a [`Schedule`]
//! implementation as a [`Job`].
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send>;

pub trait Schedule: Send + Sync {
    fn schedule(&self, job: Job);
}

/// Runs every job on the calling thread before `schedule` returns.
///
/// A job scheduled from inside a running job is queued and runs once the
/// current one returns, so settling a long chain takes constant stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

thread_local! {
    /// `Some` while an outer `Inline::schedule` on this thread is draining.
    static DRAINING: RefCell<Option<VecDeque<Job>>> = RefCell::new(None);
}

/// Marks this thread as draining until dropped.
struct Drain;

impl Drain {
    fn start() -> Self {
        DRAINING.with(|draining| *draining.borrow_mut() = Some(VecDeque::new()));
        Drain
    }

    fn next(&self) -> Option<Job> {
        DRAINING.with(|draining| draining.borrow_mut().as_mut().and_then(VecDeque::pop_front))
    }
}

impl Drop for Drain {
    fn drop(&mut self) {
        // Only non-empty if a job panicked; drop the rest outside the borrow.
        let rest = DRAINING.with(|draining| draining.borrow_mut().take());
        drop(rest);
    }
}

impl Schedule for Inline {
    fn schedule(&self, job: Job) {
        let job = DRAINING.with(|draining| match draining.borrow_mut().as_mut() {
            Some(queue) => {
                queue.push_back(job);
                None
            }
            None => Some(job),
        });
        if let Some(job) = job {
            let drain = Drain::start();
            let mut next = Some(job);
            while let Some(job) = next {
                job();
                next = drain.next();
            }
        }
    }
}

/// A FIFO of jobs that only run when the owner drains it.
///
/// Clones share the same queue, so one clone can be given to a
/// [`Config`](crate::Config) while another is kept to pump it.
///
/// # Examples
///
/// ```
/// use belief::{Config, Item, Status, TickQueue};
/// let ticks = TickQueue::new();
/// let config = Config::new().scheduler(ticks.clone());
/// let doubled = config
///     .resolve::<i32, ()>(21)
///     .and_then(|n| Ok(Item::Plain(n * 2)));
/// assert_eq!(doubled.status(), Status::Pending);
/// ticks.run_until_idle();
/// assert_eq!(doubled.peek(), Some(Ok(42)));
/// ```
#[derive(Clone, Default)]
pub struct TickQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one queued job. Returns `false` if the queue was empty.
    pub fn tick(&self) -> bool {
        // Pop before running: the job may schedule more work on this queue.
        let job = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs jobs until none are left, including ones queued along the way.
    /// Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.tick() {
            ran += 1;
        }
        tracing::trace!(ran, "tick queue idle");
        ran
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Schedule for TickQueue {
    fn schedule(&self, job: Job) {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(job);
    }
}

impl fmt::Debug for TickQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue").field("queued", &self.len()).finish()
    }
}
