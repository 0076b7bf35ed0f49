//! Settle-once deferred values.
//!
//! A [`Belief`] starts pending and is settled at most once, fulfilled with a
//! value or rejected with a reason. Continuations can be attached before or
//! after that happens; each call to [`Belief::then`] (or `and_then`, `catch`,
//! `fork`, `map`) returns a new belief that settles with the continuation's
//! result. A continuation that returns another belief makes the new belief
//! follow it. [`Belief::all`] joins a mix of plain values and beliefs.
//!
//! When continuations run is decided by the [`Schedule`] in the belief's
//! [`Config`]: [`Inline`] runs them right away, [`TickQueue`] defers them until
//! it is drained.
//!
//! # Examples
//!
//! ```
//! use belief::{Belief, Item};
//!
//! let heroes = Belief::<Vec<&str>, String>::resolve(vec!["Batman", "Thor"]);
//! let villains = heroes.map(|hero| match hero {
//!     "Batman" => Ok(Item::Plain("The Joker")),
//!     _ => Ok(Item::from(Belief::resolve("Loki"))),
//! });
//! assert_eq!(villains.peek(), Some(Ok(vec!["The Joker", "Loki"])));
//! ```
mod all;
mod belief;
mod config;
mod error;
mod item;
mod schedule;
mod settled;
mod settler;

pub use crate::belief::{Belief, Status};
pub use crate::config::Config;
pub use crate::error::AwaitError;
pub use crate::item::Item;
pub use crate::schedule::{Inline, Job, Schedule, TickQueue};
pub use crate::settled::Settled;
pub use crate::settler::Settler;
