//! Joining many items into one belief.
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Belief, Config, Item, Settler};

/// Values collected so far, by input index.
struct Slots<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

/// Builds the belief behind [`Belief::all`] and [`Config::all`].
pub(crate) fn gather<T, E, I>(config: &Config, items: I) -> Belief<Vec<T>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    I: IntoIterator<Item = Item<T, E>>,
{
    let items: Vec<Item<T, E>> = items.into_iter().collect();
    let (all, settler) = Belief::with_settler(config.clone());
    tracing::trace!(
        items = items.len(),
        plain = items.iter().filter(|item| item.is_plain()).count(),
        "gathering"
    );
    if items.is_empty() {
        settler.resolve(Vec::new());
        return all;
    }

    let slots = Arc::new(Mutex::new(Slots {
        values: items.iter().map(|_| None).collect(),
        remaining: items.len(),
    }));
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Item::Plain(value) => fill(&slots, index, value, &settler),
            Item::Pending(belief) => {
                let slots = slots.clone();
                let settler = settler.clone();
                belief.subscribe(Box::new(move |outcome| match outcome {
                    Ok(value) => fill(&slots, index, value, &settler),
                    // First rejection wins; later outcomes hit a settled belief.
                    Err(reason) => settler.reject(reason),
                }));
            }
        }
    }
    all
}

fn fill<T, E>(slots: &Mutex<Slots<T>>, index: usize, value: T, settler: &Settler<Vec<T>, E>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let complete = {
        let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.values[index].is_none() {
            slots.values[index] = Some(value);
            slots.remaining -= 1;
        }
        if slots.remaining == 0 {
            Some(std::mem::take(&mut slots.values))
        } else {
            None
        }
    };
    if let Some(values) = complete {
        settler.resolve(values.into_iter().flatten().collect());
    }
}

impl<T, E> Belief<Vec<T>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Maps every element of the eventual vector, then waits for all the
    /// mapped items.
    ///
    /// The mapper runs once per element, in order. An `Err` from the mapper
    /// stops the mapping and rejects the result.
    ///
    /// ```
    /// use belief::{Belief, Item};
    /// let doubled = Belief::<i32, ()>::all((1..=3).map(Item::Plain))
    ///     .map(|n| Ok(Item::Plain(n * 2)));
    /// assert_eq!(doubled.peek(), Some(Ok(vec![2, 4, 6])));
    /// ```
    pub fn map<U, M>(&self, mut mapper: M) -> Belief<Vec<U>, E>
    where
        U: Clone + Send + 'static,
        M: FnMut(T) -> Result<Item<U, E>, E> + Send + 'static,
    {
        let config = self.config().clone();
        self.and_then(move |values| {
            let mapped = values
                .into_iter()
                .map(&mut mapper)
                .collect::<Result<Vec<_>, E>>()?;
            Ok(Item::Pending(gather(&config, mapped)))
        })
    }
}
