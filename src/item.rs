use crate::Belief;

/// Either a value that is already there or a belief that will produce one.
///
/// Continuations return an `Item` and [`Belief::all`] takes a sequence of
/// them, so plain values and beliefs can be mixed freely.
#[derive(Debug)]
pub enum Item<T, E> {
    Plain(T),
    Pending(Belief<T, E>),
}

impl<T, E> Item<T, E> {
    pub fn is_plain(&self) -> bool {
        matches!(self, Item::Plain(_))
    }
}

impl<T, E> From<Belief<T, E>> for Item<T, E> {
    fn from(belief: Belief<T, E>) -> Self {
        Item::Pending(belief)
    }
}

impl<T: Clone, E> Clone for Item<T, E> {
    fn clone(&self) -> Self {
        match self {
            Item::Plain(value) => Item::Plain(value.clone()),
            Item::Pending(belief) => Item::Pending(belief.clone()),
        }
    }
}
